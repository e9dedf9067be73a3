//! EXIF metadata extraction.
//!
//! Turns raw image bytes into a [`Metadata`] object: a two-level mapping of
//! namespace → field name → JSON value.
//!
//! ## Decoding pipeline
//!
//! ```text
//! bytes ──image::ImageReader──▶ EXIF blob (TIFF-structured) ──exif::Reader::read_raw──▶ fields
//! ```
//!
//! The `image` crate guesses the container format and hands back the embedded
//! EXIF blob without decoding any pixels. Formats whose decoder does not expose
//! the blob (TIFF, where the whole file is the blob, and containers the `image`
//! crate does not know) fall back to `exif::Reader::read_from_container`.
//!
//! ## Namespaces
//!
//! Each EXIF field lands in the namespace of the IFD it was read from:
//!
//! | Namespace | IFD |
//! |---|---|
//! | `Image` | primary image (0th IFD) |
//! | `Photo` | Exif IFD (capture settings) |
//! | `GPSInfo` | GPS IFD |
//! | `Iop` | interoperability IFD |
//! | `Thumbnail` | 1st IFD (embedded thumbnail), any context |
//!
//! ## Values
//!
//! - ASCII strings become JSON strings, trailing NULs and whitespace trimmed
//! - integer types become JSON numbers
//! - rationals become floating numbers (`null` for a zero denominator)
//! - single-element vectors collapse to the scalar, longer ones stay arrays
//! - undefined and unknown types fall back to the tag's display string

use image::{ImageDecoder, ImageFormat, ImageReader};
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("No EXIF data found in the image.")]
    NoExif,
    #[error("Failed to extract EXIF data: {0}")]
    Malformed(String),
}

/// Top-level grouping of the metadata object, one per IFD.
///
/// Declaration order is the iteration order used by selector evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Namespace {
    Image,
    Photo,
    #[serde(rename = "GPSInfo")]
    GpsInfo,
    Iop,
    Thumbnail,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Image,
        Namespace::Photo,
        Namespace::GpsInfo,
        Namespace::Iop,
        Namespace::Thumbnail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Image => "Image",
            Namespace::Photo => "Photo",
            Namespace::GpsInfo => "GPSInfo",
            Namespace::Iop => "Iop",
            Namespace::Thumbnail => "Thumbnail",
        }
    }

    /// Exact, case-sensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Namespace> {
        Self::ALL.into_iter().find(|ns| ns.as_str() == name)
    }

    fn of_field(field: &exif::Field) -> Namespace {
        if field.ifd_num == exif::In::THUMBNAIL {
            return Namespace::Thumbnail;
        }
        match field.tag.context() {
            exif::Context::Exif => Namespace::Photo,
            exif::Context::Gps => Namespace::GpsInfo,
            exif::Context::Interop => Namespace::Iop,
            _ => Namespace::Image,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded EXIF metadata for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    namespaces: BTreeMap<Namespace, BTreeMap<String, Value>>,
}

impl Metadata {
    /// Look up one field inside one namespace.
    pub fn get(&self, namespace: Namespace, field: &str) -> Option<&Value> {
        self.namespaces.get(&namespace)?.get(field)
    }

    /// All fields of a namespace, or `None` if the image has none there.
    pub fn namespace(&self, namespace: Namespace) -> Option<&BTreeMap<String, Value>> {
        self.namespaces.get(&namespace)
    }

    /// Non-empty namespaces in declaration order.
    pub fn namespaces(&self) -> impl Iterator<Item = (Namespace, &BTreeMap<String, Value>)> {
        self.namespaces.iter().map(|(ns, fields)| (*ns, fields))
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn insert(&mut self, namespace: Namespace, field: impl Into<String>, value: Value) {
        self.namespaces
            .entry(namespace)
            .or_default()
            .insert(field.into(), value);
    }

    fn from_exif(exif: &exif::Exif) -> Self {
        let mut metadata = Metadata::default();
        for field in exif.fields() {
            metadata.insert(
                Namespace::of_field(field),
                field.tag.to_string(),
                field_value(field),
            );
        }
        metadata
    }
}

/// Decode the EXIF metadata embedded in an image.
///
/// Fails with [`MetadataError::NoExif`] when the image carries no EXIF
/// segment (or is not a recognisable image at all), and with
/// [`MetadataError::Malformed`] when the segment exists but cannot be parsed.
pub fn decode(bytes: &[u8]) -> Result<Metadata, MetadataError> {
    let exif = match embedded_blob(bytes) {
        Some(blob) => exif::Reader::new()
            .read_raw(blob)
            .map_err(|e| MetadataError::Malformed(e.to_string()))?,
        None => read_container(bytes)?,
    };

    let metadata = Metadata::from_exif(&exif);
    if metadata.is_empty() {
        return Err(MetadataError::NoExif);
    }
    Ok(metadata)
}

/// Ask the `image` crate for the raw EXIF blob.
///
/// Returns `None` when the format is unknown or its decoder exposes no blob.
fn embedded_blob(bytes: &[u8]) -> Option<Vec<u8>> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let mut decoder = reader.into_decoder().ok()?;
    decoder.exif_metadata().ok().flatten()
}

/// Let kamadak-exif locate the blob itself.
///
/// Only containers kamadak-exif can walk are handed to it. Anything else
/// (GIF, BMP, unrecognised bytes) carries no EXIF we can read. A supported
/// container whose EXIF cannot be read is malformed.
fn read_container(bytes: &[u8]) -> Result<exif::Exif, MetadataError> {
    if !has_exif_container(bytes) {
        return Err(MetadataError::NoExif);
    }
    let mut cursor = Cursor::new(bytes);
    exif::Reader::new()
        .read_from_container(&mut cursor)
        .map_err(|e| match e {
            exif::Error::NotFound(_) => MetadataError::NoExif,
            other => MetadataError::Malformed(other.to_string()),
        })
}

fn has_exif_container(bytes: &[u8]) -> bool {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Tiff) => true,
        _ => is_heif(bytes),
    }
}

/// ISO BMFF files (HEIF/HEIC) start with a size word followed by `ftyp`.
fn is_heif(bytes: &[u8]) -> bool {
    bytes.get(4..8) == Some(b"ftyp".as_slice())
}

// ---------------------------------------------------------------------------
// Field value conversion
// ---------------------------------------------------------------------------

fn field_value(field: &exif::Field) -> Value {
    use exif::Value as V;

    match &field.value {
        V::Ascii(strings) => collapse(strings.iter().map(|s| Value::String(ascii(s)))),
        V::Byte(v) => collapse(v.iter().map(|n| Value::from(*n))),
        V::Short(v) => collapse(v.iter().map(|n| Value::from(*n))),
        V::Long(v) => collapse(v.iter().map(|n| Value::from(*n))),
        V::SByte(v) => collapse(v.iter().map(|n| Value::from(*n))),
        V::SShort(v) => collapse(v.iter().map(|n| Value::from(*n))),
        V::SLong(v) => collapse(v.iter().map(|n| Value::from(*n))),
        V::Rational(v) => collapse(v.iter().map(|r| float(r.to_f64()))),
        V::SRational(v) => collapse(v.iter().map(|r| float(r.to_f64()))),
        V::Float(v) => collapse(v.iter().map(|n| float(f64::from(*n)))),
        V::Double(v) => collapse(v.iter().map(|n| float(*n))),
        _ => Value::String(field.display_value().to_string()),
    }
}

fn ascii(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Non-finite values (zero-denominator rationals) have no JSON form.
fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn collapse(values: impl Iterator<Item = Value>) -> Value {
    let mut values: Vec<Value> = values.collect();
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    }
}
