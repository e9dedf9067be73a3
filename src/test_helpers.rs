//! Shared test utilities for the exif-query test suite.
//!
//! Builds in-memory image fixtures so tests never depend on files checked
//! into the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let jpeg = exif_jpeg(&sample_fields());
//! let metadata = crate::metadata::decode(&jpeg).unwrap();
//! ```

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

// =========================================================================
// EXIF fields
// =========================================================================

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rationals(tag: Tag, values: &[(u32, u32)]) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            values
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}

fn short(tag: Tag, value: u16) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![value]),
    }
}

/// A camera-like field set spanning the Image, Photo and GPSInfo namespaces.
pub fn sample_fields() -> Vec<Field> {
    vec![
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "Canon EOS 5D"),
        short(Tag::Orientation, 1),
        rationals(Tag::XResolution, &[(72, 1)]),
        rationals(Tag::YResolution, &[(72, 1)]),
        ascii(Tag::DateTimeOriginal, "2024:05:01 10:30:00"),
        short(Tag::PhotographicSensitivity, 400),
        rationals(Tag::FocalLength, &[(50, 1)]),
        rationals(Tag::FNumber, &[(28, 10)]),
        ascii(Tag::GPSLatitudeRef, "N"),
        rationals(Tag::GPSLatitude, &[(48, 1), (51, 1), (30, 1)]),
        ascii(Tag::GPSLongitudeRef, "E"),
        rationals(Tag::GPSLongitude, &[(2, 1), (21, 1), (0, 1)]),
    ]
}

/// Serialize fields into a little-endian TIFF-structured EXIF blob.
pub fn exif_blob(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, true).unwrap();
    buf.into_inner()
}

// =========================================================================
// Image containers
// =========================================================================

fn encode(format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::new_rgb8(4, 4);
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A small JPEG with an `Exif` APP1 segment right after SOI.
pub fn exif_jpeg(fields: &[Field]) -> Vec<u8> {
    let jpeg = encode(ImageFormat::Jpeg);
    let blob = exif_blob(fields);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&blob);
    let segment_len = u16::try_from(payload.len() + 2).unwrap();

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// A small PNG with no EXIF at all.
pub fn plain_png() -> Vec<u8> {
    encode(ImageFormat::Png)
}
