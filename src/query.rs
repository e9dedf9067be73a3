//! The request pipeline shared by the JSON API and the HTML front end.
//!
//! ```text
//! QueryForm ──▶ ImageSource ──acquire──▶ bytes ──decode──▶ Metadata ──extract──▶ ExtractedData
//! ```
//!
//! Each request runs the pipeline on its own; nothing is cached or shared
//! beyond the HTTP client.

use crate::error::AppError;
use crate::metadata::{self, Metadata};
use crate::selector::{self, ExtractedData, Selector};
use crate::store::RemoteStore;
use axum::body::Bytes;
use axum::extract::Multipart;
use serde::Deserialize;
use tracing::info;

/// Where the image bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Bytes uploaded with the request.
    Upload(Bytes),
    /// Identifier resolved against the remote bucket.
    Remote(String),
}

impl ImageSource {
    /// Pick the source from optional request parts. An upload wins over a path;
    /// empty values count as absent.
    pub fn from_parts(upload: Option<Bytes>, path: Option<String>) -> Result<Self, AppError> {
        if let Some(bytes) = upload.filter(|b| !b.is_empty()) {
            return Ok(ImageSource::Upload(bytes));
        }
        match path.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
            Some(path) => Ok(ImageSource::Remote(path)),
            None => Err(AppError::MissingParameter("image or imagePath")),
        }
    }

    /// Remote identifier, if the image comes from the bucket.
    pub fn remote_path(&self) -> Option<&str> {
        match self {
            ImageSource::Remote(path) => Some(path),
            ImageSource::Upload(_) => None,
        }
    }
}

/// Obtain the raw image bytes.
pub async fn acquire(store: &RemoteStore, source: ImageSource) -> Result<Bytes, AppError> {
    match source {
        ImageSource::Upload(bytes) => {
            info!("Using uploaded image ({} bytes)", bytes.len());
            Ok(bytes)
        }
        ImageSource::Remote(path) => {
            info!("Fetching image: {path}");
            let image = store.fetch_image(&path).await?;
            info!("Image fetched successfully ({} bytes)", image.bytes.len());
            Ok(image.bytes)
        }
    }
}

/// Decode EXIF metadata on the blocking pool.
pub async fn decode(bytes: Bytes) -> Result<Metadata, AppError> {
    info!("Extracting EXIF data...");
    let metadata = tokio::task::spawn_blocking(move || metadata::decode(&bytes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    info!("EXIF data extracted successfully");
    Ok(metadata)
}

/// Acquire, decode, and evaluate.
pub async fn run(
    store: &RemoteStore,
    source: ImageSource,
    selectors: &[Selector],
) -> Result<ExtractedData, AppError> {
    let bytes = acquire(store, source).await?;
    let metadata = decode(bytes).await?;
    Ok(selector::extract(&metadata, selectors))
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// One expression or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QueryList {
    Many(Vec<String>),
    One(String),
}

impl QueryList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            QueryList::Many(v) => v,
            QueryList::One(s) => vec![s],
        }
    }
}

/// JSON body accepted by `POST /query`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody {
    pub image_path: Option<String>,
    pub query: Option<QueryList>,
}

/// Multipart form accepted by `POST /query` and `POST /view`.
///
/// | Part | Meaning |
/// |---|---|
/// | `image` | uploaded file |
/// | `imagePath` | remote identifier |
/// | `query` | JSON array of expressions, a JSON string, or a raw expression; repeatable |
/// | `field` | `Namespace.Field` checkbox value (front end) |
/// | `group` | namespace whose listed fields are all selected (front end) |
#[derive(Debug, Default)]
pub struct QueryForm {
    pub upload: Option<Bytes>,
    pub image_path: Option<String>,
    pub queries: Option<Vec<String>>,
    pub fields: Vec<String>,
    pub groups: Vec<String>,
}

impl QueryForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = QueryForm::default();
        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::MalformedPayload(e.body_text()))?
        {
            let name = part.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    let bytes = part
                        .bytes()
                        .await
                        .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
                    form.upload = Some(bytes);
                }
                "imagePath" | "query" | "field" | "group" => {
                    let text = part
                        .text()
                        .await
                        .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
                    form.push_text(&name, text);
                }
                _ => {}
            }
        }
        Ok(form)
    }

    fn push_text(&mut self, name: &str, text: String) {
        match name {
            "imagePath" => self.image_path = Some(text),
            "query" => self
                .queries
                .get_or_insert_with(Vec::new)
                .extend(parse_query_text(&text)),
            "field" => self.fields.push(text),
            "group" => self.groups.push(text),
            _ => {}
        }
    }

    pub fn source(&self) -> Result<ImageSource, AppError> {
        ImageSource::from_parts(self.upload.clone(), self.image_path.clone())
    }
}

impl From<QueryBody> for QueryForm {
    fn from(body: QueryBody) -> Self {
        QueryForm {
            image_path: body.image_path,
            queries: body.query.map(QueryList::into_vec),
            ..QueryForm::default()
        }
    }
}

/// A `query` part is a JSON-encoded list (what browsers send via
/// `JSON.stringify`), a JSON string, or a bare expression.
fn parse_query_text(text: &str) -> Vec<String> {
    match serde_json::from_str::<QueryList>(text) {
        Ok(list) => list.into_vec(),
        Err(_) => vec![text.to_string()],
    }
}
