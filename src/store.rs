//! Remote image bucket client.
//!
//! Every read goes through [`RemoteStore`], a thin wrapper over a shared
//! `reqwest::Client` with a fixed per-request timeout. Failures are not
//! retried.
//!
//! Identifiers are appended to the configured base URL as percent-encoded
//! path segments, never concatenated into the URL string, so a caller can
//! only ever reach paths below the base URL's host.

use crate::config::StoreConfig;
use axum::body::Bytes;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

/// Longest accepted image identifier.
pub const MAX_IDENTIFIER_LEN: usize = 512;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid image path: {0}")]
    InvalidPath(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("upstream document is invalid: {0}")]
    InvalidDocument(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return StoreError::Timeout(err.to_string());
        }
        match err.status() {
            Some(status) => StoreError::Status {
                status: status.as_u16(),
                url: err.url().map(Url::to_string).unwrap_or_default(),
            },
            None => StoreError::Request(err.to_string()),
        }
    }
}

/// Image bytes fetched from the bucket, with the upstream content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// HTTP client bound to one bucket base URL.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    index_path: Option<String>,
    credentials_path: String,
    catalog: Vec<String>,
}

impl RemoteStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Client(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Client(format!(
                "base URL cannot carry paths: {base_url}"
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            index_path: config.index_path.clone(),
            credentials_path: config.credentials_path.clone(),
            catalog: config.images.clone(),
        })
    }

    /// Resolve an identifier below the base URL.
    pub fn resolve(&self, identifier: &str) -> Result<Url, StoreError> {
        validate_identifier(identifier)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidPath(identifier.to_string()))?
            .pop_if_empty()
            .extend(identifier.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Fetch one image by identifier.
    pub async fn fetch_image(&self, identifier: &str) -> Result<FetchedImage, StoreError> {
        let url = self.resolve(identifier)?;
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok(FetchedImage {
            content_type,
            bytes,
        })
    }

    /// Identifiers of the images clients may ask for.
    ///
    /// Reads the remote index document when one is configured, otherwise
    /// returns the static catalog.
    pub async fn list_images(&self) -> Result<Vec<String>, StoreError> {
        let Some(index_path) = &self.index_path else {
            return Ok(self.catalog.clone());
        };
        let body = self.fetch_text(index_path).await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("Index document {index_path} is not a JSON array of strings: {e}");
            StoreError::InvalidDocument(e.to_string())
        })
    }

    /// Check a username/password pair against the remote credential document.
    ///
    /// The document holds one `username:password` pair per line.
    pub async fn check_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, StoreError> {
        let document = self.fetch_text(&self.credentials_path).await?;
        Ok(credentials_match(&document, username, password))
    }

    async fn fetch_text(&self, identifier: &str) -> Result<String, StoreError> {
        let url = self.resolve(identifier)?;
        debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

fn validate_identifier(identifier: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| Err(StoreError::InvalidPath(format!("{reason}: {identifier:?}")));

    let trimmed = identifier.trim_start_matches('/');
    if trimmed.is_empty() {
        return invalid("empty");
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return invalid("too long");
    }
    if identifier.chars().any(|c| c.is_control() || c == '\\') {
        return invalid("forbidden character");
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return invalid("empty segment");
        }
        if segment == "." || segment == ".." {
            return invalid("relative segment");
        }
    }
    Ok(())
}

fn credentials_match(document: &str, username: &str, password: &str) -> bool {
    document
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .any(|(user, pass)| user == username && pass == password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: &str) -> RemoteStore {
        RemoteStore::new(&StoreConfig {
            base_url: base_url.to_string(),
            ..StoreConfig::default()
        })
        .unwrap()
    }

    // =========================================================================
    // resolve() tests
    // =========================================================================

    #[test]
    fn resolve_appends_segments() {
        let s = store("https://picsum.photos");
        assert_eq!(
            s.resolve("id/237/200/300").unwrap().as_str(),
            "https://picsum.photos/id/237/200/300"
        );
    }

    #[test]
    fn resolve_keeps_base_path() {
        let s = store("http://127.0.0.1:9000/bucket/");
        assert_eq!(
            s.resolve("/photos/a.jpg").unwrap().as_str(),
            "http://127.0.0.1:9000/bucket/photos/a.jpg"
        );
    }

    #[test]
    fn resolve_cannot_change_host() {
        let s = store("https://picsum.photos");
        let url = s.resolve("https:evil.example").unwrap();
        assert_eq!(url.host_str(), Some("picsum.photos"));

        let url = s.resolve("a?x=1#frag").unwrap();
        assert_eq!(url.host_str(), Some("picsum.photos"));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn resolve_rejects_traversal_and_empty() {
        let s = store("https://picsum.photos/base");
        for bad in ["", "/", "../secret", "a/../../b", "a//b", "./a", "a\\b", "a\nb"] {
            assert!(
                matches!(s.resolve(bad), Err(StoreError::InvalidPath(_))),
                "accepted: {bad:?}"
            );
        }
    }

    #[test]
    fn resolve_rejects_overlong_identifier() {
        let s = store("https://picsum.photos");
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(s.resolve(&long).is_err());
    }

    #[test]
    fn new_rejects_cannot_be_a_base_url() {
        let result = RemoteStore::new(&StoreConfig {
            base_url: "data:text/plain,hello".to_string(),
            ..StoreConfig::default()
        });
        assert!(matches!(result, Err(StoreError::Client(_))));
    }

    // =========================================================================
    // credentials_match() tests
    // =========================================================================

    #[test]
    fn credentials_match_exact_pair() {
        let doc = "admin:hunter2\nviewer:letmein\n";
        assert!(credentials_match(doc, "admin", "hunter2"));
        assert!(credentials_match(doc, "viewer", "letmein"));
    }

    #[test]
    fn credentials_reject_wrong_password_or_user() {
        let doc = "admin:hunter2";
        assert!(!credentials_match(doc, "admin", "hunter3"));
        assert!(!credentials_match(doc, "root", "hunter2"));
        assert!(!credentials_match(doc, "admin", ""));
    }

    #[test]
    fn credentials_ignore_blank_and_malformed_lines() {
        let doc = "\n   \nnot-a-pair\nadmin:pw:with:colons\n";
        assert!(credentials_match(doc, "admin", "pw:with:colons"));
        assert!(!credentials_match(doc, "not-a-pair", ""));
    }

    #[tokio::test]
    async fn list_images_without_index_returns_catalog() {
        let s = store("https://picsum.photos");
        let images = s.list_images().await.unwrap();
        assert_eq!(images, StoreConfig::default().images);
    }
}
