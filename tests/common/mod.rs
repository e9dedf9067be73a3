//! Fixtures shared by the HTTP integration tests.
//!
//! Provides in-memory image fixtures and a fake upstream bucket: a real axum
//! server on an ephemeral port that the service under test fetches from.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use exif_query::config::ServiceConfig;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

pub const CREDENTIALS: &str = "admin:hunter2\nviewer:letmein\n";
pub const INDEX: &str = r#"["photos/exif.jpg", "photos/plain.png"]"#;

// =========================================================================
// Image fixtures
// =========================================================================

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn encode(format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(4, 4).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A 4x4 JPEG carrying exactly the fields the HTTP tests look up:
/// Make, Model, ISO and GPSLatitude.
pub fn exif_jpeg() -> Vec<u8> {
    let fields = [
        field(Tag::Make, Value::Ascii(vec![b"Canon".to_vec()])),
        field(Tag::Model, Value::Ascii(vec![b"Canon EOS 5D".to_vec()])),
        field(Tag::PhotographicSensitivity, Value::Short(vec![400])),
        field(
            Tag::GPSLatitude,
            Value::Rational(vec![
                Rational { num: 48, denom: 1 },
                Rational { num: 51, denom: 1 },
                Rational { num: 30, denom: 1 },
            ]),
        ),
    ];
    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut blob = Cursor::new(Vec::new());
    writer.write(&mut blob, true).unwrap();

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&blob.into_inner());
    let segment_len = u16::try_from(payload.len() + 2).unwrap();

    let jpeg = encode(ImageFormat::Jpeg);
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn plain_png() -> Vec<u8> {
    encode(ImageFormat::Png)
}

/// A 1x1 GIF. GIF has no EXIF segment.
pub const TINY_GIF: &[u8] = b"GIF89a\x01\0\x01\0\x80\0\0\0\0\0\xff\xff\xff\
    !\xf9\x04\x01\0\0\0\0,\0\0\0\0\x01\0\x01\0\0\x02\x02D\x01\0;";

// =========================================================================
// Fake upstream bucket
// =========================================================================

/// Handle to a running fake bucket.
pub struct Upstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    /// Base URL the service should be configured with.
    pub fn base_url(&self) -> String {
        format!("http://{}/bucket", self.addr)
    }

    /// Number of requests the bucket has served.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn count(State(hits): State<Arc<AtomicUsize>>, request: Request<Body>) -> Request<Body> {
    hits.fetch_add(1, Ordering::SeqCst);
    request
}

/// Start the fake bucket on an ephemeral port.
///
/// | Path | Response |
/// |---|---|
/// | `/bucket/photos/exif.jpg` | JPEG with EXIF |
/// | `/bucket/photos/plain.png` | PNG without EXIF |
/// | `/bucket/photos/slow.jpg` | JPEG after a 2 s delay |
/// | `/bucket/credentials.txt` | [`CREDENTIALS`] |
/// | `/bucket/index.json` | [`INDEX`] |
/// | anything else | 404 |
pub async fn spawn_upstream() -> Upstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let jpeg = exif_jpeg();
    let png = plain_png();
    let slow_jpeg = jpeg.clone();

    let app = Router::new()
        .route(
            "/bucket/photos/exif.jpg",
            get(move || async move { ([(header::CONTENT_TYPE, "image/jpeg")], jpeg) }),
        )
        .route(
            "/bucket/photos/plain.png",
            get(move || async move { ([(header::CONTENT_TYPE, "image/png")], png) }),
        )
        .route(
            "/bucket/photos/slow.jpg",
            get(move || async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                ([(header::CONTENT_TYPE, "image/jpeg")], slow_jpeg)
            }),
        )
        .route("/bucket/credentials.txt", get(|| async { CREDENTIALS }))
        .route("/bucket/index.json", get(|| async { INDEX }))
        .fallback(|| async { StatusCode::NOT_FOUND.into_response() })
        .layer(axum::middleware::map_request_with_state(hits.clone(), count));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream { addr, hits }
}

/// Service config pointing at the fake bucket, with a short timeout.
pub fn config_for(upstream: &Upstream) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.store.base_url = upstream.base_url();
    config.store.timeout_ms = 300;
    config.store.images = vec!["photos/exif.jpg".to_string()];
    config
}

// =========================================================================
// Request builders
// =========================================================================

pub const BOUNDARY: &str = "exif-query-test-boundary";

/// One part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.bin\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
