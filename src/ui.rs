//! Server-rendered front end.
//!
//! Two pages, both plain HTML forms with no JavaScript:
//!
//! - `GET /` lists the catalog and offers a form: an image path or an
//!   upload, plus checkboxes for the fields to query.
//! - `POST /view` runs the same pipeline as `POST /query` and renders the
//!   result as a Field/Value table.
//!
//! HTML is generated with Maud, so every interpolated value is escaped.

use crate::error::AppError;
use crate::metadata::Namespace;
use crate::query::{self, QueryForm};
use crate::selector::{self, ExtractedData};
use crate::server::SharedState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
};
use maud::{DOCTYPE, Markup, html};
use serde_json::Value;
use tracing::warn;
use url::form_urlencoded;

/// Fields offered as checkboxes, per namespace.
pub const FIELD_GROUPS: &[(Namespace, &[&str])] = &[
    (
        Namespace::Image,
        &[
            "ImageWidth",
            "ImageLength",
            "Make",
            "Model",
            "DateTime",
            "Orientation",
            "XResolution",
            "YResolution",
            "Software",
        ],
    ),
    (
        Namespace::Photo,
        &[
            "DateTimeOriginal",
            "ExposureTime",
            "FNumber",
            "ApertureValue",
            "FocalLength",
            "PhotographicSensitivity",
            "LensModel",
        ],
    ),
    (
        Namespace::GpsInfo,
        &[
            "GPSLatitudeRef",
            "GPSLatitude",
            "GPSLongitudeRef",
            "GPSLongitude",
            "GPSAltitude",
        ],
    ),
];

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; color: #111; }
fieldset { display: inline-block; vertical-align: top; margin: 0 1rem 1rem 0; }
label { display: block; }
.all { font-weight: bold; }
table { border-collapse: collapse; margin-top: 1rem; }
th, td { border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: left; }
.error { color: #a00; }
img.preview { max-width: 100%; height: auto; }
"#;

pub async fn index_page(State(state): State<SharedState>) -> Html<String> {
    let (images, list_error) = match state.store.list_images().await {
        Ok(images) => (images, None),
        Err(e) => {
            warn!("Failed to list images: {e}");
            (Vec::new(), Some("Could not load the image list."))
        }
    };
    Html(render_index(&images, list_error).into_string())
}

pub async fn view_page(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    match run_view(&state, multipart).await {
        Ok(view) => (StatusCode::OK, Html(render_result(&view).into_string())),
        Err(err) => {
            warn!("View request failed: {err}");
            (
                err.status(),
                Html(render_error(&err.message(), err.detail().as_deref()).into_string()),
            )
        }
    }
}

/// Everything the result page shows.
#[derive(Debug)]
pub struct View {
    pub image_path: Option<String>,
    pub upload_len: Option<usize>,
    pub extracted: ExtractedData,
}

async fn run_view(state: &SharedState, multipart: Multipart) -> Result<View, AppError> {
    let form = QueryForm::from_multipart(multipart).await?;
    let expressions = form_expressions(&form);
    if expressions.is_empty() {
        return Err(AppError::MissingParameter("field"));
    }
    let selectors = selector::parse_all(&expressions)?;
    let source = form.source()?;

    let image_path = source.remote_path().map(str::to_string);
    let upload_len = match &source {
        query::ImageSource::Upload(bytes) => Some(bytes.len()),
        query::ImageSource::Remote(_) => None,
    };
    let extracted = query::run(&state.store, source, &selectors).await?;

    Ok(View {
        image_path,
        upload_len,
        extracted,
    })
}

/// Checked fields plus every field of each checked group, as selectors.
fn form_expressions(form: &QueryForm) -> Vec<String> {
    let mut expressions: Vec<String> = Vec::new();
    let mut push = |expression: String| {
        if !expressions.contains(&expression) {
            expressions.push(expression);
        }
    };

    for group in &form.groups {
        if let Some((namespace, fields)) = FIELD_GROUPS
            .iter()
            .find(|(ns, _)| ns.as_str() == group.as_str())
        {
            for field in *fields {
                push(format!("$..{namespace}.{field}"));
            }
        }
    }
    for field in &form.fields {
        push(format!("$..{field}"));
    }
    expressions
}

/// Link to the image proxy for a remote identifier.
fn fetch_image_href(path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("path", path)
        .finish();
    format!("/fetch-image?{query}")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                header { h1 { a href="/" { "EXIF Viewer" } } }
                (content)
            }
        }
    }
}

fn render_index(images: &[String], list_error: Option<&str>) -> Markup {
    let content = html! {
        section {
            h2 { "Available Images" }
            @if let Some(message) = list_error {
                p.error { (message) }
            }
            ul.image-list {
                @for image in images {
                    li { a href=(fetch_image_href(image)) { (image) } }
                }
            }
        }
        section {
            h2 { "Query an Image" }
            form method="post" action="/view" enctype="multipart/form-data" {
                p {
                    label {
                        "Image path: "
                        input type="text" name="imagePath" list="catalog" placeholder="Enter image name...";
                    }
                    datalist #catalog {
                        @for image in images {
                            option value=(image) {}
                        }
                    }
                }
                p {
                    label {
                        "Or upload: "
                        input type="file" name="image" accept="image/*";
                    }
                }
                @for (namespace, fields) in FIELD_GROUPS {
                    fieldset {
                        legend { (namespace) }
                        label.all {
                            input type="checkbox" name="group" value=(namespace);
                            " All fields"
                        }
                        @for field in *fields {
                            label {
                                input type="checkbox" name="field" value=(format!("{namespace}.{field}"));
                                " " (field)
                            }
                        }
                    }
                }
                p { button type="submit" { "Submit Query" } }
            }
        }
    };
    base_document("EXIF Viewer", content)
}

fn render_result(view: &View) -> Markup {
    let content = html! {
        section {
            @if let Some(path) = &view.image_path {
                h2 { (path) }
                img.preview src=(fetch_image_href(path)) alt="Preview";
            } @else if let Some(len) = view.upload_len {
                h2 { "Uploaded image (" (len) " bytes)" }
            }
        }
        section {
            h2 { "EXIF Data" }
            @if view.extracted.is_empty() {
                p { "No EXIF data found" }
            } @else {
                table {
                    thead { tr { th { "Field" } th { "Value" } } }
                    tbody {
                        @for (field, values) in &view.extracted {
                            tr {
                                td { (field) }
                                td {
                                    (values.iter().map(display_value).collect::<Vec<_>>().join(", "))
                                }
                            }
                        }
                    }
                }
            }
        }
        p { a href="/" { "New query" } }
    };
    base_document("EXIF Data", content)
}

fn render_error(message: &str, detail: Option<&str>) -> Markup {
    let content = html! {
        section {
            h2.error { (message) }
            @if let Some(detail) = detail {
                p { code { (detail) } }
            }
            p { a href="/" { "Back" } }
        }
    };
    base_document("Error", content)
}
