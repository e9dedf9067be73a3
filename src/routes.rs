//! JSON API handlers.
//!
//! Every handler returns `Result<_, AppError>`; failures become the JSON
//! error body described in [`crate::error`].

use crate::error::AppError;
use crate::query::{self, QueryBody, QueryForm};
use crate::selector::{self, ExtractedData};
use crate::server::SharedState;
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header::{CONTENT_TYPE, HeaderMap},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    pub extracted_data: ExtractedData,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub async fn list_images_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<String>>, AppError> {
    let images = state.store.list_images().await?;
    Ok(Json(images))
}

pub async fn fetch_image_handler(
    State(state): State<SharedState>,
    Query(params): Query<FetchParams>,
) -> Result<Response, AppError> {
    let path = params
        .path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(AppError::MissingParameter("PATH"))?;

    info!("Fetching image: {path}");
    let image = state.store.fetch_image(path).await?;
    info!("Image fetched successfully");

    let content_type = image
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(CONTENT_TYPE, content_type)], image.bytes).into_response())
}

pub async fn query_handler(
    State(state): State<SharedState>,
    request: Request,
) -> Result<Json<QueryResponse>, AppError> {
    let form = read_query_form(&state, request).await?;

    let expressions = form.queries.as_ref().ok_or(AppError::MissingParameter("Query"))?;
    let selectors = selector::parse_all(expressions).inspect_err(|e| {
        warn!("Rejected query expression: {e}");
    })?;
    let source = form.source()?;

    let extracted_data = query::run(&state.store, source, &selectors).await?;
    Ok(Json(QueryResponse {
        success: true,
        extracted_data,
    }))
}

pub async fn login_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, AppError> {
    let body: LoginBody = if body.is_empty() {
        LoginBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::MalformedPayload(e.to_string()))?
    };
    let username = body
        .username
        .filter(|u| !u.is_empty())
        .ok_or(AppError::MissingParameter("username"))?;
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or(AppError::MissingParameter("password"))?;

    let success = state.store.check_credentials(&username, &password).await?;
    if success {
        info!("Login succeeded for {username}");
        Ok(Json(LoginResponse {
            success,
            message: None,
        }))
    } else {
        warn!("Login failed for {username}");
        Ok(Json(LoginResponse {
            success,
            message: Some("Invalid credentials".to_string()),
        }))
    }
}

/// Read a `/query` payload: multipart form data, or a JSON body.
async fn read_query_form(state: &SharedState, request: Request) -> Result<QueryForm, AppError> {
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
        return QueryForm::from_multipart(multipart).await;
    }

    let bytes = Bytes::from_request(request, state)
        .await
        .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    if bytes.is_empty() {
        return Ok(QueryForm::default());
    }
    let body: QueryBody =
        serde_json::from_slice(&bytes).map_err(|e| AppError::MalformedPayload(e.to_string()))?;
    Ok(body.into())
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}
