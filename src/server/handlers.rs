use anyhow::{Context, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{debug, info};

use super::state::AppState;
use super::translate::{NO_FILE_PART, ServerError, translate_upload};
use super::upload::parse_upload;
use crate::providers::Provider;

/// `GET /` serves the upload form, `POST /` translates an upload.
pub fn router<P: Provider + 'static>(state: Arc<AppState<P>>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index::<P>).post(translate::<P>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn run_server<P: Provider + 'static>(state: AppState<P>, addr: &str) -> Result<()> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!(
        "listening on http://{}",
        listener.local_addr().with_context(|| "failed to read bound address")?
    );
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn index<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
) -> Result<Html<String>, ServerError> {
    Ok(Html(state.render_index()?))
}

async fn translate<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServerError> {
    // A body that is not multipart carries no file part at all.
    let multipart = multipart.map_err(|rejection| {
        debug!("upload is not multipart: {}", rejection.body_text());
        ServerError::bad_request(NO_FILE_PART)
    })?;
    let form = parse_upload(multipart).await?;
    translate_upload(state.pipeline(), form).await
}
