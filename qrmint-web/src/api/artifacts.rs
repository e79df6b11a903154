//! Stored artifact routes: single-image serving, JSON listing and clearing

use axum::{
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use qrmint_common::ArtifactKey;
use serde::Serialize;
use tracing::{error, info};

use super::notice::Notice;
use crate::error::ApiError;
use crate::AppState;

/// Path segment escaping for artifact URLs; `%` in keys becomes `%25`
const SEGMENT_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'_')
    .remove(b'+')
    .remove(b'-');

/// URL under which a stored file is served
pub fn artifact_url(file_name: &str) -> String {
    format!("/volunteers/{}", utf8_percent_encode(file_name, SEGMENT_ESCAPE_SET))
}

/// One entry of `GET /api/artifacts`
#[derive(Debug, Serialize)]
pub struct ArtifactEntry {
    pub email: String,
    pub file_name: String,
    pub url: String,
}

/// Response body of `GET /api/artifacts`
#[derive(Debug, Serialize)]
pub struct ArtifactListResponse {
    pub count: usize,
    pub artifacts: Vec<ArtifactEntry>,
}

/// GET /volunteers/:filename
///
/// Serves one stored PNG. Only canonical `<key>.png` names resolve, which
/// rules out separators and `..` components.
pub async fn serve_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let key = ArtifactKey::from_file_name(&filename)
        .map_err(|_| ApiError::NotFound(filename.clone()))?;

    let store = state.store.clone();
    let lookup = key.clone();
    let bytes = tokio::task::spawn_blocking(move || store.load(&lookup)).await??;

    match bytes {
        Some(bytes) => Ok(([(CONTENT_TYPE, "image/png")], bytes).into_response()),
        None => Err(ApiError::NotFound(key.file_name())),
    }
}

/// GET /api/artifacts
///
/// Lists every stored artifact, sorted by key
pub async fn list_artifacts(
    State(state): State<AppState>,
) -> Result<Json<ArtifactListResponse>, ApiError> {
    let store = state.store.clone();
    let keys = tokio::task::spawn_blocking(move || store.list()).await??;

    let artifacts: Vec<ArtifactEntry> = keys
        .into_iter()
        .map(|key| {
            let file_name = key.file_name();
            ArtifactEntry {
                email: key.email(),
                url: artifact_url(&file_name),
                file_name,
            }
        })
        .collect();

    Ok(Json(ArtifactListResponse {
        count: artifacts.len(),
        artifacts,
    }))
}

/// GET /clear
///
/// Deletes every stored artifact and returns to the form with a notice
pub async fn clear_artifacts(State(state): State<AppState>) -> Redirect {
    let outcome = state.with_store_locked(|store| store.delete_all()).await;

    match outcome {
        Ok(Ok(removed)) => {
            info!("Cleared {} artifacts", removed);
            Notice::info("All QR codes have been cleared.").redirect()
        }
        Ok(Err(e)) => {
            error!("Error clearing files: {}", e);
            Notice::error(format!("Error clearing files: {}", e)).redirect()
        }
        Err(e) => {
            error!("Clear task failed: {}", e);
            Notice::error(format!("Error clearing files: {}", e)).redirect()
        }
    }
}
