//! Archive download endpoint

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use tracing::error;

use super::notice::Notice;
use crate::archive::{export_archive, ARCHIVE_NAME};
use crate::error::Error;
use crate::AppState;

/// GET /download_all
///
/// Streams a zip of every stored PNG. Under the clear-on-download policy
/// the store is emptied once the archive is built. Failures return to the
/// form with a notice.
pub async fn download_all(State(state): State<AppState>) -> Response {
    let clear_after = state.clear_on_download;
    let archive = state
        .with_store_locked(move |store| export_archive(store, clear_after))
        .await
        .map_err(Error::from)
        .and_then(|archive| archive);

    match archive {
        Ok(archive) => (
            [
                (CONTENT_TYPE, "application/zip".to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", ARCHIVE_NAME),
                ),
            ],
            archive.bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Error creating zip file: {}", e);
            Notice::error(format!("Error creating zip file: {}", e))
                .redirect()
                .into_response()
        }
    }
}
