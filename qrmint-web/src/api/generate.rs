//! Batch generation endpoint
//!
//! Accepts the multipart form from the index page, merges the manual and CSV
//! address lists, and renders the results listing.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qrmint_common::email::{extract_csv, extract_manual, merge_unique};
use tracing::{error, info, warn};

use super::notice::Notice;
use super::ui::results_page;
use crate::batch::run_batch;
use crate::AppState;

/// Form field carrying the manual entry textbox
pub const MANUAL_FIELD: &str = "manual_emails";
/// Form field carrying the uploaded CSV file
pub const CSV_FIELD: &str = "csv_file";

/// An uploaded file
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Parsed `POST /generate` form
#[derive(Debug, Default)]
pub struct GenerateForm {
    pub manual_emails: String,
    pub csv_file: Option<Upload>,
}

/// Only `.csv` uploads are accepted (extension compared case-insensitively)
pub fn is_csv_filename(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
}

async fn read_form(multipart: &mut Multipart) -> Result<GenerateForm, MultipartError> {
    let mut form = GenerateForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(MANUAL_FIELD) => {
                form.manual_emails = field.text().await?;
            }
            Some(CSV_FIELD) => {
                // Browsers send an empty, unnamed part when no file was chosen
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !file_name.is_empty() {
                    form.csv_file = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /generate
///
/// Input problems redirect back to the form with a notice. If at least one
/// code was produced the results page lists successes and failures.
pub async fn generate_qr_codes(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Rejected oversized upload: {}", e);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Upload exceeds the {} byte limit",
                    state.max_upload_bytes
                ),
            )
                .into_response();
        }
        Err(e) => {
            warn!("Error reading form: {}", e);
            return Notice::error(format!("Error reading CSV file: {}", e.body_text()))
                .redirect()
                .into_response();
        }
    };

    let mut sources = vec![extract_manual(&form.manual_emails)];

    if let Some(upload) = form.csv_file {
        if !is_csv_filename(&upload.file_name) {
            info!("Rejected upload with disallowed extension: {}", upload.file_name);
            return Notice::error("Only .csv files can be uploaded.")
                .redirect()
                .into_response();
        }
        sources.push(extract_csv(&upload.bytes));
    }

    let emails = merge_unique(sources);
    if emails.is_empty() {
        return Notice::error("No valid email addresses found. Please check your input.")
            .redirect()
            .into_response();
    }

    info!("Generating QR codes for {} emails", emails.len());

    let generator = state.generator.clone();
    let result = state
        .with_store_locked(move |store| run_batch(&generator, store, &emails))
        .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!("Generation task failed: {}", e);
            return Notice::error(format!("QR code generation failed: {}", e))
                .redirect()
                .into_response();
        }
    };

    let mut notices = Vec::new();
    if !result.failed.is_empty() {
        notices.push(Notice::error(format!(
            "Failed to generate QR codes for: {}",
            result.failed_emails().join(", ")
        )));
    }

    if !result.has_successes() {
        let mut message = String::from("No QR codes were generated successfully.");
        if let Some(failed) = notices.first() {
            message = format!("{} {}", failed.message, message);
        }
        return Notice::error(message).redirect().into_response();
    }

    notices.push(Notice::info(format!(
        "Successfully generated {} QR codes!",
        result.artifacts.len()
    )));

    results_page(&result, &notices).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_check() {
        assert!(is_csv_filename("volunteers.csv"));
        assert!(is_csv_filename("VOLUNTEERS.CSV"));
        assert!(is_csv_filename("list.v2.csv"));
        assert!(!is_csv_filename("volunteers.txt"));
        assert!(!is_csv_filename("csv"));
        assert!(!is_csv_filename("volunteers.csv.exe"));
    }
}
