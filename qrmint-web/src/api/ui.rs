//! UI serving routes
//!
//! Renders the input form and the results listing with maud.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{html, Markup, DOCTYPE};

use super::artifacts::artifact_url;
use super::notice::{Notice, NoticeLevel, NoticeQuery};
use crate::batch::BatchResult;

const STYLE_CSS: &str = include_str!("../ui/style.css");

fn notice_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "notice info",
        NoticeLevel::Error => "notice error",
    }
}

fn layout(title: &str, notices: &[Notice], content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href="/static/style.css";
            }
            body {
                main {
                    h1 { (title) }
                    @for notice in notices {
                        p class=(notice_class(notice.level)) { (notice.message) }
                    }
                    (content)
                }
            }
        }
    }
}

/// Input form: manual entry plus CSV upload
pub fn index_page(notice: Option<Notice>) -> Markup {
    let notices: Vec<Notice> = notice.into_iter().collect();

    layout(
        "Volunteer QR Codes",
        &notices,
        html! {
            form method="post" action="/generate" enctype="multipart/form-data" {
                label for="manual_emails" { "Email addresses (one per line or comma-separated)" }
                textarea id="manual_emails" name="manual_emails" rows="8"
                    placeholder="jane@example.org, john@example.org" {}

                label for="csv_file" { "Or upload a CSV file" }
                input id="csv_file" type="file" name="csv_file" accept=".csv";

                button type="submit" { "Generate QR codes" }
            }
            nav {
                a href="/download_all" { "Download all as zip" }
                " "
                a href="/clear" { "Clear generated codes" }
            }
        },
    )
}

/// Listing of one batch: generated codes and failed addresses
pub fn results_page(result: &BatchResult, notices: &[Notice]) -> Markup {
    layout(
        "Generated QR Codes",
        notices,
        html! {
            section class="artifacts" {
                @for artifact in &result.artifacts {
                    figure {
                        a href=(artifact_url(&artifact.file_name)) {
                            img src=(artifact_url(&artifact.file_name)) alt=(artifact.email) width="160";
                        }
                        figcaption { (artifact.email) }
                    }
                }
            }
            @if !result.failed.is_empty() {
                section class="failed" {
                    h2 { "Failed" }
                    ul {
                        @for failure in &result.failed {
                            li { (failure.email) }
                        }
                    }
                }
            }
            nav {
                a href="/download_all" { "Download all as zip" }
                " "
                a href="/" { "Generate more" }
                " "
                a href="/clear" { "Clear generated codes" }
            }
        },
    )
}

/// GET /
///
/// Serves the input form, with an optional notice from a redirect
pub async fn serve_index(Query(query): Query<NoticeQuery>) -> Markup {
    index_page(query.into_notice())
}

/// GET /static/style.css
pub async fn serve_style_css() -> Response {
    (StatusCode::OK, [("content-type", "text/css")], STYLE_CSS).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{FailedEmail, GeneratedArtifact};

    #[test]
    fn notices_are_escaped() {
        let page = index_page(Some(Notice::error("<script>alert(1)</script>"))).into_string();
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn results_list_successes_and_failures() {
        let result = BatchResult {
            artifacts: vec![GeneratedArtifact::new("a@x.com")],
            failed: vec![FailedEmail {
                email: "bad@x.com".to_string(),
                reason: "boom".to_string(),
            }],
        };
        let page = results_page(&result, &[Notice::info("Successfully generated 1 QR codes!")])
            .into_string();

        assert!(page.contains("/volunteers/a@x.com.png"));
        assert!(page.contains("bad@x.com"));
        assert!(page.contains("Successfully generated 1 QR codes!"));
    }
}
