//! HTTP API handlers for qrmint-web

pub mod artifacts;
pub mod buildinfo;
pub mod download;
pub mod generate;
pub mod health;
pub mod notice;
pub mod ui;

pub use artifacts::{artifact_url, clear_artifacts, list_artifacts, serve_artifact};
pub use buildinfo::get_build_info;
pub use download::download_all;
pub use generate::generate_qr_codes;
pub use health::health_routes;
pub use ui::{serve_index, serve_style_css};
