//! User-facing notices
//!
//! Form endpoints report problems by redirecting to `/` with the message in
//! the query string; the index page renders it above the form.

use axum::response::Redirect;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// See-other redirect to the input form carrying this notice
    pub fn redirect(&self) -> Redirect {
        Redirect::to(&format!(
            "/?level={}&message={}",
            self.level.as_str(),
            utf8_percent_encode(&self.message, NON_ALPHANUMERIC)
        ))
    }
}

/// Query parameters accepted by `GET /`
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub message: Option<String>,
    pub level: Option<String>,
}

impl NoticeQuery {
    /// Unknown levels render as informational
    pub fn into_notice(self) -> Option<Notice> {
        let message = self.message.filter(|m| !m.trim().is_empty())?;
        match self.level.as_deref() {
            Some("error") => Some(Notice::error(message)),
            _ => Some(Notice::info(message)),
        }
    }
}
