//! Email extraction from manual form input and CSV uploads
//!
//! Extraction is deliberately permissive: a manual token only needs an `@`,
//! a CSV cell needs both `@` and `.`. No case folding, no RFC 5322 parsing.
//! Order of first appearance is preserved and exact duplicates collapse.

use std::collections::HashSet;

use tracing::{debug, warn};

/// Ordered, duplicate-free collection of candidate addresses
#[derive(Debug, Default)]
struct UniqueList {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl UniqueList {
    fn push(&mut self, email: &str) {
        if !self.seen.contains(email) {
            self.seen.insert(email.to_string());
            self.items.push(email.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// Extract addresses from the manual entry textbox
///
/// Tokens are separated by commas or newlines and trimmed; tokens without
/// an `@` are dropped.
pub fn extract_manual(text: &str) -> Vec<String> {
    let mut emails = UniqueList::default();

    for token in text.split([',', '\n']) {
        let token = token.trim();
        if !token.is_empty() && token.contains('@') {
            emails.push(token);
        }
    }

    emails.into_vec()
}

/// Extract addresses from uploaded CSV bytes
///
/// Every cell containing both `@` and `.` is a candidate. Undecodable input
/// yields an empty list; a malformed record stops parsing and keeps what was
/// collected up to that point. Neither case fails the request.
pub fn extract_csv(content: &[u8]) -> Vec<String> {
    let text = match std::str::from_utf8(content) {
        Ok(text) => text,
        Err(e) => {
            warn!("Error reading CSV: upload is not valid UTF-8 ({})", e);
            return Vec::new();
        }
    };
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut emails = UniqueList::default();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Error reading CSV: {}", e);
                break;
            }
        };

        for cell in record.iter() {
            let cell = cell.trim();
            if cell.contains('@') && cell.contains('.') {
                emails.push(cell);
            }
        }
    }

    debug!("Extracted {} candidate emails from CSV", emails.items.len());
    emails.into_vec()
}

/// Concatenate several lists, keeping only the first occurrence of each address
pub fn merge_unique<I, L>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = String>,
{
    let mut merged = UniqueList::default();
    for list in lists {
        for email in list {
            merged.push(&email);
        }
    }
    merged.into_vec()
}
