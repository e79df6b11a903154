//! Batch generation
//!
//! Every email in a batch is rendered and stored in order. A failure for one
//! address is recorded and the batch moves on; the result is a fold over the
//! tagged per-email outcomes.

use qrmint_common::{ArtifactKey, ArtifactStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::qr::QrGenerator;

/// A stored QR code image for one email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub email: String,
    pub key: ArtifactKey,
    pub file_name: String,
}

impl GeneratedArtifact {
    pub fn new(email: &str) -> Self {
        let key = ArtifactKey::from_email(email);
        let file_name = key.file_name();
        Self {
            email: email.to_string(),
            key,
            file_name,
        }
    }
}

/// An email whose code could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEmail {
    pub email: String,
    pub reason: String,
}

/// Outcome for a single email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Generated(GeneratedArtifact),
    Failed(FailedEmail),
}

/// Result of one generation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub artifacts: Vec<GeneratedArtifact>,
    pub failed: Vec<FailedEmail>,
}

impl BatchResult {
    fn record(mut self, outcome: BatchOutcome) -> Self {
        match outcome {
            BatchOutcome::Generated(artifact) => self.artifacts.push(artifact),
            BatchOutcome::Failed(failure) => self.failed.push(failure),
        }
        self
    }

    pub fn has_successes(&self) -> bool {
        !self.artifacts.is_empty()
    }

    pub fn failed_emails(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.email.as_str()).collect()
    }
}

/// Render and store the code for one email
pub fn generate_one(generator: &QrGenerator, store: &dyn ArtifactStore, email: &str) -> BatchOutcome {
    let artifact = GeneratedArtifact::new(email);

    let stored = generator
        .render_png(email)
        .and_then(|png| store.store(&artifact.key, &png).map_err(Into::into));

    match stored {
        Ok(()) => BatchOutcome::Generated(artifact),
        Err(e) => {
            warn!("Error generating QR code for {}: {}", email, e);
            BatchOutcome::Failed(FailedEmail {
                email: email.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Generate codes for every email, sequentially and in order
pub fn run_batch(generator: &QrGenerator, store: &dyn ArtifactStore, emails: &[String]) -> BatchResult {
    let result = emails
        .iter()
        .map(|email| generate_one(generator, store, email))
        .fold(BatchResult::default(), BatchResult::record);

    info!(
        "Batch complete: {} generated, {} failed",
        result.artifacts.len(),
        result.failed.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrmint_common::MemoryStore;

    /// Store that refuses one specific key
    struct RejectingStore {
        inner: MemoryStore,
        reject: ArtifactKey,
    }

    impl ArtifactStore for RejectingStore {
        fn store(&self, key: &ArtifactKey, bytes: &[u8]) -> qrmint_common::Result<()> {
            if *key == self.reject {
                return Err(qrmint_common::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.inner.store(key, bytes)
        }

        fn list(&self) -> qrmint_common::Result<Vec<ArtifactKey>> {
            self.inner.list()
        }

        fn load(&self, key: &ArtifactKey) -> qrmint_common::Result<Option<Vec<u8>>> {
            self.inner.load(key)
        }

        fn entries(&self) -> qrmint_common::Result<Vec<qrmint_common::StoredFile>> {
            self.inner.entries()
        }

        fn delete_all(&self) -> qrmint_common::Result<usize> {
            self.inner.delete_all()
        }
    }

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_successes_are_stored_in_order() {
        let store = MemoryStore::new();
        let result = run_batch(&QrGenerator::default(), &store, &emails(&["b@y.com", "a@x.com"]));

        let generated: Vec<&str> = result.artifacts.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(generated, vec!["b@y.com", "a@x.com"]);
        assert!(result.failed.is_empty());
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn one_failure_does_not_stop_the_batch() {
        let store = RejectingStore {
            inner: MemoryStore::new(),
            reject: ArtifactKey::from_email("bad@x.com"),
        };
        let result = run_batch(
            &QrGenerator::default(),
            &store,
            &emails(&["a@x.com", "bad@x.com", "c@x.com"]),
        );

        assert_eq!(result.artifacts.len(), 2);
        assert_eq!(result.failed_emails(), vec!["bad@x.com"]);
        assert!(result.failed[0].reason.contains("read-only"));
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn unencodable_email_is_reported() {
        let store = MemoryStore::new();
        let huge = format!("{}@x.com", "a".repeat(4000));
        let result = run_batch(&QrGenerator::default(), &store, &[huge.clone()]);

        assert!(!result.has_successes());
        assert_eq!(result.failed_emails(), vec![huge.as_str()]);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn empty_batch_produces_empty_result() {
        let store = MemoryStore::new();
        let result = run_batch(&QrGenerator::default(), &store, &[]);
        assert_eq!(result, BatchResult::default());
    }

    #[test]
    fn artifact_names_use_escaped_keys() {
        let artifact = GeneratedArtifact::new("x/y@z.com");
        assert_eq!(artifact.file_name, "x%2Fy@z.com.png");
        assert_eq!(artifact.key.email(), "x/y@z.com");
    }
}
