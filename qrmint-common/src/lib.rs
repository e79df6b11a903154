//! # qrmint Common Library
//!
//! Shared code for the qrmint service:
//! - Email extraction from form text and CSV uploads
//! - Artifact keys and the injected artifact store
//! - Configuration loading
//! - Error types

pub mod config;
pub mod email;
pub mod error;
pub mod storage;

pub use error::{Error, Result};
pub use storage::{ArtifactKey, ArtifactStore, DirectoryStore, MemoryStore, StoredFile};
