//! Zip archive of every stored artifact
//!
//! The archive covers the whole store, not just the latest batch. It is
//! written to an anonymous temporary file and read back for the response.

use std::io::{Read, Seek, SeekFrom, Write};

use qrmint_common::ArtifactStore;
use tracing::info;
use zip::{write::FileOptions, CompressionMethod};

use crate::error::Result;

/// Download file name offered to the browser
pub const ARCHIVE_NAME: &str = "qr_codes.zip";

/// A finished archive
#[derive(Debug)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub entries: usize,
    /// Artifacts removed afterwards under the clear-on-download policy
    pub cleared: usize,
}

/// Write every stored file into a flat zip and return its bytes
///
/// Entries keep their stored file names. The set is the same one
/// [`ArtifactStore::delete_all`] removes, so clearing afterwards never drops
/// a file that was not archived.
pub fn build_archive(store: &dyn ArtifactStore) -> Result<(Vec<u8>, usize)> {
    let mut file = tempfile::tempfile()?;
    let mut zip = zip::ZipWriter::new(&mut file);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for stored in store.entries()? {
        zip.start_file(stored.file_name.as_str(), options)?;
        zip.write_all(&stored.bytes)?;
        entries += 1;
    }
    zip.finish()?;

    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    Ok((bytes, entries))
}

/// Build the archive, then delete every artifact when `clear_after` is set
pub fn export_archive(store: &dyn ArtifactStore, clear_after: bool) -> Result<Archive> {
    let (bytes, entries) = build_archive(store)?;

    let cleared = if clear_after { store.delete_all()? } else { 0 };

    info!(
        "Built {} with {} entries ({} bytes), cleared {}",
        ARCHIVE_NAME,
        entries,
        bytes.len(),
        cleared
    );
    Ok(Archive {
        bytes,
        entries,
        cleared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrmint_common::{ArtifactKey, DirectoryStore, MemoryStore};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn archive_contains_flat_entries() {
        let store = MemoryStore::new();
        store.store(&ArtifactKey::from_email("a@x.com"), b"one").unwrap();
        store.store(&ArtifactKey::from_email("b@y.com"), b"two").unwrap();

        let (bytes, entries) = build_archive(&store).unwrap();

        assert_eq!(entries, 2);
        assert_eq!(entry_names(&bytes), vec!["a@x.com.png", "b@y.com.png"]);
    }

    #[test]
    fn entry_content_is_preserved() {
        let store = MemoryStore::new();
        store.store(&ArtifactKey::from_email("a@x.com"), b"payload").unwrap();

        let (bytes, _) = build_archive(&store).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = Vec::new();
        archive.by_name("a@x.com.png").unwrap().read_to_end(&mut content).unwrap();

        assert_eq!(content, b"payload");
    }

    #[test]
    fn empty_store_gives_empty_archive() {
        let store = MemoryStore::new();
        let (bytes, entries) = build_archive(&store).unwrap();
        assert_eq!(entries, 0);
        assert!(entry_names(&bytes).is_empty());
    }

    #[test]
    fn export_clears_store_when_enabled() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        for email in ["a@x.com", "b@y.com", "c@z.com"] {
            store.store(&ArtifactKey::from_email(email), b"png").unwrap();
        }

        let archive = export_archive(&store, true).unwrap();

        assert_eq!(archive.entries, 3);
        assert_eq!(archive.cleared, 3);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn export_archives_every_file_it_clears() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        store.store(&ArtifactKey::from_email("a@x.com"), b"png").unwrap();
        std::fs::write(dir.path().join("Jane Doe@x.com.png"), b"legacy").unwrap();

        let archive = export_archive(&store, true).unwrap();

        assert_eq!(archive.entries, 2);
        assert_eq!(archive.cleared, 2);
        assert_eq!(
            entry_names(&archive.bytes),
            vec!["Jane Doe@x.com.png", "a@x.com.png"]
        );
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn export_keeps_store_when_disabled() {
        let store = MemoryStore::new();
        store.store(&ArtifactKey::from_email("a@x.com"), b"png").unwrap();

        let archive = export_archive(&store, false).unwrap();

        assert_eq!(archive.entries, 1);
        assert_eq!(archive.cleared, 0);
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
