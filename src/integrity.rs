//! # Integrity Verification Module
//!
//! Questo modulo garantisce che ogni copia/spostamento sia byte-exact.
//!
//! ## Responsabilità:
//! - Calcolo hash SHA-256 del contenuto dei file
//! - Chunk size adattato alla classe del file (immagini vs archivi grandi)
//! - Confronto di due set di file per nome e poi per hash
//! - Copia/spostamento verificati: la sorgente viene cancellata solo dopo il match
//!
//! ## Chunk size:
//! - **Immagini** (jpg/jpeg/png): 64 KB fissi
//! - **Altri file < 100 MB**: 1 MB
//! - **Altri file < 1 GB**: 4 MB
//! - **Altri file >= 1 GB**: 16 MB
//!
//! ## Report:
//! - `missing`: presenti nella sorgente, assenti nella copia
//! - `extra`: presenti nella copia, assenti nella sorgente (solo warning)
//! - `corrupt`: presenti in entrambi con hash diverso o non calcolabile
//!
//! ## Esempio:
//! ```rust,ignore
//! let report = IntegrityVerifier::compare_file_sets(&originals, &copies).await;
//! if !report.is_clean() {
//!     return Err(PackError::Integrity(report.summary()));
//! }
//! ```

use crate::error::PackError;
use crate::file_manager::FileManager;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

const IMAGE_CHUNK: usize = 64 * 1024;
const SMALL_CHUNK: usize = 1024 * 1024;
const MEDIUM_CHUNK: usize = 4 * 1024 * 1024;
const LARGE_CHUNK: usize = 16 * 1024 * 1024;

const MB_100: u64 = 100 * 1024 * 1024;
const GB_1: u64 = 1024 * 1024 * 1024;

/// Source and copy hash of one file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegrityRecord {
    pub source_hash: Option<String>,
    pub copy_hash: Option<String>,
}

impl IntegrityRecord {
    /// Both hashes known and equal
    pub fn is_intact(&self) -> bool {
        match (&self.source_hash, &self.copy_hash) {
            (Some(source), Some(copy)) => source == copy,
            _ => false,
        }
    }
}

/// Result of comparing a source file set against its copy
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub records: BTreeMap<String, IntegrityRecord>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub corrupt: Vec<String>,
}

impl IntegrityReport {
    /// No missing and no corrupt files. Extras do not count.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} verified, {} missing, {} corrupt, {} extra",
            self.records.values().filter(|r| r.is_intact()).count(),
            self.missing.len(),
            self.corrupt.len(),
            self.extra.len()
        )
    }
}

/// Hashing and verified file transfer
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Read chunk size for a file of the given class and length
    pub fn chunk_size(path: &Path, len: u64) -> usize {
        if FileManager::is_image(path) {
            IMAGE_CHUNK
        } else if len < MB_100 {
            SMALL_CHUNK
        } else if len < GB_1 {
            MEDIUM_CHUNK
        } else {
            LARGE_CHUNK
        }
    }

    /// SHA-256 of a file's content, hex encoded
    pub async fn hash_file(path: &Path) -> std::io::Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let mut buffer = vec![0u8; Self::chunk_size(path, len)];
        let mut hasher = Sha256::new();

        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Hash or `None` on read failure (reported, not fatal)
    async fn try_hash(path: &Path) -> Option<String> {
        match Self::hash_file(path).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(path = %path.display(), "Could not hash file: {}", e);
                None
            }
        }
    }

    /// Compare two file sets by file name, then by content hash
    pub async fn compare_file_sets(source: &[PathBuf], copy: &[PathBuf]) -> IntegrityReport {
        let by_name = |files: &[PathBuf]| -> BTreeMap<String, PathBuf> {
            files
                .iter()
                .filter_map(|f| {
                    f.file_name()
                        .map(|n| (n.to_string_lossy().into_owned(), f.clone()))
                })
                .collect()
        };
        let source_files = by_name(source);
        let copy_files = by_name(copy);

        let mut report = IntegrityReport::default();

        for (name, source_path) in &source_files {
            let Some(copy_path) = copy_files.get(name) else {
                report.missing.push(name.clone());
                continue;
            };

            let record = IntegrityRecord {
                source_hash: Self::try_hash(source_path).await,
                copy_hash: Self::try_hash(copy_path).await,
            };
            if !record.is_intact() {
                report.corrupt.push(name.clone());
            }
            report.records.insert(name.clone(), record);
        }

        report.extra = copy_files
            .keys()
            .filter(|name| !source_files.contains_key(*name))
            .cloned()
            .collect();

        for name in &report.missing {
            error!(file = %name, "Missing in copy");
        }
        for name in &report.corrupt {
            error!(file = %name, "Corrupt copy (hash mismatch)");
        }
        for name in &report.extra {
            warn!(file = %name, "Extra file in copy");
        }
        if report.is_clean() {
            info!("✅ Integrity check passed: {}", report.summary());
        }

        report
    }

    /// Copy then verify, deleting `src` only after a verified match.
    /// On mismatch `src` stays on disk.
    pub async fn move_verified(src: &Path, dst: &Path) -> Result<(), PackError> {
        Self::move_verified_with(src, dst, |from, to| std::fs::copy(from, to).map(|_| ())).await
    }

    pub(crate) async fn move_verified_with<F>(src: &Path, dst: &Path, copy: F) -> Result<(), PackError>
    where
        F: FnOnce(&Path, &Path) -> std::io::Result<()>,
    {
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        copy(src, dst)?;

        let hash = Self::verify_pair(src, dst).await?;
        tokio::fs::remove_file(src).await?;
        debug!(hash = %hash, "Moved {} -> {}", src.display(), dst.display());
        Ok(())
    }

    async fn verify_pair(src: &Path, dst: &Path) -> Result<String, PackError> {
        let source_hash = Self::hash_file(src).await?;
        let copy_hash = Self::try_hash(dst).await;

        match copy_hash {
            Some(copy_hash) if copy_hash == source_hash => Ok(source_hash),
            _ => {
                error!(
                    source = %src.display(),
                    copy = %dst.display(),
                    "❌ Hash mismatch after copy, keeping source"
                );
                Err(PackError::Integrity(format!(
                    "Hash mismatch between {} and {}",
                    src.display(),
                    dst.display()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_set(dir: &Path, files: &[(&str, &[u8])]) -> Vec<PathBuf> {
        std::fs::create_dir_all(dir).unwrap();
        files
            .iter()
            .map(|(name, bytes)| {
                let path = dir.join(name);
                std::fs::write(&path, bytes).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_chunk_size_tiers() {
        assert_eq!(IntegrityVerifier::chunk_size(Path::new("a.JPG"), 50 * GB_1), IMAGE_CHUNK);
        assert_eq!(IntegrityVerifier::chunk_size(Path::new("a.7z"), 10), SMALL_CHUNK);
        assert_eq!(IntegrityVerifier::chunk_size(Path::new("a.7z"), 200 * 1024 * 1024), MEDIUM_CHUNK);
        assert_eq!(IntegrityVerifier::chunk_size(Path::new("a.7z"), 2 * GB_1), LARGE_CHUNK);
    }

    #[tokio::test]
    async fn test_hash_file_known_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            IntegrityVerifier::hash_file(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_identical_sets_are_clean() {
        let temp = TempDir::new().unwrap();
        let files: &[(&str, &[u8])] = &[("a.jpg", b"aaaa"), ("b.jpg", b"bbbb")];
        let source = write_set(&temp.path().join("src"), files);
        let copy = write_set(&temp.path().join("copy"), files);

        let report = IntegrityVerifier::compare_file_sets(&source, &copy).await;
        assert!(report.is_clean());
        assert!(report.corrupt.is_empty());
        assert_eq!(report.records.len(), 2);
    }

    #[tokio::test]
    async fn test_flipped_byte_is_reported_corrupt() {
        let temp = TempDir::new().unwrap();
        let source = write_set(&temp.path().join("src"), &[("a.jpg", b"aaaa"), ("b.jpg", b"bbbb")]);
        let copy = write_set(&temp.path().join("copy"), &[("a.jpg", b"aaaa"), ("b.jpg", b"bbbc")]);

        let report = IntegrityVerifier::compare_file_sets(&source, &copy).await;
        assert!(!report.is_clean());
        assert_eq!(report.corrupt, vec!["b.jpg".to_string()]);
        assert!(report.missing.is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_extra_files() {
        let temp = TempDir::new().unwrap();
        let source = write_set(&temp.path().join("src"), &[("a.jpg", b"a"), ("b.jpg", b"b")]);
        let copy = write_set(&temp.path().join("copy"), &[("a.jpg", b"a"), ("z.txt", b"z")]);

        let report = IntegrityVerifier::compare_file_sets(&source, &copy).await;
        assert_eq!(report.missing, vec!["b.jpg".to_string()]);
        assert_eq!(report.extra, vec!["z.txt".to_string()]);
        assert!(!report.is_clean());

        let only_extra = IntegrityVerifier::compare_file_sets(&source[..1], &copy).await;
        assert!(only_extra.is_clean());
    }

    #[tokio::test]
    async fn test_move_verified_deletes_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("archive.7z");
        std::fs::write(&src, b"archive").unwrap();
        let dst = temp.path().join("out").join("archive.7z");

        IntegrityVerifier::move_verified(&src, &dst).await.unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"archive");
    }

    #[tokio::test]
    async fn test_move_with_bad_copy_keeps_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("archive.7z");
        std::fs::write(&src, b"archive").unwrap();
        let dst = temp.path().join("archive.final.7z");

        let result = IntegrityVerifier::move_verified_with(&src, &dst, |from, to| {
            let mut bytes = std::fs::read(from)?;
            bytes[0] ^= 0xFF;
            std::fs::write(to, bytes)
        })
        .await;

        assert!(matches!(result, Err(PackError::Integrity(_))));
        assert!(src.exists());
        assert_eq!(std::fs::read(&src).unwrap(), b"archive");
    }
}
