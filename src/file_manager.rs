//! # File Management Module
//!
//! Questo modulo gestisce la discovery delle cartelle di immagini e le copie di staging.
//!
//! ## Responsabilità:
//! - Risoluzione della `MediaFolder` (batch mode: esattamente una sottocartella)
//! - Elenco ordinato dei JPEG, di tutti i file regolari e delle sottocartelle annidate
//! - Determinazione formato file tramite estensione (case-insensitive)
//! - Copia dei file nella cartella di staging
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati riconosciuti:
//! - **Scansione sorgente**: JPG, JPEG
//! - **Slot numerati 001-004**: JPG, JPEG, PNG
//!
//! ## Esempio:
//! ```rust,ignore
//! let folder = MediaFolder::resolve(&base, true)?;
//! for image in &folder.images {
//!     // process image
//! }
//! ```

use crate::error::PackError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A folder of photographs to package
#[derive(Debug, Clone)]
pub struct MediaFolder {
    /// Folder name, also the archive base name
    pub name: String,
    /// Directory holding the images
    pub path: PathBuf,
    /// JPEG images sorted by file name
    pub images: Vec<PathBuf>,
    /// All regular files sorted by file name
    pub files: Vec<PathBuf>,
    /// Nested subfolders (ignored)
    pub subfolders: Vec<PathBuf>,
}

impl MediaFolder {
    /// Resolve the image folder of a base folder.
    ///
    /// In batch mode `base` must contain exactly one immediate subfolder,
    /// which holds the images. Otherwise `base` is the image folder itself.
    pub fn resolve(base: &Path, batch_mode: bool) -> Result<Self, PackError> {
        if !base.is_dir() {
            return Err(PackError::FolderStructure(format!(
                "Not a directory: {}",
                base.display()
            )));
        }

        if !batch_mode {
            return Self::scan(base);
        }

        let subfolders = list_entries(base)?.1;
        match subfolders.as_slice() {
            [only] => Self::scan(only),
            [] => Err(PackError::FolderStructure(format!(
                "No image subfolder in {}",
                base.display()
            ))),
            many => Err(PackError::FolderStructure(format!(
                "Expected exactly one image subfolder in {}, found {}",
                base.display(),
                many.len()
            ))),
        }
    }

    /// Scan an image folder (non-recursive)
    pub fn scan(dir: &Path) -> Result<Self, PackError> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| PackError::FolderStructure(format!("Invalid folder name: {}", dir.display())))?;

        let (files, subfolders) = list_entries(dir)?;
        let images: Vec<PathBuf> = files.iter().filter(|f| FileManager::is_jpeg(f)).cloned().collect();

        if !subfolders.is_empty() {
            warn!(
                folder = %name,
                "Ignoring {} nested subfolder(s): {:?}",
                subfolders.len(),
                subfolders.iter().filter_map(|s| s.file_name()).collect::<Vec<_>>()
            );
        }
        debug!(folder = %name, "Found {} files, {} JPEG images", files.len(), images.len());

        Ok(Self {
            name,
            path: dir.to_path_buf(),
            images,
            files,
            subfolders,
        })
    }
}

/// Immediate regular files and subfolders of `dir`, each sorted by name
fn list_entries(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), PackError> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PackError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    Ok((files, dirs))
}

/// Manages file classification and staging copies
pub struct FileManager;

impl FileManager {
    /// Lowercase extension of a path
    pub fn extension(path: &Path) -> Option<String> {
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Check if a file is a JPEG
    pub fn is_jpeg(path: &Path) -> bool {
        matches!(Self::extension(path).as_deref(), Some("jpg") | Some("jpeg"))
    }

    /// Check if a file is an image (JPEG or PNG)
    pub fn is_image(path: &Path) -> bool {
        matches!(Self::extension(path).as_deref(), Some("jpg") | Some("jpeg") | Some("png"))
    }

    /// Copy `files` into `dest_dir`, keeping file names. Returns the copies in input order.
    pub async fn stage_files(files: &[PathBuf], dest_dir: &Path) -> Result<Vec<PathBuf>, PackError> {
        fs::create_dir_all(dest_dir).await?;

        let mut staged = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file
                .file_name()
                .ok_or_else(|| PackError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid file name: {}", file.display()),
                )))?;
            let target = dest_dir.join(file_name);
            fs::copy(file, &target).await?;
            staged.push(target);
        }

        debug!("Staged {} files into {}", staged.len(), dest_dir.display());
        Ok(staged)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
