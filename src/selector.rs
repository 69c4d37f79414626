//! # Candidate Selection Module
//!
//! Questo modulo decide quali immagini rappresentano una cartella.
//!
//! ## Strategie:
//! 1. **Esplicita**: slot `001`..`004`, estensioni provate in ordine `.jpg`, `.jpeg`, `.png`.
//!    Il primo file esistente vince lo slot; uno slot mancante viene omesso.
//! 2. **Auto-select**: solo se la strategia esplicita non trova nulla e la policy
//!    lo consente. Indici `0`, `round(max/3)`, `round(2·max/3)`, `round(0.9·max)`,
//!    ognuno forzato a essere > del precedente e limitato a `max`
//!    (10 immagini → `0, 3, 6, 8`).
//!    Le frazioni sono `1/3` e `2/3`, non `0.3` e `0.6`: con `0.6` su 10 immagini il terzo
//!    indice sarebbe `round(5.4) = 5` e la distribuzione `0, 3, 6, 8` non si otterrebbe.
//!
//! ## Policy sul risultato:
//! - 4 immagini → cover + collage
//! - 1-3 immagini → errore se `abort_incomplete`, altrimenti solo cover dalla prima
//! - 0 immagini → `missing_policy` (abort, folder-only, auto-select)
//!
//! Tutto è funzione pura di elenchi di file e flag di configurazione.

use crate::config::MissingPolicy;
use crate::error::PackError;
use crate::file_manager::{FileManager, MediaFolder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SLOTS: [&str; 4] = ["001", "002", "003", "004"];
const SLOT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const SPREAD: [f64; 3] = [1.0 / 3.0, 2.0 / 3.0, 0.9];

/// Up to four images in display order (front, back, side-1, side-2)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateImageSet {
    pub images: Vec<PathBuf>,
}

impl CandidateImageSet {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn first(&self) -> Option<&Path> {
        self.images.first().map(PathBuf::as_path)
    }

    /// The four quadrant images, when complete
    pub fn quad(&self) -> Option<[&Path; 4]> {
        match self.images.as_slice() {
            [a, b, c, d] => Some([a.as_path(), b.as_path(), c.as_path(), d.as_path()]),
            _ => None,
        }
    }
}

/// What the folder's composites can be built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Four images: cover and collage allowed
    Complete(CandidateImageSet),
    /// Fewer than four: cover from the first image only
    Partial(CandidateImageSet),
    /// No composites, archive the folder only
    FolderOnly,
}

impl Selection {
    pub fn candidates(&self) -> Option<&CandidateImageSet> {
        match self {
            Selection::Complete(set) | Selection::Partial(set) => Some(set),
            Selection::FolderOnly => None,
        }
    }
}

/// Numbered images 001-004, first matching extension per slot
pub fn explicit_candidates(files: &[PathBuf]) -> Vec<PathBuf> {
    SLOTS
        .iter()
        .filter_map(|slot| {
            SLOT_EXTENSIONS.iter().find_map(|ext| {
                files
                    .iter()
                    .find(|file| is_slot_file(file, slot, ext))
                    .cloned()
            })
        })
        .collect()
}

fn is_slot_file(file: &Path, slot: &str, ext: &str) -> bool {
    let stem_matches = file.file_stem().is_some_and(|stem| stem == slot);
    stem_matches && FileManager::extension(file).as_deref() == Some(ext)
}

/// Four strictly increasing indices spread over `len` images, `None` below four
pub fn auto_select_indices(len: usize) -> Option<[usize; 4]> {
    if len < 4 {
        return None;
    }

    let max_index = len - 1;
    let mut indices = [0usize; 4];
    for (slot, fraction) in SPREAD.iter().enumerate() {
        let computed = (fraction * max_index as f64).round() as usize;
        let previous = indices[slot];
        indices[slot + 1] = computed.max(previous + 1).min(max_index);
    }

    Some(indices)
}

/// Choose the candidate images of a folder under the configured policies
pub fn select(
    folder: &MediaFolder,
    missing_policy: MissingPolicy,
    abort_incomplete: bool,
) -> Result<Selection, PackError> {
    let explicit = explicit_candidates(&folder.files);

    let found = if explicit.is_empty() {
        match missing_policy {
            MissingPolicy::Abort => {
                return Err(PackError::Selection(format!(
                    "No numbered images (001-004) in {}",
                    folder.name
                )));
            }
            MissingPolicy::FolderOnly => {
                info!(folder = %folder.name, "No numbered images, packaging folder only");
                return Ok(Selection::FolderOnly);
            }
            MissingPolicy::AutoSelect => match auto_select_indices(folder.images.len()) {
                Some(indices) => {
                    info!(folder = %folder.name, ?indices, "Auto-selected candidate images");
                    indices.iter().map(|&i| folder.images[i].clone()).collect()
                }
                None if folder.images.is_empty() => {
                    warn!(folder = %folder.name, "No images to select from, packaging folder only");
                    return Ok(Selection::FolderOnly);
                }
                None => {
                    warn!(
                        folder = %folder.name,
                        "Only {} images, too few for auto-select",
                        folder.images.len()
                    );
                    folder.images.clone()
                }
            },
        }
    } else {
        explicit
    };

    if found.len() == 4 {
        return Ok(Selection::Complete(CandidateImageSet { images: found }));
    }

    if abort_incomplete {
        return Err(PackError::Selection(format!(
            "Only {} of 4 candidate images in {}",
            found.len(),
            folder.name
        )));
    }

    warn!(
        folder = %folder.name,
        "Only {} of 4 candidate images, collage disabled, cover from first",
        found.len()
    );
    Ok(Selection::Partial(CandidateImageSet {
        images: found.into_iter().take(1).collect(),
    }))
}
