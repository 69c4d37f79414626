//! # JSON Output Module
//!
//! Questo modulo emette eventi JSON su stdout, una riga per evento, per chi
//! pilota il packager da un altro processo.
//!
//! ## Tipi di messaggi:
//! - `start`: inizio del batch
//! - `folder_complete`: cartella impacchettata (archivio, dimensione, profilo vincitore)
//! - `folder_failed`: cartella fallita con il relativo errore
//! - `complete`: fine del batch con le statistiche finali

use crate::packager::FolderReport;
use crate::progress::PackagingStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        folders: Vec<PathBuf>,
        output_dir: PathBuf,
        profiles: Vec<String>,
    },

    #[serde(rename = "folder_complete")]
    FolderComplete {
        name: String,
        archive: PathBuf,
        size: u64,
        profile: String,
        cover: Option<PathBuf>,
        collage: Option<PathBuf>,
    },

    #[serde(rename = "folder_failed")]
    FolderFailed { folder: PathBuf, error: String },

    #[serde(rename = "complete")]
    Complete {
        packaged: usize,
        failed: usize,
        total_bytes: u64,
        duration_seconds: f64,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(folders: Vec<PathBuf>, config: &crate::Config) -> Self {
        Self::Start {
            folders,
            output_dir: config.output_folder.clone(),
            profiles: config.compression_profiles.iter().map(|p| p.name.clone()).collect(),
        }
    }

    pub fn folder_complete(report: &FolderReport) -> Self {
        Self::FolderComplete {
            name: report.name.clone(),
            archive: report.archive.clone(),
            size: report.archive_size,
            profile: report.profile.clone(),
            cover: report.cover.clone(),
            collage: report.collage.clone(),
        }
    }

    pub fn folder_failed(folder: PathBuf, error: &crate::PackError) -> Self {
        Self::FolderFailed {
            folder,
            error: error.to_string(),
        }
    }

    pub fn complete(stats: &PackagingStats, duration_seconds: f64) -> Self {
        Self::Complete {
            packaged: stats.folders_packaged,
            failed: stats.folders_failed,
            total_bytes: stats.total_archive_bytes,
            duration_seconds,
        }
    }
}
