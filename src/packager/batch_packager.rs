//! # Batch Packager
//!
//! Esegue il `FolderPackager` su più cartelle, una alla volta.
//! L'errore di una cartella viene registrato e il batch passa alla successiva.

use crate::config::Config;
use crate::json_output::JsonMessage;
use crate::packager::folder_packager::{FolderPackager, FolderReport};
use crate::progress::{PackagingStats, ProgressManager};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// Result of a whole batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub packaged: Vec<FolderReport>,
    pub failed: Vec<(PathBuf, String)>,
    pub stats: PackagingStats,
}

/// Sequential driver over base folders
pub struct BatchPackager<'a> {
    config: &'a Config,
    packager: FolderPackager<'a>,
}

impl<'a> BatchPackager<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_packager(config, FolderPackager::new(config))
    }

    pub fn with_packager(config: &'a Config, packager: FolderPackager<'a>) -> Self {
        Self { config, packager }
    }

    /// Package every folder in order
    pub async fn run(&self, folders: &[PathBuf]) -> BatchReport {
        let start_time = Instant::now();
        let json = self.config.json_output;

        if json {
            JsonMessage::start(folders.to_vec(), self.config).emit();
        } else {
            info!("🚀 Packaging {} folders into {}", folders.len(), self.config.output_folder.display());
        }

        let progress = ProgressManager::new(folders.len() as u64, json);
        let mut report = BatchReport::default();

        for folder in folders {
            progress.set_message(&folder.display().to_string());
            match self.packager.package(folder).await {
                Ok(folder_report) => {
                    report.stats.add_packaged(folder_report.archive_size);
                    if json {
                        JsonMessage::folder_complete(&folder_report).emit();
                    }
                    progress.update(&format!("✅ {}", folder_report.name));
                    report.packaged.push(folder_report);
                }
                Err(e) => {
                    error!(folder = %folder.display(), "❌ Packaging failed: {}", e);
                    report.stats.add_failed();
                    if json {
                        JsonMessage::folder_failed(folder.clone(), &e).emit();
                    }
                    progress.update(&format!("❌ {}", folder.display()));
                    report.failed.push((folder.clone(), e.to_string()));
                }
            }
        }

        let summary = report.stats.format_summary();
        progress.finish(&summary);
        if json {
            JsonMessage::complete(&report.stats, start_time.elapsed().as_secs_f64()).emit();
        } else {
            info!("📊 {}", summary);
        }

        report
    }
}
