//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar sulle cartelle e le statistiche del run.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif`, nascosta in modalità JSON
//! - Conteggio cartelle impacchettate e fallite
//! - Totale byte degli archivi prodotti
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [==================>---------------------] 3/7 (42%) ✅ summer-2024
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new(folders.len() as u64, false);
//! let mut stats = PackagingStats::new();
//!
//! stats.add_packaged(report.archive_size);
//! progress.update("✅ summer-2024");
//!
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Progress over the folders of a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Bar over `total_folders`; hidden when `hidden` is set
    pub fn new(total_folders: u64, hidden: bool) -> Self {
        if hidden {
            return Self { bar: ProgressBar::hidden() };
        }

        let bar = ProgressBar::new(total_folders);
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Advance by one folder
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Counters of a batch run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackagingStats {
    pub folders_packaged: usize,
    pub folders_failed: usize,
    pub total_archive_bytes: u64,
}

impl PackagingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_packaged(&mut self, archive_size: u64) {
        self.folders_packaged += 1;
        self.total_archive_bytes += archive_size;
    }

    pub fn add_failed(&mut self) {
        self.folders_failed += 1;
    }

    pub fn folders_processed(&self) -> usize {
        self.folders_packaged + self.folders_failed
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} folders | Packaged: {} | Failed: {} | Archives: {}",
            self.folders_processed(),
            self.folders_packaged,
            self.folders_failed,
            FileManager::format_size(self.total_archive_bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = PackagingStats::new();
        stats.add_packaged(1024);
        stats.add_packaged(2048);
        stats.add_failed();

        assert_eq!(stats.folders_processed(), 3);
        assert_eq!(stats.total_archive_bytes, 3072);
        let summary = stats.format_summary();
        assert!(summary.contains("Packaged: 2"));
        assert!(summary.contains("Failed: 1"));
    }

    #[test]
    fn test_hidden_bar_accepts_updates() {
        let progress = ProgressManager::new(2, true);
        progress.update("one");
        progress.set_message("two");
        progress.finish("done");
    }
}
