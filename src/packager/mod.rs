//! # Packager Module
//!
//! Orchestrazione del packaging suddivisa in moduli specializzati:
//! - `temp_resolver`: scelta dello staging root
//! - `folder_packager`: pipeline completa di una cartella
//! - `batch_packager`: esecuzione sequenziale su più cartelle

pub mod batch_packager;
pub mod folder_packager;
pub mod temp_resolver;

pub use batch_packager::{BatchPackager, BatchReport};
pub use folder_packager::{FolderPackager, FolderReport};
pub use temp_resolver::{paths_collide, TempResolver};
