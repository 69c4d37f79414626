//! # Photo Packager Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di packaging
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione, registri tipizzati e validazione
//! - `error`: Tipi di errore del packaging
//! - `file_manager`: Discovery della cartella e copie di staging
//! - `integrity`: Hash SHA-256, confronto di file set, copy/move verificati
//! - `selector`: Scelta delle immagini candidate
//! - `compositor`: Cover e collage
//! - `image_optimizer`: Catene di tool esterni sulle immagini
//! - `archive`: Archive tournament
//! - `packager`: Orchestratore per cartella e batch
//! - `progress`: Progress bar e statistiche
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use photo_packager::{BatchPackager, Config};
//!
//! let config = Config::from_file(Path::new("config.json")).await?;
//! let report = BatchPackager::new(&config).run(&folders).await;
//! ```

pub mod archive;
pub mod compositor;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_optimizer;
pub mod integrity;
pub mod json_output;
pub mod packager;
pub mod progress;
pub mod selector;
pub mod tool_resolver;
pub mod tools;
pub mod utils;

pub use archive::{ArchiveCandidate, ArchiveTournament, CommittedArchive};
pub use compositor::{CompositionTarget, ImageCompositor};
pub use config::{Config, FolderSettings};
pub use error::PackError;
pub use file_manager::{FileManager, MediaFolder};
pub use integrity::{IntegrityReport, IntegrityVerifier};
pub use packager::{BatchPackager, BatchReport, FolderPackager, FolderReport};
pub use selector::{CandidateImageSet, Selection};
