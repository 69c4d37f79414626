//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom del packager.
//!
//! ## Responsabilità:
//! - Definisce `PackError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decode/encode delle immagini (formati corrotti, etc.)
//! - `FolderStructure`: Numero sbagliato di sottocartelle in batch mode
//! - `Selection`: Set di immagini candidate insufficiente secondo la policy
//! - `Tool`: Tool esterno mancante o fallito
//! - `Integrity`: Copie mancanti/corrotte o hash diverso al commit
//! - `NoViableArchive`: Nessun profilo di compressione ha prodotto un archivio
//! - `TempDir`: Nessuna cartella temporanea sicura disponibile
//! - `Config`: Configurazione incoerente
//!
//! ## Isolamento:
//! Ogni errore interrompe solo la cartella corrente, mai l'intero batch.
//!
//! ## Esempio:
//! ```rust,ignore
//! if subfolders.len() != 1 {
//!     return Err(PackError::FolderStructure(format!("{} subfolders", subfolders.len())));
//! }
//! ```

/// Custom error types for folder packaging
#[derive(thiserror::Error, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Folder structure error: {0}")]
    FolderStructure(String),

    #[error("Candidate selection error: {0}")]
    Selection(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("No viable archive: {0}")]
    NoViableArchive(String),

    #[error("Temp directory error: {0}")]
    TempDir(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PackError {
    /// True for errors that must keep the staging area on disk
    pub fn preserves_staging(&self) -> bool {
        matches!(self, PackError::Integrity(_))
    }
}
