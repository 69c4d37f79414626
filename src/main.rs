//! # Photo Packager - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento e validazione della configurazione
//! - Avvio del batch sulle cartelle indicate
//!
//! ## Esempio di utilizzo:
//! ```bash
//! photo-pack /photos/summer /photos/winter --config config.json --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use photo_packager::{BatchPackager, Config};

#[derive(Parser)]
#[command(name = "photo-pack")]
#[command(about = "Package photo folders into the smallest verified archive, with cover and collage")]
struct Args {
    /// Base folders to package, processed in order
    #[arg(required = true)]
    folders: Vec<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Emit JSON event lines on stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::from_file(&args.config).await?;
    if args.json {
        config.json_output = true;
    }

    let report = BatchPackager::new(&config).run(&args.folders).await;

    if report.packaged.is_empty() && !report.failed.is_empty() {
        return Err(anyhow::anyhow!("No folder could be packaged"));
    }

    Ok(())
}
