//! # Archive Tournament Module
//!
//! Questo modulo produce un archivio per ogni profilo di compressione e tiene solo il più piccolo.
//!
//! ## Flusso:
//! 1. **Candidati**: per ogni profilo (in ordine di dichiarazione) costruisce gli argomenti
//!    sostituendo `{output}` e `{input}`, poi avvia l'archiver nella cartella di staging
//! 2. **Misura**: registra `(profilo, path, dimensione)` per ogni archivio prodotto
//! 3. **Vincitore**: dimensione strettamente minore; a parità vince il primo profilo dichiarato
//! 4. **Commit**: copia verso l'output, verifica hash, cancella lo staged solo dopo il match
//! 5. **Cleanup**: cancella gli archivi perdenti dopo il commit
//!
//! ## Error handling:
//! - Archiver non trovato: profilo saltato con warning
//! - Exit status non zero o nessun file prodotto: profilo escluso
//! - Nessun candidato: `PackError::NoViableArchive`
//! - Hash diverso al commit: `PackError::Integrity`, lo staged resta su disco

use crate::config::{CompressionProfile, Config};
use crate::error::PackError;
use crate::file_manager::FileManager;
use crate::integrity::IntegrityVerifier;
use crate::tool_resolver::ToolPathResolver;
use crate::tools::run_tool;
use crate::utils::expand_template;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// One archive produced during the tournament
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCandidate {
    pub profile: String,
    pub path: PathBuf,
    pub size: u64,
    /// Extension of the committed file
    pub extension: String,
}

/// The archive that won and was committed
#[derive(Debug, Clone)]
pub struct CommittedArchive {
    pub profile: String,
    pub path: PathBuf,
    pub size: u64,
    /// Every candidate that was produced, winner included
    pub candidates: Vec<ArchiveCandidate>,
}

/// Index of the smallest candidate; the first one wins ties
pub fn pick_winner(candidates: &[ArchiveCandidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        match best {
            Some(current) if candidate.size >= candidates[current].size => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Builds and commits the smallest archive of a folder
pub struct ArchiveTournament<'a> {
    config: &'a Config,
    resolver: ToolPathResolver,
}

impl<'a> ArchiveTournament<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_resolver(config, ToolPathResolver::new())
    }

    pub fn with_resolver(config: &'a Config, resolver: ToolPathResolver) -> Self {
        Self { config, resolver }
    }

    /// Run every profile. `inputs` are relative to `work_dir`; candidates land in `candidate_dir`.
    pub async fn build_candidates(
        &self,
        base_name: &str,
        work_dir: &Path,
        inputs: &[String],
        candidate_dir: &Path,
    ) -> Result<Vec<ArchiveCandidate>, PackError> {
        tokio::fs::create_dir_all(candidate_dir).await?;
        let mut candidates = Vec::new();

        for profile in &self.config.compression_profiles {
            match self.build_one(profile, base_name, work_dir, inputs, candidate_dir).await {
                Ok(Some(candidate)) => {
                    info!(
                        profile = %candidate.profile,
                        size = candidate.size,
                        "📦 Candidate archive: {}",
                        FileManager::format_size(candidate.size)
                    );
                    candidates.push(candidate);
                }
                Ok(None) => {}
                Err(e) => warn!(profile = %profile.name, "Compression profile failed: {}", e),
            }
        }

        Ok(candidates)
    }

    async fn build_one(
        &self,
        profile: &CompressionProfile,
        base_name: &str,
        work_dir: &Path,
        inputs: &[String],
        candidate_dir: &Path,
    ) -> Result<Option<ArchiveCandidate>, PackError> {
        let Some(program) = self.resolver.resolve_tool(&profile.tool) else {
            warn!(profile = %profile.name, tool = %profile.tool, "Archiver not found, skipping profile");
            return Ok(None);
        };

        let output = candidate_dir.join(format!("{}.{}.{}", base_name, profile.name, profile.extension));
        if output.exists() {
            tokio::fs::remove_file(&output).await?;
        }

        let output_str = output.to_string_lossy().into_owned();
        let args = expand_template(&profile.args, Some(&output_str), inputs);
        let result = run_tool(&profile.name, &program, &args, Some(work_dir)).await?;

        if !result.success() {
            warn!(profile = %profile.name, "Archiver exited with {}", result.status);
            let _ = tokio::fs::remove_file(&output).await;
            return Ok(None);
        }

        match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.is_file() => Ok(Some(ArchiveCandidate {
                profile: profile.name.clone(),
                path: output,
                size: meta.len(),
                extension: self.config.archive_extension(profile).trim_start_matches('.').to_string(),
            })),
            _ => {
                warn!(profile = %profile.name, "Archiver produced no file at {}", output.display());
                Ok(None)
            }
        }
    }

    /// Full tournament: build, pick, commit to `output_dir/<base_name>.<ext>`, clean up losers
    pub async fn run(
        &self,
        base_name: &str,
        work_dir: &Path,
        inputs: &[String],
        candidate_dir: &Path,
        output_dir: &Path,
    ) -> Result<CommittedArchive, PackError> {
        let candidates = self.build_candidates(base_name, work_dir, inputs, candidate_dir).await?;
        commit_winner(candidates, base_name, output_dir).await
    }
}

/// Commit the smallest candidate, then delete the others
pub async fn commit_winner(
    candidates: Vec<ArchiveCandidate>,
    base_name: &str,
    output_dir: &Path,
) -> Result<CommittedArchive, PackError> {
    commit_winner_with(candidates, base_name, output_dir, |from, to| {
        std::fs::copy(from, to).map(|_| ())
    })
    .await
}

pub(crate) async fn commit_winner_with<F>(
    candidates: Vec<ArchiveCandidate>,
    base_name: &str,
    output_dir: &Path,
    copy: F,
) -> Result<CommittedArchive, PackError>
where
    F: FnOnce(&Path, &Path) -> std::io::Result<()>,
{
    let Some(winner_index) = pick_winner(&candidates) else {
        error!(folder = %base_name, "❌ No compression profile produced an archive");
        return Err(PackError::NoViableArchive(format!(
            "No compression profile produced an archive for {}",
            base_name
        )));
    };
    let winner = candidates[winner_index].clone();
    info!(
        profile = %winner.profile,
        size = winner.size,
        "🏆 Smallest archive: {} ({} candidates)",
        FileManager::format_size(winner.size),
        candidates.len()
    );

    let final_path = output_dir.join(format!("{}.{}", base_name, winner.extension));
    IntegrityVerifier::move_verified_with(&winner.path, &final_path, copy).await?;
    info!("✅ Committed {}", final_path.display());

    for (index, loser) in candidates.iter().enumerate() {
        if index == winner_index {
            continue;
        }
        match tokio::fs::remove_file(&loser.path).await {
            Ok(()) => debug!(profile = %loser.profile, "Removed losing archive"),
            Err(e) => warn!(profile = %loser.profile, "Could not remove {}: {}", loser.path.display(), e),
        }
    }

    Ok(CommittedArchive {
        profile: winner.profile,
        path: final_path,
        size: winner.size,
        candidates,
    })
}
