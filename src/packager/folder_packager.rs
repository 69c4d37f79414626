//! # Folder Packager
//!
//! Orchestra l'intera pipeline per una singola cartella.
//!
//! ## Flusso:
//! 1. Risolve la `MediaFolder` (batch o singola)
//! 2. Seleziona le immagini candidate e restringe le `FolderSettings` della cartella
//! 3. Crea una cartella di run univoca sotto lo staging root
//! 4. Copia i file in `run/stage/<nome>/` e verifica gli hash
//! 5. Compone cover e/o collage dalle copie in staging
//! 6. Ottimizza immagini della cartella e composite con i rispettivi profili
//! 7. Archive tournament, commit verificato del vincitore nell'output
//! 8. Sposta (con verifica) le composite nell'output
//! 9. Cleanup della cartella di run (conservata dopo un errore di integrità)
//!
//! ## Layout della cartella di run:
//! ```text
//! run/stage/<nome>/...        copie verificate (cwd degli archiver)
//! run/stage/<nome>_cover.jpg  composite
//! run/candidates/             un archivio per profilo
//! ```
//! Gli archivi candidati stanno fuori da `stage`, qualunque sia il nome della cartella.

use crate::archive::ArchiveTournament;
use crate::compositor::{output_names, resolve_target, ImageCompositor};
use crate::config::{Config, FolderSettings};
use crate::error::PackError;
use crate::file_manager::{FileManager, MediaFolder};
use crate::image_optimizer::ImageOptimizer;
use crate::integrity::IntegrityVerifier;
use crate::packager::temp_resolver::TempResolver;
use crate::selector::{select, Selection};
use crate::tool_resolver::ToolPathResolver;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const STAGE_DIR: &str = "stage";
const CANDIDATE_DIR: &str = "candidates";

/// Outcome of one packaged folder
#[derive(Debug, Clone)]
pub struct FolderReport {
    pub name: String,
    pub archive: PathBuf,
    pub archive_size: u64,
    pub profile: String,
    /// Number of archives that took part in the tournament
    pub candidates: usize,
    pub cover: Option<PathBuf>,
    pub collage: Option<PathBuf>,
}

/// Composites written into the run directory
#[derive(Debug, Default)]
struct Composites {
    cover: Option<PathBuf>,
    collage: Option<PathBuf>,
}

impl Composites {
    fn paths(&self) -> Vec<PathBuf> {
        self.cover.iter().chain(self.collage.iter()).cloned().collect()
    }
}

/// Packages one folder at a time under a shared, read-only configuration
pub struct FolderPackager<'a> {
    config: &'a Config,
    tools: ToolPathResolver,
    temp: TempResolver,
}

impl<'a> FolderPackager<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_resolvers(config, ToolPathResolver::new(), TempResolver::new())
    }

    pub fn with_resolvers(config: &'a Config, tools: ToolPathResolver, temp: TempResolver) -> Self {
        Self { config, tools, temp }
    }

    /// Run the whole pipeline for `base`
    pub async fn package(&self, base: &Path) -> Result<FolderReport, PackError> {
        let folder = MediaFolder::resolve(base, self.config.batch_mode)?;
        info!(folder = %folder.name, "📂 Packaging {} ({} files, {} images)", folder.path.display(), folder.files.len(), folder.images.len());
        if !folder.subfolders.is_empty() {
            warn!(folder = %folder.name, "Ignoring {} nested subfolders", folder.subfolders.len());
        }

        let selection = select(&folder, self.config.missing_policy, self.config.abort_incomplete)?;
        let settings = narrow_settings(self.config.folder_settings(), &selection);

        let output_dir = &self.config.output_folder;
        tokio::fs::create_dir_all(output_dir).await?;

        let root = self.temp.resolve(&folder.path, output_dir, self.config.temp_folder.as_deref())?;
        let run_dir = tempfile::Builder::new()
            .prefix(&format!("{}-", folder.name))
            .tempdir_in(&root)
            .map_err(|e| PackError::TempDir(format!("Cannot create run directory in {}: {}", root.display(), e)))?;

        let result = match run_dir.path().canonicalize() {
            Ok(run_path) => self.run_in(&folder, &selection, settings, &run_path, output_dir).await,
            Err(e) => Err(PackError::Io(e)),
        };

        let keep = !self.config.empty_temp || result.as_ref().err().is_some_and(PackError::preserves_staging);
        if keep {
            let kept = run_dir.keep();
            match &result {
                Err(e) if e.preserves_staging() => {
                    error!(folder = %folder.name, "Staging kept at {} after: {}", kept.display(), e)
                }
                _ => info!(folder = %folder.name, "Staging kept at {}", kept.display()),
            }
        } else if let Err(e) = run_dir.close() {
            warn!(folder = %folder.name, "Could not remove staging directory: {}", e);
        }

        result
    }

    async fn run_in(
        &self,
        folder: &MediaFolder,
        selection: &Selection,
        settings: FolderSettings,
        run_dir: &Path,
        output_dir: &Path,
    ) -> Result<FolderReport, PackError> {
        let stage_dir = run_dir.join(STAGE_DIR);
        let staged_dir = stage_dir.join(&folder.name);
        let staged = FileManager::stage_files(&folder.files, &staged_dir).await?;

        let report = IntegrityVerifier::compare_file_sets(&folder.files, &staged).await;
        if !report.extra.is_empty() {
            warn!(folder = %folder.name, "Extra files in staging: {:?}", report.extra);
        }
        if !report.is_clean() {
            return Err(PackError::Integrity(format!(
                "Staged copy of {} failed verification: {}",
                folder.name,
                report.summary()
            )));
        }
        info!(folder = %folder.name, "✅ Staged {} files", staged.len());

        let composites = self.compose(folder, selection, settings, &staged_dir, &stage_dir);

        let optimizer = ImageOptimizer::with_resolver(self.config, self.tools.clone());
        if let Some(profile) = &self.config.folder_profile {
            let staged_images = restage(&folder.images, &staged_dir);
            optimizer.optimize_all(&staged_images, profile).await;
        }
        if let Some(profile) = &self.config.composite_profile {
            optimizer.optimize_all(&composites.paths(), profile).await;
        }

        let mut inputs: Vec<String> = composites
            .paths()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        inputs.push(folder.name.clone());

        let tournament = ArchiveTournament::with_resolver(self.config, self.tools.clone());
        let committed = tournament
            .run(&folder.name, &stage_dir, &inputs, &run_dir.join(CANDIDATE_DIR), output_dir)
            .await?;

        Ok(FolderReport {
            name: folder.name.clone(),
            archive: committed.path,
            archive_size: committed.size,
            profile: committed.profile,
            candidates: committed.candidates.len(),
            cover: deliver(composites.cover.as_deref(), output_dir).await,
            collage: deliver(composites.collage.as_deref(), output_dir).await,
        })
    }

    fn compose(
        &self,
        folder: &MediaFolder,
        selection: &Selection,
        settings: FolderSettings,
        staged_dir: &Path,
        out_dir: &Path,
    ) -> Composites {
        let mut composites = Composites::default();
        let Some(candidates) = selection.candidates() else {
            return composites;
        };
        if !settings.composes_anything() {
            return composites;
        }

        let first_candidate = candidates.first().map(|p| staged_path(p, staged_dir));
        let first_image = folder.images.first().map(|p| staged_path(p, staged_dir));

        let target = match resolve_target(
            self.config,
            settings.collage,
            first_candidate.as_deref(),
            first_image.as_deref(),
        ) {
            Ok(target) => target,
            Err(e) => {
                error!(folder = %folder.name, "❌ No composition target: {}", e);
                return composites;
            }
        };
        let compositor = ImageCompositor::new(target);
        let (cover_name, collage_name) = output_names(&folder.name, settings.cover, settings.collage);

        if let (Some(name), Some(source)) = (cover_name, first_candidate.as_deref()) {
            match compositor.compose_cover(source, &out_dir.join(name)) {
                Ok(path) => composites.cover = Some(path),
                Err(e) => error!(folder = %folder.name, "❌ Cover failed: {}", e),
            }
        }

        if let Some(name) = collage_name {
            match candidates.quad().map(|quad| quad.map(|p| staged_path(p, staged_dir))) {
                Some(sources) => {
                    match compositor.compose_collage(sources.each_ref().map(PathBuf::as_path), &out_dir.join(name)) {
                        Ok(path) => composites.collage = Some(path),
                        Err(e) => error!(folder = %folder.name, "❌ Collage failed: {}", e),
                    }
                }
                None => warn!(folder = %folder.name, "Collage needs four candidates, skipping"),
            }
        }

        composites
    }
}

/// Narrow the folder's switches to what the selection supports
pub fn narrow_settings(settings: FolderSettings, selection: &Selection) -> FolderSettings {
    match selection {
        Selection::Complete(_) => settings,
        Selection::Partial(_) => settings.without_collage(),
        Selection::FolderOnly => settings.without_composites(),
    }
}

/// Same file name, inside `staged_dir`
fn staged_path(file: &Path, staged_dir: &Path) -> PathBuf {
    match file.file_name() {
        Some(name) => staged_dir.join(name),
        None => file.to_path_buf(),
    }
}

fn restage(files: &[PathBuf], staged_dir: &Path) -> Vec<PathBuf> {
    files.iter().map(|file| staged_path(file, staged_dir)).collect()
}

/// Move a composite next to the archive; failures only warn
async fn deliver(composite: Option<&Path>, output_dir: &Path) -> Option<PathBuf> {
    let composite = composite?;
    let target = output_dir.join(composite.file_name()?);
    match IntegrityVerifier::move_verified(composite, &target).await {
        Ok(()) => {
            info!("🖼️ Delivered {}", target.display());
            Some(target)
        }
        Err(e) => {
            warn!("Could not deliver {}: {}", composite.display(), e);
            None
        }
    }
}
