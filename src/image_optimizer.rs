//! # Image Optimization Module
//!
//! Questo modulo passa le immagini attraverso una catena ordinata di tool esterni,
//! scelta tramite un profilo di ottimizzazione con nome.
//!
//! ## Pipeline per immagine
//!
//! 1. **Profilo**: `folder_profile` per le immagini della cartella, `composite_profile` per cover/collage
//! 2. **Catena**: ogni tool del profilo, nell'ordine dichiarato
//! 3. **Argomenti**: template con `{input}` (e `{output}` per tool non in-place)
//! 4. **Output separato**: scritto accanto all'originale e spostato sopra di esso solo in caso di successo
//!
//! ## Error Handling e Resilienza
//!
//! - **Tool senza path o parametri**: saltato in silenzio
//! - **Tool non trovato**: warning, si passa al tool successivo
//! - **Exit status non zero**: warning, lo step viene saltato per quell'immagine
//! - **Nessun abort**: la pipeline continua sempre con il tool/immagine successivo
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let optimizer = ImageOptimizer::new(&config);
//! let summary = optimizer.optimize_all(&images, "folder").await;
//! ```

use crate::config::{Config, ToolSpec};
use crate::tool_resolver::ToolPathResolver;
use crate::tools::run_tool;
use crate::utils::{expand_template, needs_output_path};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counters of one optimization pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptimizationSummary {
    /// Successful tool invocations
    pub succeeded: usize,
    /// Invocations that failed or could not start
    pub failed: usize,
    /// Tool entries skipped (not configured or not found)
    pub skipped: usize,
}

/// Runs optimization profiles over images
pub struct ImageOptimizer<'a> {
    config: &'a Config,
    resolver: ToolPathResolver,
}

impl<'a> ImageOptimizer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self::with_resolver(config, ToolPathResolver::new())
    }

    pub fn with_resolver(config: &'a Config, resolver: ToolPathResolver) -> Self {
        Self { config, resolver }
    }

    /// Apply the named profile to every image, in order
    pub async fn optimize_all(&self, images: &[PathBuf], profile: &str) -> OptimizationSummary {
        let mut summary = OptimizationSummary::default();

        let Some(tools) = self.config.profile_tools(profile) else {
            warn!(profile = %profile, "Unknown optimization profile, nothing to do");
            return summary;
        };
        if images.is_empty() || tools.is_empty() {
            return summary;
        }

        info!(profile = %profile, "⚙️ Optimizing {} images with {} tools", images.len(), tools.len());

        for image in images {
            for (key, tool) in &tools {
                self.run_step(key, tool, image, &mut summary).await;
            }
        }

        info!(
            profile = %profile,
            "Optimization finished: {} ok, {} failed, {} skipped",
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        summary
    }

    async fn run_step(&self, key: &str, tool: &ToolSpec, image: &Path, summary: &mut OptimizationSummary) {
        if !tool.is_configured() {
            summary.skipped += 1;
            return;
        }

        let Some(program) = self.resolver.resolve_tool(&tool.path) else {
            warn!(tool = %key, path = %tool.path, "Tool not found, skipping");
            summary.skipped += 1;
            return;
        };

        let input = image.to_string_lossy().into_owned();
        let output = needs_output_path(&tool.params).then(|| sibling_output(image, key));
        let output_str = output.as_ref().map(|p| p.to_string_lossy().into_owned());
        let args = expand_template(&tool.params, output_str.as_deref(), std::slice::from_ref(&input));

        let succeeded = match run_tool(key, &program, &args, None).await {
            Ok(result) if result.success() => true,
            Ok(_) => {
                warn!(tool = %key, image = %image.display(), "Optimization step failed, skipping");
                false
            }
            Err(e) => {
                warn!(tool = %key, image = %image.display(), "Optimization step error: {}", e);
                false
            }
        };

        let succeeded = match (succeeded, output) {
            (true, Some(output)) => replace_with(&output, image, key).await,
            (false, Some(output)) => {
                let _ = tokio::fs::remove_file(&output).await;
                false
            }
            (ok, None) => ok,
        };

        if succeeded {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
}

/// `<stem>.<tool>.tmp.<ext>` next to the image
fn sibling_output(image: &Path, key: &str) -> PathBuf {
    let stem = image.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = image
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jpg".to_string());
    image.with_file_name(format!("{}.{}.tmp.{}", stem, key, ext))
}

async fn replace_with(output: &Path, image: &Path, key: &str) -> bool {
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => {}
        _ => {
            warn!(tool = %key, "Tool reported success but wrote no output for {}", image.display());
            let _ = tokio::fs::remove_file(output).await;
            return false;
        }
    }

    match tokio::fs::rename(output, image).await {
        Ok(()) => {
            debug!(tool = %key, "Replaced {} with optimized output", image.display());
            true
        }
        Err(e) => {
            warn!(tool = %key, "Could not replace {}: {}", image.display(), e);
            let _ = tokio::fs::remove_file(output).await;
            false
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::args;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn config_with(tools: Vec<(&str, ToolSpec)>, chain: &[&str]) -> Config {
        let mut registry = BTreeMap::new();
        for (key, spec) in tools {
            registry.insert(key.to_string(), spec);
        }
        let mut profiles = BTreeMap::new();
        profiles.insert("test".to_string(), chain.iter().map(|s| s.to_string()).collect());
        Config {
            tools: registry,
            optimization_profiles: profiles,
            ..Default::default()
        }
    }

    fn sh(script: &str) -> ToolSpec {
        ToolSpec {
            path: "/bin/sh".to_string(),
            params: args!["-c", script, "sh", "{input}"],
        }
    }

    #[tokio::test]
    async fn test_chain_runs_in_declared_order() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("a.jpg");
        std::fs::write(&image, b"").unwrap();

        let config = config_with(
            vec![
                ("first", sh("printf 1 >> \"$1\"")),
                ("second", sh("printf 2 >> \"$1\"")),
            ],
            &["second", "first"],
        );
        let optimizer = ImageOptimizer::with_resolver(&config, ToolPathResolver::with_tools_dir(None));
        let summary = optimizer.optimize_all(&[image.clone()], "test").await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(std::fs::read_to_string(&image).unwrap(), "21");
    }

    #[tokio::test]
    async fn test_failure_and_unconfigured_tools_do_not_abort() {
        let temp = TempDir::new().unwrap();
        let images = vec![temp.path().join("a.jpg"), temp.path().join("b.jpg")];
        for image in &images {
            std::fs::write(image, b"").unwrap();
        }

        let config = config_with(
            vec![
                ("broken", sh("exit 1")),
                ("empty", ToolSpec::default()),
                ("missing", ToolSpec { path: "/nonexistent/opt".to_string(), params: args!["{input}"] }),
                ("mark", sh("printf ok >> \"$1\"")),
            ],
            &["broken", "empty", "missing", "mark"],
        );
        let optimizer = ImageOptimizer::with_resolver(&config, ToolPathResolver::with_tools_dir(None));
        let summary = optimizer.optimize_all(&images, "test").await;

        assert_eq!(summary, OptimizationSummary { succeeded: 2, failed: 2, skipped: 4 });
        for image in &images {
            assert_eq!(std::fs::read_to_string(image).unwrap(), "ok");
        }
    }

    #[tokio::test]
    async fn test_output_path_tool_replaces_original() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("cover.jpg");
        std::fs::write(&image, b"original").unwrap();

        let config = config_with(
            vec![(
                "rewrite",
                ToolSpec {
                    path: "/bin/sh".to_string(),
                    params: args!["-c", "printf smaller > \"$2\"", "sh", "{input}", "{output}"],
                },
            )],
            &["rewrite"],
        );
        let optimizer = ImageOptimizer::with_resolver(&config, ToolPathResolver::with_tools_dir(None));
        let summary = optimizer.optimize_all(&[image.clone()], "test").await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(std::fs::read_to_string(&image).unwrap(), "smaller");
        assert!(!sibling_output(&image, "rewrite").exists());
    }

    #[tokio::test]
    async fn test_failed_output_tool_keeps_original() {
        let temp = TempDir::new().unwrap();
        let image = temp.path().join("cover.jpg");
        std::fs::write(&image, b"original").unwrap();

        let config = config_with(
            vec![(
                "half",
                ToolSpec {
                    path: "/bin/sh".to_string(),
                    params: args!["-c", "printf partial > \"$2\"; exit 2", "sh", "{input}", "{output}"],
                },
            )],
            &["half"],
        );
        let optimizer = ImageOptimizer::with_resolver(&config, ToolPathResolver::with_tools_dir(None));
        let summary = optimizer.optimize_all(&[image.clone()], "test").await;

        assert_eq!(summary.failed, 1);
        assert_eq!(std::fs::read_to_string(&image).unwrap(), "original");
        assert!(!sibling_output(&image, "half").exists());
    }
}
