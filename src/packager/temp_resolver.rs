//! # Staging Root Resolution
//!
//! Sceglie una cartella di staging scrivibile che non si sovrapponga
//! né alla cartella sorgente né alla cartella di output.
//!
//! ## Ordine dei tentativi:
//! 1. `temp_folder` configurata
//! 2. temp di sistema: `<tmp>/photo-packager`
//! 3. dotfolder nella home: `~/.photo-packager/temp`
//! 4. sottocartella dell'output: `<output>/.photo-packager-temp` (solo se output non si sovrappone alla sorgente)
//!
//! Ogni candidato viene creato se manca; un errore di creazione passa al successivo.

use crate::error::PackError;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

const SYSTEM_TEMP_NAME: &str = "photo-packager";
const HOME_TEMP_PATH: &str = ".photo-packager/temp";
const OUTPUT_TEMP_NAME: &str = ".photo-packager-temp";

/// Absolute, canonical when it exists, lexically cleaned otherwise
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// True when one path contains the other
pub fn paths_collide(a: &Path, b: &Path) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a.starts_with(&b) || b.starts_with(&a)
}

/// Resolves the staging root of a run
pub struct TempResolver {
    system_temp: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl Default for TempResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TempResolver {
    pub fn new() -> Self {
        Self {
            system_temp: Some(std::env::temp_dir()),
            home: dirs::home_dir(),
        }
    }

    /// Override the system temp and home locations
    pub fn with_locations(system_temp: Option<PathBuf>, home: Option<PathBuf>) -> Self {
        Self { system_temp, home }
    }

    fn candidates(&self, output: &Path, configured: Option<&Path>) -> Vec<(&'static str, PathBuf)> {
        let mut candidates = Vec::new();
        if let Some(path) = configured {
            candidates.push(("configured", path.to_path_buf()));
        }
        if let Some(tmp) = &self.system_temp {
            candidates.push(("system", tmp.join(SYSTEM_TEMP_NAME)));
        }
        if let Some(home) = &self.home {
            candidates.push(("home", home.join(HOME_TEMP_PATH)));
        }
        candidates.push(("output", output.join(OUTPUT_TEMP_NAME)));
        candidates
    }

    /// First writable staging root not aliasing `source` or `output`
    pub fn resolve(&self, source: &Path, output: &Path, configured: Option<&Path>) -> Result<PathBuf, PackError> {
        for (kind, candidate) in self.candidates(output, configured) {
            let usable = if kind == "output" {
                !paths_collide(output, source)
            } else {
                !paths_collide(&candidate, source) && !paths_collide(&candidate, output)
            };
            if !usable {
                debug!(path = %candidate.display(), "Staging candidate ({}) overlaps source or output", kind);
                continue;
            }

            match std::fs::create_dir_all(&candidate) {
                Ok(()) => {
                    info!(path = %candidate.display(), "📁 Staging root ({})", kind);
                    return Ok(candidate);
                }
                Err(e) => warn!(path = %candidate.display(), "Cannot use staging candidate ({}): {}", kind, e),
            }
        }

        Err(PackError::TempDir(format!(
            "No usable staging directory for source {} and output {}",
            source.display(),
            output.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_collide() {
        assert!(paths_collide(Path::new("/a/b"), Path::new("/a/b/c")));
        assert!(paths_collide(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(paths_collide(Path::new("/a/b"), Path::new("/a/./x/../b")));
        assert!(!paths_collide(Path::new("/a/b"), Path::new("/a/bc")));
        assert!(!paths_collide(Path::new("/a/b"), Path::new("/a/c")));
    }

    #[test]
    fn test_configured_temp_used_when_separate() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let output = temp.path().join("output");
        let configured = temp.path().join("staging");

        let resolver = TempResolver::with_locations(None, None);
        let root = resolver.resolve(&source, &output, Some(&configured)).unwrap();
        assert_eq!(root, configured);
        assert!(root.is_dir());
    }

    #[test]
    fn test_colliding_temp_falls_back_to_system() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        let output = temp.path().join("output");
        let system = temp.path().join("sys");

        let resolver = TempResolver::with_locations(Some(system.clone()), None);
        let root = resolver.resolve(&source, &output, Some(&source.join("tmp"))).unwrap();
        assert_eq!(root, system.join(SYSTEM_TEMP_NAME));
    }

    #[test]
    fn test_falls_back_to_home_then_output() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let output = temp.path().join("output");
        let home = temp.path().join("home");

        let resolver = TempResolver::with_locations(Some(output.join("tmp")), Some(home.clone()));
        assert_eq!(resolver.resolve(&source, &output, None).unwrap(), home.join(HOME_TEMP_PATH));

        let resolver = TempResolver::with_locations(None, Some(source.join("home")));
        assert_eq!(
            resolver.resolve(&source, &output, None).unwrap(),
            output.join(OUTPUT_TEMP_NAME)
        );
    }

    #[test]
    fn test_output_inside_source_fails() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let output = source.join("out");

        let resolver = TempResolver::with_locations(None, None);
        let result = resolver.resolve(&source, &output, None);
        assert!(matches!(result, Err(PackError::TempDir(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_candidate_is_skipped() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let output = temp.path().join("output");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file, not a dir").unwrap();

        let resolver = TempResolver::with_locations(Some(blocker.clone()), None);
        let root = resolver.resolve(&source, &output, Some(&blocker.join("sub"))).unwrap();
        assert_eq!(root, output.join(OUTPUT_TEMP_NAME));
    }
}
