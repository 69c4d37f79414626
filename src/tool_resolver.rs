//! # Tool Path Resolver
//!
//! This module turns the tool paths found in the configuration into executables:
//! - Explicit paths (absolute or containing a separator) must exist as given
//! - Bare names are looked up in `TOOLS_DIR` first, then in the system PATH

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tool path resolver for configured executables
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    /// Directory with bundled tools, from `TOOLS_DIR`
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver
    pub fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());
        if let Some(ref dir) = tools_dir {
            debug!("Using bundled tools directory: {}", dir.display());
        }
        Self { tools_dir }
    }

    /// Resolver with an explicit bundled tools directory
    pub fn with_tools_dir(tools_dir: Option<PathBuf>) -> Self {
        Self { tools_dir }
    }

    /// Resolve a configured tool path to an existing executable
    pub fn resolve_tool(&self, tool: &str) -> Option<PathBuf> {
        let tool = tool.trim();
        if tool.is_empty() {
            return None;
        }

        let candidate = Path::new(tool);
        if candidate.is_absolute() || candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        if let Some(ref tools_dir) = self.tools_dir {
            if let Some(path) = Self::find_in_dir(tools_dir, tool) {
                debug!("Using bundled tool: {} -> {:?}", tool, path);
                return Some(path);
            }
        }

        let found = self.find_in_system_path(tool);
        if let Some(ref path) = found {
            debug!("Using system tool: {} -> {:?}", tool, path);
        }
        found
    }

    fn find_in_dir(dir: &Path, tool: &str) -> Option<PathBuf> {
        let extension = if cfg!(windows) { ".exe" } else { "" };
        let direct = dir.join(format!("{}{}", tool, extension));
        if direct.is_file() {
            return Some(direct);
        }
        // Windows users often configure "7z.exe" already
        let plain = dir.join(tool);
        plain.is_file().then_some(plain)
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool: &str) -> Option<PathBuf> {
        env::split_paths(&env::var_os("PATH")?).find_map(|dir| Self::find_in_dir(&dir, tool))
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool: &str) -> bool {
        self.resolve_tool(tool).is_some()
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
