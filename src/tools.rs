//! # External Tool Invocation
//!
//! Esecuzione bloccante (awaited) di un singolo tool esterno.
//!
//! ## Responsabilità:
//! - Avvia il processo con un vettore di argomenti esplicito (mai una stringa shell)
//! - Cattura stdout e stderr
//! - Log: stdout a DEBUG, stderr non vuoto a WARN, exit status non zero a WARN
//!
//! Nessun timeout: un tool bloccato blocca la pipeline.

use crate::error::PackError;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of one tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `program` with `args`, optionally inside `working_dir`, and wait for it
pub async fn run_tool(
    label: &str,
    program: &Path,
    args: &[String],
    working_dir: Option<&Path>,
) -> Result<ToolOutput, PackError> {
    debug!(tool = %label, "Running {:?} {:?}", program, args);

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }

    let start_time = Instant::now();
    let output = command
        .output()
        .await
        .map_err(|e| PackError::Tool(format!("Failed to start {}: {}", program.display(), e)))?;
    let elapsed = start_time.elapsed();

    let result = ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.stdout.trim().is_empty() {
        debug!(tool = %label, "stdout: {}", result.stdout.trim());
    }
    if !result.stderr.trim().is_empty() {
        warn!(tool = %label, "stderr: {}", result.stderr.trim());
    }
    if result.success() {
        debug!(tool = %label, "Completed in {:?}", elapsed);
    } else {
        warn!(tool = %label, "Exited with {} after {:?}", result.status, elapsed);
    }

    Ok(result)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::args;

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let output = run_tool(
            "sh",
            Path::new("/bin/sh"),
            &args!["-c", "echo out; echo err 1>&2; exit 3"],
            None,
        )
        .await
        .unwrap();

        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_split() {
        let output = run_tool(
            "sh",
            Path::new("/bin/sh"),
            &args!["-c", "printf '%s|' \"$@\"", "sh", "two words", "$HOME"],
            None,
        )
        .await
        .unwrap();
        assert_eq!(output.stdout, "two words|$HOME|");
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_error() {
        let result = run_tool("ghost", Path::new("/nonexistent/ghost-tool"), &[], None).await;
        assert!(matches!(result, Err(PackError::Tool(_))));
    }
}
