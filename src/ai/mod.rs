pub mod claude;
pub mod gemini;
pub mod manager;
pub mod response;

pub use claude::ClaudeCli;
pub use gemini::GeminiCli;
pub use manager::ModelManager;

use crate::utils::error::{AiDevError, Result};
use crate::utils::executor::{CliExecutor, CommandOutput};
use std::time::Duration;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// `<command> --version` exits successfully within five seconds.
pub(crate) async fn command_available(command: &str) -> bool {
    let executor = CliExecutor::new(1, Duration::ZERO);
    match executor
        .execute(command, &["--version".to_string()], &[], Some(VERSION_CHECK_TIMEOUT))
        .await
    {
        Ok(output) => output.success(),
        Err(e) => {
            tracing::debug!("{} --version failed: {}", command, e);
            false
        }
    }
}

/// Replaces the generic not-found hint with a provider-specific one.
pub(crate) fn with_install_hint(error: AiDevError, hint: &str) -> AiDevError {
    match error {
        AiDevError::CommandNotFoundError { command, .. } => AiDevError::CommandNotFoundError {
            command,
            hint: hint.to_string(),
        },
        other => other,
    }
}

pub(crate) fn ensure_success(command: &str, output: CommandOutput) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(AiDevError::CommandFailedError {
            command: command.to_string(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Writes an executable shell script standing in for an AI CLI.
    pub fn fake_cli(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
