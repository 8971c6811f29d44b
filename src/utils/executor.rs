use crate::config::schema::CliExecutionConfig;
use crate::utils::error::{AiDevError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of one subprocess run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

/// Runs external commands, retrying timeouts and spawn failures.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    max_retries: u32,
    retry_delay: Duration,
}

impl Default for CliExecutor {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl CliExecutor {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Single attempt unless `error_handling` is `retry`.
    pub fn from_config(config: &CliExecutionConfig) -> Self {
        let attempts = if config.retries_enabled() {
            config.max_retries
        } else {
            1
        };
        Self::new(attempts, Duration::from_secs(config.retry_delay))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn execute(
        &self,
        program: &str,
        args: &[String],
        envs: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let mut attempt = 1;
        loop {
            match self.run_once(program, args, envs, timeout).await {
                Ok(output) => return Ok(output),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{}. Retrying... (Attempt {}/{})",
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn is_retryable(error: &AiDevError) -> bool {
        matches!(
            error,
            AiDevError::CommandTimeoutError { .. } | AiDevError::IoError(_)
        )
    }

    async fn run_once(
        &self,
        program: &str,
        args: &[String],
        envs: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        tracing::debug!("Executing: {} ({} args)", program, args.len());

        let child = Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AiDevError::CommandNotFoundError {
                    command: program.to_string(),
                    hint: "Make sure it is installed and available in PATH".to_string(),
                },
                _ => AiDevError::IoError(e),
            })?;

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| AiDevError::CommandTimeoutError {
                    command: program.to_string(),
                    seconds: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
