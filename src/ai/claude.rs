use crate::ai::{command_available, ensure_success, with_install_hint};
use crate::config::schema::ModelConfig;
use crate::domain::model::ResponseFormat;
use crate::domain::ports::AiModel;
use crate::utils::error::{AiDevError, Result};
use crate::utils::executor::CliExecutor;
use async_trait::async_trait;
use std::time::Duration;

const INSTALL_HINT: &str = "Please install Claude CLI.";
const CONNECTION_PROBE: &str = "Say 'ok' if you can read this";
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
const NONINTERACTIVE_ENV: (&str, &str) = ("CLAUDE_NONINTERACTIVE", "1");

pub struct ClaudeCli {
    config: ModelConfig,
    executor: CliExecutor,
}

impl ClaudeCli {
    pub fn new(config: ModelConfig, executor: CliExecutor) -> Self {
        Self { config, executor }
    }

    /// Sampling options are Gemini-style and rejected by the Claude CLI.
    fn passthrough_options(&self) -> impl Iterator<Item = &String> {
        self.config.options.iter().filter(|opt| {
            !opt.is_empty() && !opt.starts_with("--temperature") && !opt.starts_with("--max-tokens")
        })
    }

    fn build_args(&self, prompt: &str) -> Vec<String> {
        let mut args: Vec<String> = self.passthrough_options().cloned().collect();
        args.extend(
            ["--print", "--output-format", "text", prompt]
                .into_iter()
                .map(String::from),
        );
        args
    }

    fn is_auth_failure(stderr: &str) -> bool {
        stderr.contains("API key") || stderr.to_lowercase().contains("authentication")
    }
}

#[async_trait]
impl AiModel for ClaudeCli {
    fn name(&self) -> &str {
        "claude"
    }

    fn command(&self) -> &str {
        &self.config.command
    }

    async fn execute(&self, prompt: &str) -> Result<String> {
        let output = self
            .executor
            .execute(
                &self.config.command,
                &self.build_args(prompt),
                &[NONINTERACTIVE_ENV],
                Some(Duration::from_secs(self.config.timeout)),
            )
            .await
            .map_err(|e| with_install_hint(e, INSTALL_HINT))?;

        if !output.success() && Self::is_auth_failure(&output.stderr) {
            return Err(AiDevError::AuthenticationError {
                message: "Claude CLI authentication error. Please ensure you're logged in with 'claude login'".to_string(),
            });
        }

        let output = ensure_success(&self.config.command, output)?;
        Ok(output.stdout)
    }

    fn format_request(&self, prompt: &str, format: ResponseFormat, _encoding: &str) -> String {
        format!(
            "\n{}\n\nOutput format: {}\nPlease provide the output in valid {} format only, without any explanatory text.\n",
            prompt,
            format.as_str(),
            format.as_str()
        )
    }

    async fn validate_command(&self) -> bool {
        command_available(&self.config.command).await
    }

    async fn test_connection(&self) -> bool {
        let executor = CliExecutor::new(1, Duration::ZERO);
        let args = vec!["--print".to_string(), CONNECTION_PROBE.to_string()];
        match executor
            .execute(&self.config.command, &args, &[], Some(CONNECTION_TIMEOUT))
            .await
        {
            Ok(output) => output.success() && !output.stdout.is_empty(),
            Err(e) => {
                tracing::debug!("Claude connection test failed: {}", e);
                false
            }
        }
    }
}
