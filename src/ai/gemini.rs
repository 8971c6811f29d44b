use crate::ai::{command_available, ensure_success, with_install_hint};
use crate::config::schema::ModelConfig;
use crate::domain::model::ResponseFormat;
use crate::domain::ports::AiModel;
use crate::utils::error::Result;
use crate::utils::executor::CliExecutor;
use async_trait::async_trait;
use std::time::Duration;

const INSTALL_HINT: &str = "Please install Gemini CLI.";

/// Status lines the Gemini CLI prints before the actual answer.
const NOISE_PREFIXES: [&str; 2] = ["Loaded cached credentials", "Loading"];

pub struct GeminiCli {
    config: ModelConfig,
    executor: CliExecutor,
}

impl GeminiCli {
    pub fn new(config: ModelConfig, executor: CliExecutor) -> Self {
        Self { config, executor }
    }

    fn build_args(&self, prompt: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(model) = self
            .config
            .models
            .as_ref()
            .and_then(|catalog| catalog.default.as_deref())
        {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        args.push("--prompt".to_string());
        args.push(prompt.to_string());
        args
    }

    fn clean_output(stdout: &str) -> String {
        stdout
            .split('\n')
            .filter(|line| !NOISE_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl AiModel for GeminiCli {
    fn name(&self) -> &str {
        "gemini"
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
                &[],
                Some(Duration::from_secs(self.config.timeout)),
            )
            .await
            .map_err(|e| with_install_hint(e, INSTALL_HINT))?;

        let output = ensure_success(&self.config.command, output)?;
        Ok(Self::clean_output(&output.stdout))
    }

    fn format_request(&self, prompt: &str, format: ResponseFormat, encoding: &str) -> String {
        format!(
            "\n{}\n\nOutput format: {}\nCharacter encoding: {}\n",
            prompt,
            format.as_str(),
            encoding
        )
    }

    async fn validate_command(&self) -> bool {
        command_available(&self.config.command).await
    }
}
