use crate::ai::{ClaudeCli, GeminiCli};
use crate::config::schema::{AiModelsConfig, AppConfig, ModelConfig, AVAILABLE_MODELS};
use crate::domain::ports::AiModel;
use crate::utils::error::{AiDevError, Result};
use crate::utils::executor::CliExecutor;

/// Owns the active AI model and switches between providers.
pub struct ModelManager {
    models_config: AiModelsConfig,
    executor: CliExecutor,
    current: Box<dyn AiModel>,
    current_name: String,
}

impl ModelManager {
    /// Builds the manager with `ai_models.default` as the active model.
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let executor = CliExecutor::from_config(&config.cli_execution);
        let name = config.ai_models.default.clone();
        let current = Self::build(&config.ai_models, &executor, &name)?;

        let manager = Self {
            models_config: config.ai_models.clone(),
            executor,
            current,
            current_name: name,
        };
        manager.warn_if_unavailable().await;
        Ok(manager)
    }

    /// Wraps an already constructed model.
    pub fn with_model(model: Box<dyn AiModel>) -> Self {
        Self {
            models_config: AiModelsConfig::default(),
            executor: CliExecutor::default(),
            current_name: model.name().to_string(),
            current: model,
        }
    }

    pub fn available_models() -> &'static [&'static str] {
        &AVAILABLE_MODELS
    }

    pub async fn use_model(&mut self, name: &str) -> Result<()> {
        self.current = Self::build(&self.models_config, &self.executor, name)?;
        self.current_name = name.to_string();
        self.warn_if_unavailable().await;
        tracing::info!("Switched to {} model", name);
        Ok(())
    }

    pub fn current_model(&self) -> &dyn AiModel {
        self.current.as_ref()
    }

    pub fn current_model_name(&self) -> &str {
        &self.current_name
    }

    pub async fn validate_current_model(&self) -> bool {
        self.current.validate_command().await
    }

    fn build(
        models_config: &AiModelsConfig,
        executor: &CliExecutor,
        name: &str,
    ) -> Result<Box<dyn AiModel>> {
        if !AVAILABLE_MODELS.contains(&name) {
            return Err(AiDevError::UnknownModelError {
                name: name.to_string(),
                available: AVAILABLE_MODELS.join(", "),
            });
        }

        let model_config = models_config
            .model(name)
            .cloned()
            .unwrap_or_else(|| ModelConfig::fallback(name));

        let model: Box<dyn AiModel> = match name {
            "gemini" => Box::new(GeminiCli::new(model_config, executor.clone())),
            _ => Box::new(ClaudeCli::new(model_config, executor.clone())),
        };
        Ok(model)
    }

    async fn warn_if_unavailable(&self) {
        if !self.current.validate_command().await {
            tracing::warn!(
                "{} CLI command '{}' not found. Please ensure it's installed and in PATH.",
                self.current_name,
                self.current.command()
            );
        }
    }
}
