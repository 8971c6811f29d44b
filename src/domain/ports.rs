use crate::domain::model::{ModelResponse, ResponseFormat, SourceText, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A command-line AI client the tool shells out to.
#[async_trait]
pub trait AiModel: Send + Sync {
    fn name(&self) -> &str;

    fn command(&self) -> &str;

    /// Runs the CLI once with `prompt` and returns its cleaned stdout.
    async fn execute(&self, prompt: &str) -> Result<String>;

    /// Wraps `prompt` with the provider's output-format instructions.
    fn format_request(&self, prompt: &str, format: ResponseFormat, encoding: &str) -> String;

    async fn generate(
        &self,
        prompt: &str,
        format: ResponseFormat,
        encoding: &str,
    ) -> Result<ModelResponse> {
        let request = self.format_request(prompt, format, encoding);
        let output = self.execute(&request).await?;
        Ok(crate::ai::response::parse_response(&output, format))
    }

    async fn generate_with_context(
        &self,
        prompt: &str,
        context: &[(String, String)],
        format: ResponseFormat,
        encoding: &str,
    ) -> Result<ModelResponse> {
        let context_str = context
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        let full_prompt = format!("\nContext:\n{}\n\nRequest:\n{}\n", context_str, prompt);
        self.generate(&full_prompt, format, encoding).await
    }

    /// Whether `<command> --version` succeeds.
    async fn validate_command(&self) -> bool;

    /// Whether the CLI is usable end to end (installed and authenticated).
    async fn test_connection(&self) -> bool {
        self.validate_command().await
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceText>;
    async fn transform(&self, source: SourceText) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
