use crate::core::Pipeline;
use crate::utils::error::Result;

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: String,
    pub record_count: usize,
    pub source_encoding: String,
}

/// Drives a pipeline through extract, transform and load.
pub struct GenerationEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> GenerationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Reading input...");
        let source = self.pipeline.extract().await?;
        tracing::info!(
            "Read {} ({} characters, {})",
            source.path.display(),
            source.text.chars().count(),
            source.encoding
        );
        let source_encoding = source.encoding.clone();

        tracing::info!("Generating with AI model...");
        let result = self.pipeline.transform(source).await?;
        let record_count = result.records.len();
        tracing::info!("Generated {} {} records", record_count, result.kind);

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(RunSummary {
            output_path,
            record_count,
            source_encoding,
        })
    }
}
