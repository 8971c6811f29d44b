pub mod engine;
pub mod pipeline;

pub use crate::domain::model::{Record, SourceText, TransformResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
pub use engine::{GenerationEngine, RunSummary};
pub use pipeline::{GenerationPipeline, GenerationRequest};
