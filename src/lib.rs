pub mod adapters;
pub mod ai;
pub mod analyzers;
pub mod config;
pub mod core;
pub mod domain;
pub mod generators;
pub mod utils;

pub use adapters::LocalStorage;
pub use ai::ModelManager;
pub use config::{AppConfig, ConfigManager};
pub use self::core::{GenerationEngine, GenerationPipeline, GenerationRequest, RunSummary};
pub use domain::model::{DocumentKind, OutputFormat, Record};
pub use generators::DocumentGenerator;
pub use utils::error::{AiDevError, Result};
