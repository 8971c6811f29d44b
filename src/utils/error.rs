use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiDevError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("PDF error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Unsupported format: {format}")]
    UnsupportedFormatError { format: String },

    #[error("Unknown model: {name}. Available models: {available}")]
    UnknownModelError { name: String, available: String },

    #[error("Command '{command}' not found. {hint}")]
    CommandNotFoundError { command: String, hint: String },

    #[error("Command failed: {stderr}")]
    CommandFailedError { command: String, stderr: String },

    #[error("Command timed out after {seconds} seconds")]
    CommandTimeoutError { command: String, seconds: u64 },

    #[error("{message}")]
    AuthenticationError { message: String },

    #[error("Encoding error: {message}")]
    EncodingError { message: String },

    #[error("Analysis error: {message}")]
    AnalysisError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parsing,
    Configuration,
    ExternalCommand,
    Document,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AiDevError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        Self::AnalysisError {
            message: message.into(),
        }
    }

    pub fn unsupported(format: impl Into<String>) -> Self {
        Self::UnsupportedFormatError {
            format: format.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) => ErrorCategory::Io,
            Self::SerializationError(_)
            | Self::YamlError(_)
            | Self::TomlError(_)
            | Self::TomlWriteError(_)
            | Self::CsvError(_)
            | Self::XmlError(_) => ErrorCategory::Parsing,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownModelError { .. } => ErrorCategory::Configuration,
            Self::CommandNotFoundError { .. }
            | Self::CommandFailedError { .. }
            | Self::CommandTimeoutError { .. }
            | Self::AuthenticationError { .. } => ErrorCategory::ExternalCommand,
            Self::ZipError(_)
            | Self::PdfError(_)
            | Self::UnsupportedFormatError { .. }
            | Self::EncodingError { .. }
            | Self::AnalysisError { .. } => ErrorCategory::Document,
            Self::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 重試可能
            Self::CommandTimeoutError { .. } | Self::CommandFailedError { .. } => {
                ErrorSeverity::Medium
            }
            Self::CommandNotFoundError { .. } | Self::AuthenticationError { .. } => {
                ErrorSeverity::Critical
            }
            Self::IoError(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("File not found: {}", e)
            }
            Self::CommandNotFoundError { command, .. } => {
                format!("AI CLI '{}' is not installed or not in PATH", command)
            }
            Self::CommandTimeoutError { command, seconds } => {
                format!("'{}' did not respond within {} seconds", command, seconds)
            }
            Self::UnsupportedFormatError { format } => {
                format!("Unsupported file type: {}", format)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check that the path exists and is readable/writable",
            ErrorCategory::Parsing => "Check the file contents for syntax errors",
            ErrorCategory::Configuration => {
                "Run `ai-dev config show` and `ai-dev config validate` to inspect the configuration"
            }
            ErrorCategory::ExternalCommand => match self {
                Self::AuthenticationError { .. } => "Log in with the AI CLI (e.g. `claude login`)",
                Self::CommandNotFoundError { .. } => {
                    "Install the AI CLI or set ai_models.<name>.command to its path"
                }
                _ => "Retry later or raise ai_models.<name>.timeout",
            },
            ErrorCategory::Document => {
                "Supported formats: .txt, .md, .pptx, .xlsx, .csv, .pdf"
            }
            ErrorCategory::Validation => "Fix the reported value and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, AiDevError>;
