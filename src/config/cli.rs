use crate::config::schema::AVAILABLE_MODELS;
use crate::domain::model::DocumentKind;
use crate::utils::error::{AiDevError, Result};
use crate::utils::validation::Validate;
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const GENERATE_FORMATS: [&str; 5] = ["json", "csv", "md", "markdown", "html"];
pub const OUTPUT_ENCODINGS: [&str; 3] = ["shift-jis", "utf-8", "cp932"];
pub const ANALYZE_FORMATS: [&str; 4] = ["json", "text", "md", "markdown"];

#[derive(Debug, Parser)]
#[command(name = "ai-dev", version)]
#[command(about = "AI Dev Tool - System Development Support Tool")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// AI model to use
    #[arg(short, long, global = true, value_parser = PossibleValuesParser::new(AVAILABLE_MODELS))]
    pub ai: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Switch AI model
    Use {
        #[arg(value_parser = PossibleValuesParser::new(AVAILABLE_MODELS))]
        model: String,
    },
    /// Display current configuration status
    Status,
    /// Initialize project configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Generate documents
    Generate {
        #[command(subcommand)]
        kind: GenerateCommand,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Analyze files and extract information
    Analyze {
        #[command(subcommand)]
        action: AnalyzeCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum GenerateCommand {
    /// Generate requirements document
    Requirements(GenerateArgs),
    /// Generate QA document
    Qa(GenerateArgs),
    /// Generate task list
    Tasks(GenerateArgs),
    /// Generate test concept document
    TestConcept(GenerateArgs),
    /// Generate test cases
    TestCases(GenerateArgs),
}

impl GenerateCommand {
    pub fn kind(&self) -> DocumentKind {
        match self {
            GenerateCommand::Requirements(_) => DocumentKind::Requirements,
            GenerateCommand::Qa(_) => DocumentKind::Qa,
            GenerateCommand::Tasks(_) => DocumentKind::Tasks,
            GenerateCommand::TestConcept(_) => DocumentKind::TestConcept,
            GenerateCommand::TestCases(_) => DocumentKind::TestCases,
        }
    }

    pub fn args(&self) -> &GenerateArgs {
        match self {
            GenerateCommand::Requirements(args)
            | GenerateCommand::Qa(args)
            | GenerateCommand::Tasks(args)
            | GenerateCommand::TestConcept(args)
            | GenerateCommand::TestCases(args) => args,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Source document (.txt, .md, .pptx, .xlsx, .csv, .pdf)
    pub input_file: PathBuf,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_parser = PossibleValuesParser::new(GENERATE_FORMATS))]
    pub format: Option<String>,

    /// Output encoding
    #[arg(short, long, value_parser = PossibleValuesParser::new(OUTPUT_ENCODINGS))]
    pub encoding: Option<String>,

    /// Extra context passed to the prompt, as KEY=VALUE
    #[arg(long = "context", value_parser = parse_key_val)]
    pub context: Vec<(String, String)>,
}

impl Validate for GenerateArgs {
    fn validate(&self) -> Result<()> {
        if !self.input_file.is_file() {
            return Err(AiDevError::ValidationError {
                message: format!("Input file does not exist: {}", self.input_file.display()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Set configuration value
    Set { key: String, value: String },
    /// Validate configuration
    Validate,
}

#[derive(Debug, Subcommand)]
pub enum AnalyzeCommand {
    /// Analyze various file formats (txt, md, pptx, xlsx, csv, pdf)
    File(AnalyzeFileArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeFileArgs {
    pub input_file: PathBuf,

    /// Output file path for analysis results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "md", value_parser = PossibleValuesParser::new(ANALYZE_FORMATS))]
    pub format: String,

    /// Extract only text content
    #[arg(long)]
    pub extract_text: bool,
}

impl Validate for AnalyzeFileArgs {
    fn validate(&self) -> Result<()> {
        if !self.input_file.is_file() {
            return Err(AiDevError::ValidationError {
                message: format!("Input file does not exist: {}", self.input_file.display()),
            });
        }
        Ok(())
    }
}

fn parse_key_val(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", raw))?;
    if key.trim().is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", raw));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["ai-dev", "status", "-v", "--ai", "claude"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.ai.as_deref(), Some("claude"));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_generate_test_cases_arguments() {
        let cli = Cli::try_parse_from([
            "ai-dev",
            "generate",
            "test-cases",
            "requirements.md",
            "-f",
            "csv",
            "-e",
            "utf-8",
            "--context",
            "system=在庫管理",
            "--context",
            "phase=結合テスト",
        ])
        .unwrap();

        let Commands::Generate { kind } = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(kind.kind(), DocumentKind::TestCases);

        let args = kind.args();
        assert_eq!(args.input_file, PathBuf::from("requirements.md"));
        assert_eq!(args.format.as_deref(), Some("csv"));
        assert_eq!(args.encoding.as_deref(), Some("utf-8"));
        assert_eq!(
            args.context,
            vec![
                ("system".to_string(), "在庫管理".to_string()),
                ("phase".to_string(), "結合テスト".to_string()),
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_choices() {
        assert!(Cli::try_parse_from(["ai-dev", "use", "gpt"]).is_err());
        assert!(Cli::try_parse_from(["ai-dev", "generate", "qa", "in.txt", "-f", "xlsx"]).is_err());
        assert!(Cli::try_parse_from(["ai-dev", "generate", "qa", "in.txt", "-e", "latin1"]).is_err());
        assert!(Cli::try_parse_from(["ai-dev", "generate", "qa", "in.txt", "--context", "novalue"]).is_err());
    }

    #[test]
    fn test_analyze_defaults_to_markdown() {
        let cli = Cli::try_parse_from(["ai-dev", "analyze", "file", "deck.pptx", "--extract-text"]).unwrap();
        let Commands::Analyze { action: AnalyzeCommand::File(args) } = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.format, "md");
        assert!(args.extract_text);
    }

    #[test]
    fn test_config_set_and_init_force() {
        let cli = Cli::try_parse_from(["ai-dev", "config", "set", "output.encoding", "utf-8"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigCommand::Set { ref key, ref value } }
                if key == "output.encoding" && value == "utf-8"
        ));

        let cli = Cli::try_parse_from(["ai-dev", "-c", "custom.yaml", "init", "--force"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        assert!(matches!(cli.command, Commands::Init { force: true }));
    }

    #[test]
    fn test_missing_input_file_fails_validation() {
        let args = GenerateArgs {
            input_file: PathBuf::from("/definitely/not/here.txt"),
            output: None,
            format: None,
            encoding: None,
            context: Vec::new(),
        };
        assert!(args.validate().is_err());
    }
}
