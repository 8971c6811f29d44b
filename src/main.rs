use ai_dev::analyzers::report::{self, ReportFormat};
use ai_dev::analyzers::{self, AnalyzerOptions};
use ai_dev::config::cli::{AnalyzeCommand, AnalyzeFileArgs, Cli, Commands, ConfigCommand, GenerateCommand};
use ai_dev::config::manager::{parse_cli_value, DEFAULT_CONFIG_PATH};
use ai_dev::utils::error::{AiDevError, ErrorSeverity, Result};
use ai_dev::utils::{logger, validation::Validate};
use ai_dev::{
    ConfigManager, DocumentGenerator, GenerationEngine, GenerationPipeline, GenerationRequest,
    LocalStorage, ModelManager, OutputFormat,
};
use clap::Parser;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

const TEXT_PREVIEW_LENGTH: usize = 1000;
const REPORT_PREVIEW_LENGTH: usize = 2000;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);
    tracing::debug!("CLI arguments: {:?}", cli);

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ConfigManager::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Use { model } => use_model(&mut config, &model).await,
        Commands::Status => status(&config, cli.ai.as_deref(), cli.verbose).await,
        Commands::Init { force } => init(&config, cli.config.as_deref(), force),
        Commands::Generate { kind } => generate(&mut config, cli.ai.as_deref(), &kind).await,
        Commands::Config { action } => match action {
            ConfigCommand::Show => config_show(&config),
            ConfigCommand::Set { key, value } => config_set(&mut config, &key, &value),
            ConfigCommand::Validate => config_validate(&config),
        },
        Commands::Analyze { action } => match action {
            AnalyzeCommand::File(args) => analyze_file(&config, &args),
        },
    }
}

async fn model_manager(config: &ConfigManager, ai: Option<&str>) -> Result<ModelManager> {
    let mut manager = ModelManager::new(&config.settings()?).await?;
    if let Some(name) = ai {
        manager.use_model(name).await?;
    }
    Ok(manager)
}

async fn use_model(config: &mut ConfigManager, model: &str) -> Result<()> {
    let mut manager = ModelManager::new(&config.settings()?).await?;
    manager.use_model(model).await?;

    config.set("ai_models.default", Value::String(model.to_string()));
    let saved = config.save(None)?;

    println!("✅ Switched to {} model", model);
    println!("   Saved to: {}", saved.display());
    Ok(())
}

async fn status(config: &ConfigManager, ai: Option<&str>, verbose: bool) -> Result<()> {
    let manager = model_manager(config, ai).await?;
    let setting = |key: &str| config.get_str(key).unwrap_or("Not set").to_string();

    let mut rows = vec![
        ("AI Model", manager.current_model_name().to_string()),
        ("Encoding", setting("output.encoding")),
        ("Output Directory", setting("output.directory")),
        ("Output Format", setting("output.default_format")),
        ("Available Models", ModelManager::available_models().join(", ")),
    ];

    let available = manager.validate_current_model().await;
    rows.push((
        "Model Status",
        if available { "✓ Available" } else { "✗ Not Available" }.to_string(),
    ));
    if verbose && available {
        let connected = manager.current_model().test_connection().await;
        rows.push((
            "Connection",
            if connected { "✓ OK" } else { "✗ Failed" }.to_string(),
        ));
    }

    println!("AI Dev Tool Status");
    println!("{}", "-".repeat(40));
    for (name, value) in rows {
        println!("{:<18} {}", name, value);
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn init(config: &ConfigManager, path: Option<&Path>, force: bool) -> Result<()> {
    let target = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if target.exists() && !force && !confirm("Configuration file already exists. Overwrite?")? {
        println!("Initialization cancelled");
        return Ok(());
    }

    let saved = config.save(Some(target.as_path()))?;
    println!("✅ Configuration initialized at {}", saved.display());

    let output_dir = PathBuf::from(config.settings()?.output.directory);
    std::fs::create_dir_all(&output_dir)?;
    println!("✅ Output directory created at {}", output_dir.display());
    Ok(())
}

async fn generate(config: &mut ConfigManager, ai: Option<&str>, command: &GenerateCommand) -> Result<()> {
    let kind = command.kind();
    let args = command.args();
    args.validate()?;

    // 命令列參數覆寫設定 (僅本次執行)
    if let Some(encoding) = &args.encoding {
        config.set("output.encoding", Value::String(encoding.clone()));
    }
    let format = args
        .format
        .as_deref()
        .map(str::parse::<OutputFormat>)
        .transpose()?;
    if let Some(format) = &args.format {
        config.set("output.default_format", Value::String(format.clone()));
    }

    let settings = config.settings()?;
    let manager = model_manager(config, ai).await?;
    let options = AnalyzerOptions::from_config(&settings.analysis)?;

    let request = GenerationRequest {
        kind,
        input_file: args.input_file.clone(),
        output: args.output.clone(),
        format,
        context: args.context.clone(),
    };
    let pipeline = GenerationPipeline::new(
        LocalStorage::default(),
        manager.current_model(),
        DocumentGenerator::new(kind, &settings),
        options,
        request,
    );

    tracing::info!("Generating {} with {}...", kind, manager.current_model_name());
    let summary = GenerationEngine::new(pipeline).run().await?;

    println!("✅ {} generated: {}", kind.title(), summary.output_path);
    println!("   Encoding: {}", settings.output.encoding);
    println!("   {}: {}", kind.item_label(), summary.record_count);
    tracing::debug!("Input encoding detected: {}", summary.source_encoding);
    Ok(())
}

fn config_show(config: &ConfigManager) -> Result<()> {
    println!("Current Configuration:");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn config_set(config: &mut ConfigManager, key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(AiDevError::config("Configuration key must not be empty"));
    }
    config.set(key, parse_cli_value(value));
    config.save(None)?;
    println!("✅ Set {} = {}", key, value);
    Ok(())
}

fn config_validate(config: &ConfigManager) -> Result<()> {
    config.settings()?.validate()?;
    println!("✅ Configuration is valid: {}", config.path().display());
    Ok(())
}

fn preview(text: &str, limit: usize) {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => {
            println!("{}", &text[..idx]);
            println!("... (truncated)");
        }
        None => println!("{}", text),
    }
}

fn write_utf8(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn analyze_file(config: &ConfigManager, args: &AnalyzeFileArgs) -> Result<()> {
    args.validate()?;
    let settings = config.settings()?;
    let options = AnalyzerOptions::from_config(&settings.analysis)?;
    let analyzer = analyzers::analyzer_for(&args.input_file, options)?;
    tracing::info!("Analyzing {} file...", analyzer.kind());

    if args.extract_text {
        let text = analyzer.extract_text(&args.input_file)?;
        println!("✅ Text extracted from {}", args.input_file.display());

        match &args.output {
            Some(output) => {
                write_utf8(output, &text)?;
                println!("   Saved to: {}", output.display());
            }
            None => {
                println!("\n{}", "=".repeat(60));
                preview(&text, TEXT_PREVIEW_LENGTH);
            }
        }
        return Ok(());
    }

    let analysis = analyzer.analyze(&args.input_file)?;
    println!("✅ {} file analyzed", analysis.kind.label());

    let format: ReportFormat = args.format.parse()?;
    let content = report::format_analysis(&analysis, format)?;
    match &args.output {
        Some(output) => {
            write_utf8(output, &content)?;
            println!("   Saved to: {}", output.display());
        }
        None => {
            println!();
            preview(&content, REPORT_PREVIEW_LENGTH);
        }
    }

    if !analysis.statistics.is_empty() {
        println!("\nStatistics:");
        for (key, value) in &analysis.statistics {
            match value {
                Value::String(s) => println!("  {}: {}", key, s),
                other => println!("  {}: {}", key, other),
            }
        }
    }
    Ok(())
}
