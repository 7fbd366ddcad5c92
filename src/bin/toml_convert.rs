use clap::Parser;
use dbf_convert::core::ConfigProvider;
use dbf_convert::utils::{logger, validation::Validate};
use dbf_convert::{
    ConversionMode, ConvertError, DbfPipeline, EtlEngine, HttpUploader, LocalStorage, TomlConfig,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "toml-convert")]
#[command(about = "DBF conversion driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "dbf-convert.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override conversion mode from config
    #[arg(long)]
    mode: Option<ConversionMode>,

    /// Override record limit from config
    #[arg(long)]
    limit: Option<usize>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 日誌格式由配置決定
    if config.log_format() == Some("json") {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based DBF conversion");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(mode) = args.mode {
        config.input.mode = Some(mode);
        tracing::info!("🔧 Mode overridden to: {}", mode);
    }
    if let Some(limit) = args.limit {
        config.conversion.limit = Some(limit);
        tracing::info!("🔧 Limit overridden to: {}", limit);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let timeout = Duration::from_secs(config.upload_timeout_seconds());
    let uploader = config
        .upload_endpoint()
        .map(|endpoint| HttpUploader::new(endpoint).with_timeout(timeout));

    let pipeline = match DbfPipeline::new(LocalStorage::default(), config, uploader) {
        Ok(pipeline) => pipeline,
        Err(e) => exit_with(e),
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    let outcome = tokio::select! {
        result = engine.run() => result,
        _ = tokio::signal::ctrl_c() => Err(ConvertError::Cancelled),
    };

    match outcome {
        Ok(output_path) => {
            tracing::info!("✅ Conversion completed successfully!");
            println!("✅ Conversion completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn exit_with(e: ConvertError) -> ! {
    tracing::error!(
        "❌ Conversion failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    let options = config.options();

    println!("📋 Configuration Summary:");
    println!("  Input: {}", config.input_path());
    println!("  Mode: {}", config.mode());
    println!("  Output: {}", config.output_path());
    println!("  Encoding: {}", options.encoding);
    println!("  Delimiter: {:?}", options.delimiter);
    println!("  Batch Size: {}", options.batch_size);

    if options.offset > 0 || options.limit > 0 {
        println!("  Offset: {}, Limit: {}", options.offset, options.limit);
    }

    match config.upload_endpoint() {
        Some(endpoint) => println!("  Upload: {}", endpoint),
        None => println!("  Upload: disabled"),
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📂 Input Analysis:");
    match std::fs::metadata(config.input_path()) {
        Ok(meta) => println!("  {} ({} bytes)", config.input_path(), meta.len()),
        Err(e) => println!("  ⚠️ {} is not readable: {}", config.input_path(), e),
    }

    println!();
    println!("⚙️ Processing Mode:");
    match config.mode() {
        ConversionMode::Raw => println!("  📊 Raw: every source column is written as-is"),
        ConversionMode::Canonical => {
            println!("  🎯 Canonical: records are mapped onto the product import schema")
        }
    }
    let options = config.options();
    if options.limit > 0 {
        println!("  📊 At most {} records after skipping {}", options.limit, options.offset);
    }

    println!();
    println!("💾 Output Configuration:");
    println!(
        "  File: {}",
        std::path::Path::new(config.output_path())
            .join(dbf_convert::app::pipelines::dbf_pipeline::output_filename(config.input_path()))
            .display()
    );

    if config.mode() == ConversionMode::Canonical {
        if let Some(endpoint) = config.upload_endpoint() {
            println!("  📤 Will upload to {}/api/imports", endpoint.trim_end_matches('/'));
        }
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
