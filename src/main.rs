use clap::Parser;
use service_handout::core::prompt;
use service_handout::core::render::glyph::CategoryGlyph;
use service_handout::utils::{logger, validation::Validate};
use service_handout::{CliConfig, HandoutConfig, HandoutEngine, LocalStorage, ServiceCatalog};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置
    let config = match HandoutConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(3);
        }
    };

    // 初始化日誌
    logger::init_logger(cli.verbose, config.monitoring.log_format);
    tracing::info!("🚀 Starting service handout");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ Handout failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &HandoutConfig) -> service_handout::Result<()> {
    let catalog = Arc::new(ServiceCatalog::load(&config.catalog.path)?);

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let output_path = cli
        .output_path
        .clone()
        .unwrap_or_else(|| config.output.path.clone());
    let engine = HandoutEngine::new_with_monitoring(
        catalog,
        config.build_generator()?,
        config.build_sink()?,
        LocalStorage::new(output_path),
        config.engine_settings(),
        monitor_enabled,
    );

    let mut session = engine.find_services(cli.visitor_context())?;
    for id in &cli.remove {
        if !session.remove(*id) {
            tracing::warn!("Service {} is not among the suggestions, ignoring", id);
        }
    }

    println!("📋 Suggested services:");
    let removed = session.removed_ids();
    for service in session.candidates() {
        let mark = if removed.contains(&service.id) { "✗" } else { "✓" };
        let glyph = CategoryGlyph::for_category(&service.category);
        println!("  {} {} [{}] {}", mark, glyph.emoji(), service.id, service.name);
    }

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no text generated, nothing logged or written");
        let kept = session.confirm()?;
        println!();
        println!("{}", prompt::build_prompt(session.context(), &kept));
        return Ok(());
    }

    let outcome = engine.produce_handout(&session).await?;

    if cli.print_text {
        println!();
        println!("{}", outcome.visible_text);
        println!();
    }

    match &outcome.generation_error {
        None => println!("✅ Handout ready with {} services", outcome.cards),
        Some(reason) => {
            println!("⚠️ Handout text could not be generated: {}", reason);
            println!("💡 Try again in a moment; nothing was logged for this visit");
        }
    }
    if !outcome.logged && outcome.is_success() {
        println!("⚠️ The visit could not be logged; see diagnostics");
    }
    println!("📁 Output saved to: {}", outcome.output_path);

    Ok(())
}
