use anyhow::Context;
use clap::Parser;
use service_handout::core::analytics::{self, AnalyticsPeriod, UsageSummary};
use service_handout::domain::model::NeedCategory;
use service_handout::utils::{logger, validation::Validate};
use service_handout::{HandoutConfig, ServiceCatalog};

#[derive(Parser)]
#[command(name = "analytics")]
#[command(about = "Summarize logged handout interactions")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "handout.toml")]
    config: String,

    /// all, 7, 30 or 90 (days)
    #[arg(short, long, default_value = "30")]
    period: AnalyticsPeriod,

    /// Write the filtered rows to this CSV file
    #[arg(long)]
    export: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);
    tracing::info!("📈 Loading configuration from: {}", args.config);

    let config = HandoutConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;
    if let Err(e) = config.validate() {
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let catalog = ServiceCatalog::load(&config.catalog.path)
        .with_context(|| format!("failed to load catalog '{}'", config.catalog.path))?;
    let sink = config.build_sink()?;

    let records = match sink.load_all().await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ Could not read the interaction log: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };
    tracing::info!("📊 Loaded {} interactions", records.len());

    let filtered = analytics::filter_period(&records, args.period, chrono::Local::now().naive_local());
    let summary = analytics::summarize(&filtered, &catalog);
    print_summary(args.period, &summary);

    if let Some(path) = &args.export {
        let file = std::fs::File::create(path)
            .with_context(|| format!("cannot create export file '{}'", path))?;
        analytics::export_csv(&filtered, file).context("CSV export failed")?;
        println!("📁 Exported {} rows to: {}", filtered.len(), path);
    }

    Ok(())
}

fn print_summary(period: AnalyticsPeriod, summary: &UsageSummary) {
    println!("📈 Usage summary ({})", period.label());
    println!("  Total interactions: {}", summary.total_interactions);

    if summary.total_interactions == 0 {
        println!("  No interactions logged for this period yet.");
        return;
    }

    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    println!("  First interaction:  {}", date(summary.first_date));
    println!("  Most recent:        {}", date(summary.last_date));

    let needs: Vec<(String, usize)> = summary
        .top_needs
        .iter()
        .map(|(tag, count)| {
            let label = NeedCategory::from_tag(tag)
                .map(|need| format!("{} {}", need.emoji(), need.label()))
                .unwrap_or_else(|| tag.clone());
            (label, *count)
        })
        .collect();
    print_table("Top needs", &needs);
    print_table("Top services", &summary.top_services);
    print_table("By housing status", &summary.by_housing);
    print_table("By age group", &summary.by_age);
}

fn print_table(title: &str, rows: &[(String, usize)]) {
    println!();
    println!("{}:", title);
    if rows.is_empty() {
        println!("  (none)");
    }
    for (label, count) in rows {
        println!("  {:<32} {:>5}", label, count);
    }
}
