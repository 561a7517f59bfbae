use anyhow::{Context, Result};
use brandlens_analysis::generate_queries;
use brandlens_api::AppState;
use brandlens_core::{
    BrandAnalysis, BrandLensConfig, BrandProfile, CompetitorChoice, CompetitorComparison,
    CompetitorStanding, ConfigManager, Platform, PlatformRanking, SubscriptionTier,
};
use brandlens_providers::validate_key_format;
use brandlens_store::AnalysisStore;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "brandlens")]
#[command(about = "BrandLens CLI - brand visibility tracking across AI platforms", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Path to a config file to load instead of the default locations
    #[arg(long, global = true, env = "BRANDLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a brand visibility analysis across all configured platforms
    Analyze {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Drop stored analyses and cached results for this website first
        #[arg(long)]
        force: bool,
    },

    /// Compare the brand against competitors
    Competitors {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Show the most recent stored analysis
    Report,

    /// Show monthly usage against the subscription limit
    Usage,

    /// Check an API key against the format the provider issues
    ValidateKey {
        /// Platform the key belongs to (chatgpt, claude, gemini, perplexity)
        #[arg(short, long)]
        platform: String,

        /// The API key to check
        #[arg(short, long)]
        key: String,
    },

    /// Print the queries an analysis would send, without calling any provider
    Queries {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Write a starter config file
    InitConfig {
        /// Where to write it (defaults to ~/.brandlens/config.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Args, Clone)]
struct ProfileArgs {
    /// Website URL of the brand
    #[arg(long)]
    website: String,

    /// Brand name to look for in responses
    #[arg(long)]
    brand: String,

    /// Industry the brand competes in
    #[arg(long)]
    industry: String,

    /// Target location or market
    #[arg(long)]
    location: Option<String>,

    /// Keyword to work into the generated queries (repeatable)
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Competitor to compare against (repeatable)
    #[arg(long = "competitor")]
    competitors: Vec<String>,

    /// Discover competitors with the judge provider even when --competitor is given
    #[arg(long, conflicts_with = "manual")]
    auto: bool,

    /// Compare only the competitors passed via --competitor
    #[arg(long)]
    manual: bool,
}

impl ProfileArgs {
    fn to_profile(&self) -> BrandProfile {
        let competitor_choice = if self.manual || (!self.auto && !self.competitors.is_empty()) {
            CompetitorChoice::Manual
        } else {
            CompetitorChoice::Auto
        };

        BrandProfile {
            website_url: self.website.clone(),
            brand_name: self.brand.clone(),
            industry: self.industry.clone(),
            location: self.location.clone(),
            keywords: self.keywords.clone(),
            competitors: self.competitors.clone(),
            competitor_choice,
        }
    }
}

// Output structures
#[derive(Serialize)]
struct AnalysisOutput {
    analysis_id: String,
    brand: String,
    website: String,
    overall_score: u32,
    rankings: Vec<RankingRow>,
    failures: Vec<FailureRow>,
    created_at: String,
}

#[derive(Serialize)]
struct RankingRow {
    platform: String,
    score: u32,
    rank: Option<u32>,
    mentions: u32,
    trend: String,
    recommendations: Vec<String>,
}

#[derive(Serialize)]
struct FailureRow {
    platform: String,
    error: String,
}

#[derive(Serialize)]
struct ComparisonOutput {
    brand: Option<StandingRow>,
    competitors: Vec<StandingRow>,
    failures: Vec<CompetitorFailureRow>,
    created_at: String,
}

#[derive(Serialize)]
struct StandingRow {
    name: String,
    website: String,
    overall_score: u32,
    platforms: Vec<EstimateRow>,
}

#[derive(Serialize)]
struct EstimateRow {
    platform: String,
    score: u32,
    rank: Option<u32>,
    trend: String,
}

#[derive(Serialize)]
struct CompetitorFailureRow {
    name: String,
    website: String,
    error: String,
}

#[derive(Serialize)]
struct UsageOutput {
    tier: String,
    used: u32,
    limit: u32,
    remaining: u32,
    brand_analyses: u32,
    competitor_analyses: u32,
    can_analyze: bool,
}

fn platform_label(platform: Platform) -> String {
    format!("{} {}", platform.logo(), platform.display_name())
}

impl From<PlatformRanking> for RankingRow {
    fn from(ranking: PlatformRanking) -> Self {
        Self {
            platform: platform_label(ranking.platform),
            score: ranking.score,
            rank: ranking.rank,
            mentions: ranking.mentions,
            trend: ranking.trend.to_string(),
            recommendations: ranking.recommendations,
        }
    }
}

impl From<BrandAnalysis> for AnalysisOutput {
    fn from(analysis: BrandAnalysis) -> Self {
        Self {
            analysis_id: analysis.id.to_string(),
            brand: analysis.brand_name,
            website: analysis.website_url,
            overall_score: analysis.overall_score,
            rankings: analysis.rankings.into_iter().map(RankingRow::from).collect(),
            failures: analysis
                .failures
                .into_iter()
                .map(|f| FailureRow {
                    platform: platform_label(f.platform),
                    error: f.error,
                })
                .collect(),
            created_at: analysis.created_at.to_rfc3339(),
        }
    }
}

impl From<CompetitorStanding> for StandingRow {
    fn from(standing: CompetitorStanding) -> Self {
        Self {
            name: standing.name,
            website: standing.website,
            overall_score: standing.overall_score,
            platforms: standing
                .platforms
                .into_iter()
                .map(|p| EstimateRow {
                    platform: platform_label(p.platform),
                    score: p.score,
                    rank: p.rank,
                    trend: p.trend.to_string(),
                })
                .collect(),
        }
    }
}

impl From<CompetitorComparison> for ComparisonOutput {
    fn from(comparison: CompetitorComparison) -> Self {
        Self {
            brand: comparison.brand.map(StandingRow::from),
            competitors: comparison
                .competitors
                .into_iter()
                .map(StandingRow::from)
                .collect(),
            failures: comparison
                .failures
                .into_iter()
                .map(|f| CompetitorFailureRow {
                    name: f.name,
                    website: f.website,
                    error: f.error,
                })
                .collect(),
            created_at: comparison.created_at.to_rfc3339(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().compact().with_target(false))
        .init();
}

async fn run(cli: &Cli) -> Result<serde_json::Value> {
    match &cli.command {
        Commands::Analyze { profile, force } => {
            execute_analyze(profile, *force, load_config(cli)?).await
        }
        Commands::Competitors { profile } => {
            execute_competitors(profile, load_config(cli)?).await
        }
        Commands::Report => execute_report(load_config(cli)?),
        Commands::Usage => execute_usage(load_config(cli)?),
        Commands::ValidateKey { platform, key } => execute_validate_key(platform, key),
        Commands::Queries { profile } => execute_queries(profile),
        Commands::InitConfig { path } => execute_init_config(path.as_deref()),
    }
}

fn load_config(cli: &Cli) -> Result<BrandLensConfig> {
    let manager =
        ConfigManager::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    Ok(manager.config().clone())
}

async fn execute_analyze(
    args: &ProfileArgs,
    force: bool,
    config: BrandLensConfig,
) -> Result<serde_json::Value> {
    let profile = args.to_profile();
    let state = AppState::from_config(config).context("Failed to initialize BrandLens")?;

    if force {
        let removed = state
            .engine
            .force_reanalysis(state.user_id(), &profile.website_url)
            .await
            .context("Failed to clear stored analyses")?;
        if removed > 0 {
            eprintln!(
                "{} cleared {} stored analyses",
                "Reset:".yellow().bold(),
                removed
            );
        }
    }

    let analysis = state.engine.analyze_brand(state.user_id(), &profile).await?;

    Ok(serde_json::to_value(AnalysisOutput::from(analysis))?)
}

async fn execute_competitors(
    args: &ProfileArgs,
    config: BrandLensConfig,
) -> Result<serde_json::Value> {
    let profile = args.to_profile();
    let state = AppState::from_config(config).context("Failed to initialize BrandLens")?;

    let comparison = state
        .engine
        .analyze_competitors(state.user_id(), &profile)
        .await?;

    Ok(serde_json::to_value(ComparisonOutput::from(comparison))?)
}

fn execute_report(config: BrandLensConfig) -> Result<serde_json::Value> {
    let store = AnalysisStore::open_at(&config.storage.db_path)
        .context("Failed to open the analysis store")?;
    let analysis = store
        .get_latest_brand_analysis(&config.analysis.user_id)?
        .context("No analyses stored yet. Run `brandlens analyze` first")?;

    Ok(serde_json::to_value(AnalysisOutput::from(analysis))?)
}

fn execute_usage(config: BrandLensConfig) -> Result<serde_json::Value> {
    let store = AnalysisStore::open_at(&config.storage.db_path)
        .context("Failed to open the analysis store")?;
    let tier: SubscriptionTier = config
        .analysis
        .subscription_tier
        .parse()
        .map_err(anyhow::Error::msg)?;
    let check = store.check_subscription_limit(&config.analysis.user_id, tier)?;

    let result = UsageOutput {
        tier: tier.to_string(),
        used: check.usage.total,
        limit: check.limit,
        remaining: check.limit.saturating_sub(check.usage.total),
        brand_analyses: check.usage.brand,
        competitor_analyses: check.usage.competitor,
        can_analyze: check.can_analyze,
    };

    Ok(serde_json::to_value(result)?)
}

fn execute_validate_key(platform: &str, key: &str) -> Result<serde_json::Value> {
    let platform: Platform = platform.parse().map_err(anyhow::Error::msg)?;
    let valid = validate_key_format(platform, key);

    Ok(serde_json::json!({
        "platform": platform.display_name(),
        "valid": valid,
    }))
}

fn execute_queries(args: &ProfileArgs) -> Result<serde_json::Value> {
    let profile = args.to_profile();
    let queries = generate_queries(&profile);

    Ok(serde_json::json!({
        "brand": profile.brand_name,
        "count": queries.len(),
        "queries": queries,
    }))
}

fn execute_init_config(path: Option<&Path>) -> Result<serde_json::Value> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => dirs::home_dir()
            .context("Could not determine the home directory")?
            .join(".brandlens")
            .join("config.toml"),
    };

    ConfigManager::create_default_config(&path).context("Failed to write the config file")?;

    Ok(serde_json::json!({
        "path": path.display().to_string(),
        "status": "created",
    }))
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
        OutputFormat::Table => {
            print_table(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    serde_json::Value::Null => {
                        println!("{}: {}", key_colored, "-".dimmed());
                    }
                    serde_json::Value::Object(_) => {
                        println!("{}:", key_colored);
                        print_pretty(val)?;
                    }
                    serde_json::Value::Array(items) if !items.is_empty() => {
                        println!("{}:", key_colored);
                        print_pretty(val)?;
                    }
                    _ => {
                        println!("{}: {}", key_colored, val);
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                match item {
                    serde_json::Value::Object(_) => {
                        println!("\n{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                        print_pretty(item)?;
                    }
                    serde_json::Value::String(s) => {
                        println!("  - {}", s.green());
                    }
                    other => {
                        println!("  - {}", other);
                    }
                }
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

fn print_table(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Array(items)
            if !items.is_empty() && items.iter().all(serde_json::Value::is_object) =>
        {
            print_object_table(items)
        }
        serde_json::Value::Object(map) => {
            // Scalar fields become key/value rows; nested arrays of objects
            // (rankings, competitors) each get a table of their own below.
            let mut nested: Vec<(&String, &Vec<serde_json::Value>)> = Vec::new();
            let mut builder = Builder::default();
            builder.push_record(["field", "value"]);
            for (key, val) in map {
                match val {
                    serde_json::Value::Array(items)
                        if !items.is_empty()
                            && items.iter().all(serde_json::Value::is_object) =>
                    {
                        nested.push((key, items));
                    }
                    other => {
                        builder.push_record([key.clone(), cell_text(other)]);
                    }
                }
            }

            let mut table = builder.build();
            table.with(Style::rounded());
            println!("{table}");

            for (key, items) in nested {
                println!("\n{}:", key.cyan().bold());
                print_object_table(items)?;
            }
            Ok(())
        }
        other => {
            println!("{}", serde_json::to_string_pretty(other)?);
            Ok(())
        }
    }
}

fn print_object_table(items: &[serde_json::Value]) -> Result<()> {
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        if let Some(map) = item.as_object() {
            for key in map.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(&columns);
    for item in items {
        let Some(map) = item.as_object() else { continue };
        builder.push_record(columns.iter().map(|c| match map.get(c) {
            Some(v) => cell_text(v),
            None => "-".to_string(),
        }));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_analyze_args_build_a_profile() {
        let cli = parse(&[
            "brandlens",
            "analyze",
            "--website",
            "https://acme.dev",
            "--brand",
            "Acme",
            "--industry",
            "software",
            "--keyword",
            "crm",
            "--keyword",
            "sales",
        ]);

        let Commands::Analyze { profile, force } = cli.command else {
            panic!("expected analyze command");
        };
        assert!(!force);

        let profile = profile.to_profile();
        assert_eq!(profile.website_url, "https://acme.dev");
        assert_eq!(profile.brand_name, "Acme");
        assert_eq!(profile.industry, "software");
        assert_eq!(profile.keywords, vec!["crm", "sales"]);
        assert_eq!(profile.competitor_choice, CompetitorChoice::Auto);
    }

    #[test]
    fn test_competitor_list_implies_manual_choice() {
        let cli = parse(&[
            "brandlens",
            "competitors",
            "--website",
            "https://acme.dev",
            "--brand",
            "Acme",
            "--industry",
            "software",
            "--competitor",
            "Globex",
        ]);

        let Commands::Competitors { profile } = cli.command else {
            panic!("expected competitors command");
        };
        let profile = profile.to_profile();
        assert_eq!(profile.competitors, vec!["Globex"]);
        assert_eq!(profile.competitor_choice, CompetitorChoice::Manual);
    }

    #[test]
    fn test_auto_flag_forces_discovery() {
        let cli = parse(&[
            "brandlens",
            "competitors",
            "--website",
            "https://acme.dev",
            "--brand",
            "Acme",
            "--industry",
            "software",
            "--competitor",
            "Globex",
            "--auto",
        ]);

        let Commands::Competitors { profile } = cli.command else {
            panic!("expected competitors command");
        };
        assert_eq!(profile.to_profile().competitor_choice, CompetitorChoice::Auto);
    }

    #[test]
    fn test_auto_and_manual_conflict() {
        let result = Cli::try_parse_from([
            "brandlens",
            "analyze",
            "--website",
            "https://acme.dev",
            "--brand",
            "Acme",
            "--industry",
            "software",
            "--auto",
            "--manual",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_key_reports_format_match() {
        let value = execute_validate_key("claude", "sk-ant-REDACTED").unwrap();
        assert_eq!(value["platform"], "Claude");
        assert_eq!(value["valid"], true);

        let value = execute_validate_key("perplexity", "sk-wrong-prefix").unwrap();
        assert_eq!(value["valid"], false);
    }

    #[test]
    fn test_validate_key_rejects_unknown_platform() {
        assert!(execute_validate_key("copilot", "whatever").is_err());
    }

    #[test]
    fn test_queries_lists_generated_prompts() {
        let args = ProfileArgs {
            website: "https://acme.dev".to_string(),
            brand: "Acme".to_string(),
            industry: "software".to_string(),
            location: None,
            keywords: vec![],
            competitors: vec![],
            auto: false,
            manual: false,
        };

        let value = execute_queries(&args).unwrap();
        let count = value["count"].as_u64().unwrap();
        assert!(count > 0);
        assert_eq!(value["queries"].as_array().unwrap().len() as u64, count);
    }

    #[test]
    fn test_init_config_writes_a_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let value = execute_init_config(Some(&path)).unwrap();
        assert_eq!(value["status"], "created");
        assert!(path.exists());

        let manager = ConfigManager::load_from(Some(&path)).unwrap();
        assert_eq!(manager.config().api.bind_addr, "127.0.0.1:8787");
    }

    #[test]
    fn test_cell_text_flattens_arrays() {
        let value = serde_json::json!(["a", "b", 3]);
        assert_eq!(cell_text(&value), "a, b, 3");
        assert_eq!(cell_text(&serde_json::Value::Null), "-");
    }
}
