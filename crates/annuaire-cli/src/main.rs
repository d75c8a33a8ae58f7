//! `annuaire` - scrape the Ameli provider directory into a local cache.

use anyhow::{bail, Context, Result};
use annuaire_core::{AppConfig, CityName, ProfessionId};
use annuaire_db::{cities, providers, Database};
use annuaire_scraper::{ScrapeOrchestrator, ScrapeOutcome};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "annuaire")]
#[command(version, about = "Cache healthcare providers from the Ameli directory, by city")]
struct Cli {
    /// SQLite cache file (overrides config and ANNUAIRE_DATABASE_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch providers for a city and store them
    Scrape {
        /// City name, matched exactly against the cache
        city: String,

        /// Profession code (37 = general practitioner)
        #[arg(long)]
        profession: Option<u32>,
    },

    /// List cached cities
    Cities,

    /// List stored providers for a cached city
    Providers {
        /// City name, matched exactly against the cache
        city: String,
    },
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,annuaire=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env_overrides();
    if let Some(db) = &cli.db {
        config.storage.database_path = Some(db.clone());
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting annuaire v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let db_path = config.database_path()?;
    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", db_path.display()))?;

    let result = run(cli.command, &config, &db).await;
    db.close().await;
    result
}

async fn run(command: Command, config: &AppConfig, db: &Database) -> Result<()> {
    db.run_migrations()
        .await
        .context("failed to prepare cache schema")?;

    match command {
        Command::Scrape { city, profession } => {
            let city = CityName::new(&city)?;
            let profession =
                ProfessionId::new(profession.unwrap_or(config.scraping.default_profession_id))?;
            scrape(config, db, &city, profession).await
        }
        Command::Cities => list_cities(db).await,
        Command::Providers { city } => list_providers(db, &CityName::new(&city)?).await,
    }
}

async fn scrape(
    config: &AppConfig,
    db: &Database,
    city: &CityName,
    profession: ProfessionId,
) -> Result<()> {
    let orchestrator = ScrapeOrchestrator::from_config(Arc::new(db.clone()), config)?;

    match orchestrator.run(city, profession).await {
        ScrapeOutcome::Saved {
            city_id,
            providers,
            skipped,
        } => {
            println!("{city}: saved {providers} providers (city id {city_id})");
            if skipped > 0 {
                println!("{skipped} malformed records were skipped");
            }
        }
        ScrapeOutcome::CityNotResolved => println!("{city}: no coordinates found, nothing saved"),
        ScrapeOutcome::SearchUnavailable { city_id } => {
            println!("{city}: directory search unavailable (city id {city_id} cached)");
        }
        ScrapeOutcome::NoData { city_id } => {
            println!("{city}: no provider data returned (city id {city_id} cached)");
        }
        ScrapeOutcome::Aborted { reason } => bail!("scrape for {city} aborted: {reason}"),
    }
    Ok(())
}

async fn list_cities(db: &Database) -> Result<()> {
    let cached = cities::list(db.pool()).await?;
    if cached.is_empty() {
        println!("No cities cached yet");
        return Ok(());
    }

    for city in cached {
        let count = providers::count_by_city(db.pool(), city.id).await?;
        println!(
            "{:>5}  {:<30} ({:.4}, {:.4})  {} providers",
            city.id, city.name, city.center_lat, city.center_lng, count
        );
    }
    Ok(())
}

async fn list_providers(db: &Database, city: &CityName) -> Result<()> {
    let Some(cached) = cities::find_by_name(db.pool(), city.as_str()).await? else {
        println!("{city} is not cached; run `annuaire scrape \"{city}\"` first");
        return Ok(());
    };

    for provider in providers::list_by_city(db.pool(), cached.id).await? {
        let p = provider.fields;
        let field = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        println!(
            "{} {} | {} | {} {} | {} | vitale: {}",
            field(p.last_name),
            field(p.first_name),
            field(p.specialty),
            field(p.address),
            field(p.city),
            field(p.phone_number),
            if p.vitale_card { "yes" } else { "no" }
        );
    }
    Ok(())
}
