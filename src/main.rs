//! MLB metrics service
//!
//! Serves the HTTP API, or runs one-off player lookups and offline training.

use clap::{Parser, Subcommand};
use mlb_metrics::{
    api::{self, AppState},
    client::{MlbDataClient, StatsProvider},
    config::Config,
    ml::{FeatureSelector, ModelRegistry, ModelTrainerEvaluator, ModelType},
    types::RawRow,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mlb-metrics")]
#[command(about = "MLB player metrics API and swing-outcome models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Resolve a player name to an MLBAM id
    Lookup {
        last_name: String,
        first_name: String,
        /// Which of several same-named players to return
        #[arg(short, long, default_value = "0")]
        index: usize,
    },
    /// Train a model on a JSON file of Statcast rows and print the report
    Train {
        /// JSON array of pitch records
        #[arg(short, long)]
        input: String,
        #[arg(short, long, default_value = "logistic_regression")]
        model_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Lookup {
            last_name,
            first_name,
            index,
        } => lookup(config, &last_name, &first_name, index).await,
        Commands::Train { input, model_type } => train(config, &input, &model_type),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let provider = Arc::new(MlbDataClient::new(&config.providers)?);
    let trainer = ModelTrainerEvaluator::from_config(&config.model)?;
    let state = AppState::new(provider, Arc::new(ModelRegistry::new()))
        .with_trainer(trainer)
        .with_train_timeout(config.model.train_timeout_secs.map(Duration::from_secs));

    tracing::info!(
        "Starting MLB metrics API (stats={}, savant={})",
        config.providers.stats_api_url,
        config.providers.savant_url
    );
    api::start_server(Arc::new(state), &config.server.host, config.server.port).await?;
    Ok(())
}

async fn lookup(
    config: Config,
    last_name: &str,
    first_name: &str,
    index: usize,
) -> anyhow::Result<()> {
    let client = MlbDataClient::new(&config.providers)?;
    let player_id = client.player_id(last_name, first_name, index).await?;
    println!("{} {}: {}", first_name, last_name, player_id);
    Ok(())
}

fn train(config: Config, input: &str, model_type: &str) -> anyhow::Result<()> {
    let model_type: ModelType = model_type.parse()?;
    let raw = std::fs::read_to_string(input)?;
    let rows: Vec<RawRow> = serde_json::from_str(&raw)?;

    let table = FeatureSelector::default().select(&rows)?;
    tracing::info!("{} of {} rows usable for training", table.len(), rows.len());

    let trainer = ModelTrainerEvaluator::from_config(&config.model)?;
    let (_, report) = trainer.train(&table, model_type)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
