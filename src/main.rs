use clap::{Parser, Subcommand};
use spider_choropleth::config::AppConfig;
use spider_choropleth::{server, Session};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate sightings per region and write the styled map layer and legend
    Aggregate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the styled map layer, legend and region lookup over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the legend for the configured palette
    Legend {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Aggregate { config } => {
            info!(config = ?config, "aggregating");
            let app_config = AppConfig::load_from_file(config)?;

            let session = Session::prepare(app_config).await?;
            session.write_outputs()?;

            info!(
                regions = session.summary.regions,
                unassigned = session.summary.unassigned(),
                "aggregation written"
            );
        }
        Commands::Serve { config } => {
            info!(config = ?config, "serving");
            let app_config = AppConfig::load_from_file(config)?;

            let session = Session::prepare(app_config).await?;
            server::start_server(session).await?;
        }
        Commands::Legend { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let classifier = app_config.classification.classifier()?;
            let legend = spider_choropleth::render::legend(&app_config.classification.title, &classifier);
            println!("{}", serde_json::to_string_pretty(&legend)?);
        }
    }

    Ok(())
}
