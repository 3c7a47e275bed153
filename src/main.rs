//! Lexrag CLI entry point.

use anyhow::Result;
use clap::Parser;
use lexrag::cli::{commands, Cli, Commands};
use lexrag::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lexrag={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Ask {
            question,
            retrieval,
            template,
            template_file,
            json,
        } => {
            commands::run_ask(
                question,
                retrieval,
                template.clone(),
                template_file.clone(),
                *json,
                settings,
            )
            .await?;
        }

        Commands::Search {
            query,
            retrieval,
            json,
        } => {
            commands::run_search(query, retrieval, *json, settings).await?;
        }

        Commands::Ingest { paths } => {
            commands::run_ingest(paths, settings).await?;
        }

        Commands::Templates { show } => {
            commands::run_templates(show.as_deref(), &settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
