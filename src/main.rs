//! Diabetes Risk - Main Entry Point
//!
//! Prediction server and registry tooling.

use clap::Parser;
use diabetes_risk::cli::{cmd_inspect, cmd_list, cmd_predict, cmd_register, cmd_serve, cmd_transition, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diabetes_risk=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, registry, model, stage, lazy_load } => {
            cmd_serve(&host, port, registry, model, stage, lazy_load).await?;
        }
        Commands::Predict { input, registry, model, stage } => {
            cmd_predict(&input, &registry, &model, &stage)?;
        }
        Commands::Register { artifact, registry, name, encoding, description, stage } => {
            cmd_register(&artifact, &registry, name.as_deref(), encoding.into(), &description, stage.as_deref())?;
        }
        Commands::Transition { name, version, stage, registry } => {
            cmd_transition(&registry, &name, version, &stage)?;
        }
        Commands::List { registry } => {
            cmd_list(&registry)?;
        }
        Commands::Inspect { artifact } => {
            cmd_inspect(&artifact)?;
        }
    }

    Ok(())
}
