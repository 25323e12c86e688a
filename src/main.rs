// powctl - Entry point
// Principle: Inspect and exercise the controller without running a node

use clap::Parser;
use pow_controller::cli::config::{load_params, SimulationConfig};
use pow_controller::cli::runner::run_simulation;
use pow_controller::cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_filter = if cli.verbose {
        "debug"
    } else {
        &cli.log_level
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter)),
        )
        .init();

    match cli.command {
        Commands::Params(cmd) => {
            let params = load_params(cmd.params.as_deref()).map_err(|e| {
                error!("Configuration error: {}", e);
                anyhow::anyhow!("Configuration error: {}", e)
            })?;

            match cmd.output {
                Some(path) => {
                    params.to_file(&path)?;
                    info!("Parameters written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&params)?),
            }
        }

        Commands::Simulate(cmd) => {
            let config = SimulationConfig::from_simulate_cmd(&cmd).map_err(|e| {
                error!("Configuration error: {}", e);
                anyhow::anyhow!("Configuration error: {}", e)
            })?;

            match run_simulation(config).await {
                Ok(summary) => println!("{}", summary),
                Err(e) => {
                    error!("Simulation error: {}", e);
                    return Err(anyhow::anyhow!("Simulation error: {}", e));
                }
            }
        }
    }

    Ok(())
}
