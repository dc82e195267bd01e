//! SportMate session bridge
//!
#![doc = "Main entry point for the bridge service."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sportmate::cli::{Cli, Commands};
use sportmate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting bridge service");
            sportmate::server::serve(config).await?;
            Ok(())
        }
        Commands::Check => {
            println!("Configuration OK");
            println!("  provider: {}", config.provider.provider_type);
            println!("  model: {}", config.provider.gemini.model);
            println!("  backend: {}", config.backend.base_url);
            println!(
                "  server: {}:{}",
                config.server.host, config.server.port
            );
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "sportmate=debug"
    } else {
        "sportmate=info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
