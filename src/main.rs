use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

mod cli;

use cli::{Cli, Commands};
use edinet_yuho::edinet::generate_date_sequence;
use edinet_yuho::{setup, Config, Pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_logging(&config)?;
    config.validate()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing working directories");
            setup::initialize(&config).await?;
        }

        Commands::Fetch {
            from,
            to,
            listing_type,
        } => {
            let dates = generate_date_sequence(from, to)?;
            let listing_type = listing_type.unwrap_or(config.api.listing_type);

            info!(
                "Fetching securities reports for {} dates into {}",
                dates.len(),
                config.download_dir.display()
            );

            let pipeline = Pipeline::new(config).await?;
            let result = pipeline.run(&dates, listing_type).await;
            pipeline.ledger().close().await;

            match result {
                Ok(summary) => info!("Fetch finished: {}", summary),
                Err(e) => {
                    error!("Fetch aborted: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

/// Log to stderr and to `<log_dir>/edinet-yuho.log`
fn init_logging(config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "edinet_yuho=info");
    }

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Cannot create log directory: {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(&config.log_dir, "edinet-yuho.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    Ok(())
}
