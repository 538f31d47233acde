use clap::Parser;
use idoc::Commands;
use idoc_core::{IdocConfig, IdocConfigBuilder};

#[derive(Parser)]
#[command(name = "idoc")]
#[command(about = "Save documents and warm the idoc cache from the command line", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, overriding IDOC_LOG and the config file (e.g. "debug")
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let mut config = IdocConfig::load()?;
    if let Some(filter) = cli.log {
        config = IdocConfigBuilder::from_config(config)
            .with_log_filter(filter)
            .build()?;
    }
    idoc_utils::init(&config.log_filter)
        .map_err(|e| eyre::eyre!("failed to initialise logging: {e}"))?;

    tracing::debug!(source = ?config.source, "configuration loaded");

    cli.command.execute(config).await
}
