mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ConfigCommand};
use tether_client::Installation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    match cli.command {
        Command::Listen => {
            let (config, config_path) = cli::load_config()?;
            tracing::debug!(config = %config_path, "loaded config");
            cli::listen::run(config).await
        }
        Command::Push { options } => {
            let (config, _config_path) = cli::load_config()?;
            cli::channels::push(config, &options).await
        }
        Command::Subscribe { channels } => {
            let (config, _config_path) = cli::load_config()?;
            cli::channels::subscribe(config, channels).await
        }
        Command::Unsubscribe { channels } => {
            let (config, _config_path) = cli::load_config()?;
            cli::channels::unsubscribe(config, channels).await
        }
        Command::GenId => {
            println!("{}", Installation::generate_id());
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _config_path) = cli::load_config()?;
            cli::config::show(&config);
            Ok(())
        }
    }
}

/// Compact stderr tracing, so stdout carries only command output.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
