pub mod channels;
pub mod config;
pub mod listen;

use clap::{Parser, Subcommand};
use tether_client::PushConfig;

/// Tether: persistent push connection client.
#[derive(Debug, Parser)]
#[command(name = "tether", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and print every pushed message as a JSON line until Ctrl-C.
    Listen,
    /// Submit a push notification through the REST API.
    Push {
        /// Push options as a JSON object, e.g. '{"data":{"alert":"hi"}}'.
        options: String,
    },
    /// Add this installation to one or more channels.
    Subscribe {
        #[arg(required = true)]
        channels: Vec<String>,
    },
    /// Remove this installation from one or more channels.
    Unsubscribe {
        #[arg(required = true)]
        channels: Vec<String>,
    },
    /// Print a freshly generated installation ID.
    GenId,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load settings from the path in `TETHER_CONFIG` (or `tether.toml` by
/// default), then apply the `TETHER_APP_ID`, `TETHER_APP_KEY` and
/// `TETHER_INSTALLATION_ID` overrides.  A missing file yields defaults.
pub fn load_config() -> anyhow::Result<(PushConfig, String)> {
    let config_path = std::env::var("TETHER_CONFIG").unwrap_or_else(|_| "tether.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        PushConfig::default()
    };

    Ok((apply_env(config, |k| std::env::var(k).ok()), config_path))
}

fn apply_env(mut config: PushConfig, var: impl Fn(&str) -> Option<String>) -> PushConfig {
    if let Some(v) = var("TETHER_APP_ID").filter(|v| !v.is_empty()) {
        config.app_id = v;
    }
    if let Some(v) = var("TETHER_APP_KEY").filter(|v| !v.is_empty()) {
        config.app_key = v;
    }
    if let Some(v) = var("TETHER_INSTALLATION_ID").filter(|v| !v.is_empty()) {
        config.installation.installation_id = v;
    }
    config
}
