//! One-shot REST commands: push submission and channel membership.

use serde_json::Value;
use tether_client::{PushClient, PushClientBuilder, PushConfig};

fn client(config: PushConfig) -> anyhow::Result<PushClient> {
    let (client, _events) = PushClientBuilder::from_config(config).build()?;
    Ok(client)
}

fn print(body: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}

pub async fn push(config: PushConfig, options: &str) -> anyhow::Result<()> {
    let options: Value =
        serde_json::from_str(options).map_err(|e| anyhow::anyhow!("push options are not JSON: {e}"))?;
    if !options.is_object() {
        anyhow::bail!("push options must be a JSON object");
    }
    let body = client(config)?.send_push(options).await?;
    print(&body)
}

pub async fn subscribe(config: PushConfig, channels: Vec<String>) -> anyhow::Result<()> {
    let body = client(config)?.subscribe_channels(channels).await?;
    print(&body)
}

pub async fn unsubscribe(config: PushConfig, channels: Vec<String>) -> anyhow::Result<()> {
    let body = client(config)?.unsubscribe_channels(channels).await?;
    print(&body)
}
