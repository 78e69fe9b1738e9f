use std::future::Future;
use std::time::Duration;

use tether_client::{PushClient, PushClientBuilder, PushConfig, PushEvent, PushEvents};
use tokio::time::Instant;

const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Open a push connection and print each message as one JSON line on
/// stdout.  Returns after Ctrl-C once the connection has closed.
pub async fn run(config: PushConfig) -> anyhow::Result<()> {
    let (client, events) = PushClientBuilder::from_config(config).build()?;
    client.open();
    listen(client, events, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
        }
    })
    .await
}

/// Event loop: runs until `shutdown` resolves and the close completes (or
/// `CLOSE_GRACE` runs out), or until the event stream ends.
async fn listen(
    client: PushClient,
    mut events: PushEvents,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    tokio::pin!(shutdown);
    let mut closing = false;
    let mut grace_deadline = Instant::now();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PushEvent::Open) => tracing::info!("connected"),
                Some(PushEvent::Message(msg)) => println!("{msg}"),
                Some(PushEvent::Error(e)) => tracing::warn!(error = %e, code = ?e.code(), "push error"),
                Some(PushEvent::Close) if closing => break,
                Some(PushEvent::Close) => tracing::warn!("disconnected"),
                None => break,
            },
            _ = &mut shutdown, if !closing => {
                tracing::info!("received SIGINT, closing");
                closing = true;
                grace_deadline = Instant::now() + CLOSE_GRACE;
                client.close();
            }
            // Nothing was connected, or the server never answered the close.
            _ = tokio::time::sleep_until(grace_deadline), if closing => break,
        }
    }

    tracing::info!("listener exiting");
    Ok(())
}
