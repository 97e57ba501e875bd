//! Long-polling demo over the in-memory bus.
//!
//! Run with: cargo run -p poll-demo
//!
//! Set `POLL_DEMO_BUS_CONFIG` to a JSON `BusConfig` to tune the bus,
//! e.g. `{"poll_timeout_ms": 500}`.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use signal_fabric_connection::{Command, Connection, ConnectionConfig};
use signal_fabric_core::{BusConfig, InMemoryBus};
use signal_fabric_transport::{GroupsToken, PollFrame};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const BASE_SIGNAL: &str = "chat";
const STEP: Duration = Duration::from_millis(100);

fn bus_config() -> anyhow::Result<BusConfig> {
    match std::env::var("POLL_DEMO_BUS_CONFIG") {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(_) => Ok(BusConfig::default().with_poll_timeout(Duration::from_secs(2))),
    }
}

async fn poll_loop(
    conn: Arc<Connection<InMemoryBus>>,
    mut cursor: u64,
    cancel: CancellationToken,
) -> anyhow::Result<Option<String>> {
    loop {
        let response = conn.receive_since(cursor, &cancel).await?;
        let frame = PollFrame::from(response);
        tracing::info!(connection_id = conn.id(), frame = %serde_json::to_string(&frame)?, "poll");

        cursor = frame.cursor().unwrap_or(cursor);
        if frame.disconnect || frame.aborted {
            return Ok(frame.groups_token);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bus = Arc::new(InMemoryBus::with_config(bus_config()?));
    let config = ConnectionConfig::default();

    let alice_id = Uuid::new_v4().to_string();
    let alice = Arc::new(Connection::new(
        alice_id.clone(),
        BASE_SIGNAL,
        Arc::clone(&bus),
        &config,
    ));
    let bob = Connection::new(Uuid::new_v4().to_string(), BASE_SIGNAL, Arc::clone(&bus), &config);

    let cancel = CancellationToken::new();
    let poller = tokio::spawn(poll_loop(Arc::clone(&alice), bus.head(), cancel.clone()));

    alice.send_command(Command::add_to_group("lobby")).await?;
    tokio::time::sleep(STEP).await;

    bob.send("lobby", &json!({"from": "bob", "text": "lobby only"})).await?;
    tokio::time::sleep(STEP).await;

    bob.broadcast(&json!({"from": "bob", "text": "hello everyone"})).await?;
    tokio::time::sleep(STEP).await;

    alice.send_command(Command::Disconnect).await?;

    let token = tokio::select! {
        result = poller => result??,
        () = tokio::time::sleep(Duration::from_secs(10)) => {
            cancel.cancel();
            anyhow::bail!("poller did not observe disconnect");
        }
    };

    // A reconnect restores membership from the token.
    if let Some(token) = token {
        let resumed = Connection::new(alice_id, BASE_SIGNAL, Arc::clone(&bus), &config)
            .with_groups(GroupsToken::decode(&token)?);
        tracing::info!(groups = ?resumed.groups(), "resumed connection");
    }

    Ok(())
}
