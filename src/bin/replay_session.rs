use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nav_telemetry::kernel::event::Event;
use nav_telemetry::kernel::route::Route;
use nav_telemetry::kernel::transport::{TracingTransport, Transport};
use nav_telemetry::services::collector::client::CollectorClient;
use nav_telemetry::{TelemetryConfig, TelemetryReactor};

/// Replays a recorded session: one JSON `Event` per line on stdin.
/// The first event that carries a route seeds the session. EOF terminates it.
#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = TelemetryConfig::load()?;

    // 2. Read the whole script; a replay is short.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events = Vec::new();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&line) {
            Ok(event) => events.push(event),
            Err(e) => tracing::warn!("Line {} skipped: {}", line_no, e),
        }
    }
    tracing::info!("Loaded {} events", events.len());

    let route = events
        .iter()
        .find_map(|e| match e {
            Event::Progress(p) => Some(p.route.clone()),
            Event::Reroute { route, .. } => Some(route.clone()),
            _ => None,
        })
        .unwrap_or_else(|| Route::new("unknown", Vec::new(), 0.0, 0.0));

    // 3. Setup Reactor + Channel
    let transport: Arc<dyn Transport> = match &config.collector {
        Some(collector) => Arc::new(CollectorClient::new(collector)),
        None => Arc::new(TracingTransport),
    };
    let mut reactor = TelemetryReactor::new(config, route, transport);
    let (tx, rx) = mpsc::channel(events.len().max(1));

    tokio::spawn(async move {
        for event in events {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    // 4. Run until the script is exhausted
    let snapshot = reactor.run(rx, CancellationToken::new()).await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
