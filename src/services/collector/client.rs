use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CollectorConfig;
use crate::kernel::transport::Transport;

/// Batching HTTP transport for the events collector.
///
/// `send` only buffers. A batch goes out on `flush()` or once `max_batch`
/// events are waiting, as a JSON array on a spawned task. Upload failures are
/// logged and the batch is dropped.
#[derive(Clone)]
pub struct CollectorClient {
    client: Client,
    endpoint: String,
    max_batch: usize,
    buffer: Arc<Mutex<Vec<Value>>>,
}

impl CollectorClient {
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_default(),
            endpoint: format!(
                "{}/events/v2?access_token={}",
                config.base_url.trim_end_matches('/'),
                config.access_token
            ),
            max_batch: config.max_batch.max(1),
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn take_batch(&self) -> Vec<Value> {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(|p| p.into_inner()))
    }

    pub async fn upload(&self, batch: Vec<Value>) -> Result<()> {
        let count = batch.len();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&batch)
            .send()
            .await
            .context("Collector request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Collector rejected {} events: {}", count, response.status()));
        }
        debug!("Uploaded {} events", count);
        Ok(())
    }

    fn dispatch(&self, batch: Vec<Value>) {
        if batch.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let this = self.clone();
                handle.spawn(async move {
                    if let Err(e) = this.upload(batch).await {
                        warn!("Telemetry upload dropped: {:#}", e);
                    }
                });
            }
            Err(_) => warn!("No async runtime; dropping {} telemetry events", batch.len()),
        }
    }
}

impl Transport for CollectorClient {
    fn send(&self, event_name: &str, mut payload: Map<String, Value>) {
        payload
            .entry("event")
            .or_insert_with(|| Value::String(event_name.to_string()));

        let full = {
            let mut buffer = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
            buffer.push(Value::Object(payload));
            buffer.len() >= self.max_batch
        };
        if full {
            let batch = self.take_batch();
            self.dispatch(batch);
        }
    }

    fn flush(&self) {
        let batch = self.take_batch();
        self.dispatch(batch);
    }
}
