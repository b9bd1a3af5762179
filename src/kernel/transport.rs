use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Where finished events go. Fire-and-forget: the kernel never learns whether a
/// send succeeded, and never retries.
pub trait Transport: Send + Sync {
    fn send(&self, event_name: &str, payload: Map<String, Value>);

    /// Hint to push anything buffered now.
    fn flush(&self);
}

/// Writes each event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTransport;

impl Transport for TracingTransport {
    fn send(&self, event_name: &str, payload: Map<String, Value>) {
        let body = Value::Object(payload);
        info!(event = event_name, "{}", body);
    }

    fn flush(&self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEvent {
    pub name: String,
    pub payload: Map<String, Value>,
}

/// Shared in-memory sink. Clones observe the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<SentEvent>>>,
    flushes: Arc<AtomicUsize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEvent> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.sent().iter().filter(|e| e.name == name).count()
    }

    /// Payloads of every event sent under `name`, in send order.
    pub fn payloads(&self, name: &str) -> Vec<Map<String, Value>> {
        self.sent()
            .into_iter()
            .filter(|e| e.name == name)
            .map(|e| e.payload)
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, event_name: &str, payload: Map<String, Value>) {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(SentEvent {
                name: event_name.to_string(),
                payload,
            });
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("event".to_string(), Value::String("navigation.depart".to_string()));
        map
    }

    #[test]
    fn tracing_transport_logs_without_buffering() {
        let transport = TracingTransport;
        transport.send("navigation.depart", payload());
        transport.flush();
    }

    #[test]
    fn memory_transport_clones_share_one_buffer() {
        let transport = MemoryTransport::new();
        let observer = transport.clone();
        transport.send("navigation.depart", payload());
        transport.flush();

        assert_eq!(observer.names(), vec!["navigation.depart".to_string()]);
        assert_eq!(observer.payloads("navigation.depart")[0]["event"], Value::from("navigation.depart"));
        assert_eq!(observer.flush_count(), 1);
    }
}
