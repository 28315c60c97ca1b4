//! Observability event bus, grounded on broadcast-plus-pluggable-sinks `EventHub`. Every
//! request-plane component that completes or fails a unit of work emits one [`Event`]; `tracing` is
//! the default (and, for now, only) sink — `add_sink` exists so a future durable sink (e.g.
//! `internal_events` table) can subscribe without the emitting call sites changing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Completion(CompletionEvent),
    Discovery(DiscoveryEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub at: SystemTime,
    pub trace_id: String,
    pub user_id: i64,
    pub model: String,
    pub streamed: bool,
    pub outcome: String,
    pub error_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    pub at: SystemTime,
    pub service: String,
    pub model_count: usize,
    pub ok: bool,
}

pub trait EventSink: Send + Sync {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Logs every event at `info` level; the default sink so emitted events are never silently dropped
/// even with no durable sink configured.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(?event, "event");
        })
    }
}

struct Inner {
    tx: broadcast::Sender<Event>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

#[derive(Clone)]
pub struct EventHub {
    inner: Arc<Inner>,
}

impl EventHub {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            inner: Arc::new(Inner {
                tx,
                sinks: RwLock::new(vec![Arc::new(TracingSink) as Arc<dyn EventSink>]),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.tx.subscribe()
    }

    pub async fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.sinks.write().await.push(sink);
    }

    pub async fn emit(&self, event: Event) {
        let _ = self.inner.tx.send(event.clone());
        let sinks = self.inner.sinks.read().await.clone();
        for sink in sinks {
            let event_ref = event.clone();
            tokio::spawn(async move {
                sink.write(&event_ref).await;
            });
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let hub = EventHub::default();
        let mut rx = hub.subscribe();
        hub.emit(Event::Discovery(DiscoveryEvent {
            at: SystemTime::now(),
            service: "svc".to_string(),
            model_count: 3,
            ok: true,
        }))
        .await;
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, Event::Discovery(d) if d.service == "svc"));
    }
}
