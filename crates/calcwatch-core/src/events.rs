use std::pin::Pin;

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use calcwatch_common::{Job, ServerRecord};

/// State changes pushed to whatever surface renders the client.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    JobAdded(Job),
    JobUpdated(Job),
    /// A submission that never became a job.
    JobRejected { expression: String, message: String },
    JobsCleared,
    JobsReplaced(Vec<Job>),
    HealthCleared,
    ServerObserved(ServerRecord),
    StaleServersEvicted(Vec<ServerRecord>),
}

pub type EventStream = Pin<Box<dyn Stream<Item = DisplayEvent> + Send>>;

/// Fan-out of display events. Emitting with no subscribers is fine; slow
/// subscribers skip what they lagged behind on.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DisplayEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: DisplayEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> EventStream {
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(|msg| match msg {
            Ok(ev) => Some(ev),
            Err(e) => {
                tracing::warn!(error=%e, "display subscriber fell behind");
                None
            }
        });
        Box::pin(stream)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
