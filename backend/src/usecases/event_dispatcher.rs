use std::sync::Arc;

use crates::domain::{repositories::app_events::AppEventSink, value_objects::events::AppEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const EVENT_QUEUE_CAPACITY: usize = 256;

/// Non-blocking hand-off for side effects that must never fail the caller.
/// One background task drains the queue and feeds every sink in order.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<AppEvent>,
}

impl EventDispatcher {
    /// Must be called from within a tokio runtime.
    pub fn new(sinks: Vec<Arc<dyn AppEventSink + Send + Sync>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AppEvent>(EVENT_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    if let Err(error) = sink.handle(event.clone()).await {
                        warn!(
                            sink = sink.sink_name(),
                            event_type = event.event_type(),
                            user_id = %event.user_id(),
                            error = ?error,
                            "event_dispatcher: sink failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn try_dispatch(&self, event: AppEvent) {
        let event_type = event.event_type();
        match self.tx.try_send(event) {
            Ok(()) => debug!(event_type, "event_dispatcher: event queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event_type, "event_dispatcher: queue full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event_type, "event_dispatcher: queue closed; dropping event");
            }
        }
    }
}
