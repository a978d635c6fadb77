//! Catalog change events.
//!
//! A single subject carries tiny payloads whose body is the literal byte
//! string `update` or `reset`. The bus is an in-process broadcast channel;
//! the payload stays raw bytes end to end so the wire contract is the same
//! one an external broker would carry, and unknown payloads are tolerated
//! on the subscriber side.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const PUBLISH_ATTEMPTS: u32 = 5;
const PUBLISH_BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const PUBLISH_BACKOFF_CEILING: Duration = Duration::from_secs(2);

/// A catalog change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// New comics were added; indexes should rebuild.
    Update,
    /// The catalog was dropped; indexes should clear.
    Reset,
}

impl Event {
    /// The wire form of the event.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Event::Update => b"update",
            Event::Reset => b"reset",
        }
    }

    /// Parse a payload back into an event. Anything that is not one of the
    /// two literals is `None`.
    pub fn parse(payload: &[u8]) -> Option<Event> {
        match payload {
            b"update" => Some(Event::Update),
            b"reset" => Some(Event::Reset),
            _ => None,
        }
    }
}

/// Errors for event publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no active subscribers after {attempts} attempts")]
    NoSubscribers { attempts: u32 },
}

/// Consumer side of the bus.
#[async_trait]
pub trait EventHandler: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn handle_event(&self, event: Event) -> Result<(), Self::Error>;
}

/// In-process pub/sub bus for catalog change events.
pub struct EventBus {
    subject: String,
    sender: broadcast::Sender<Vec<u8>>,
}

impl EventBus {
    pub fn new(subject: &str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            subject: subject.to_string(),
            sender,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// A publisher handle for this bus.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            subject: self.subject.clone(),
            sender: self.sender.clone(),
        }
    }

    /// Spawn the subscriber task: every payload received on the subject is
    /// parsed and handed to `handler`. Handler errors are logged, never
    /// fatal. A lagged receiver triggers one extra `Update` delivery, which
    /// is harmless because index rebuilds are idempotent.
    pub fn subscribe<H>(
        &self,
        handler: Arc<H>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()>
    where
        H: EventHandler + 'static,
    {
        let mut receiver = self.sender.subscribe();
        let subject = self.subject.clone();

        tokio::spawn(async move {
            debug!(subject = %subject, "event subscriber started");
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!(subject = %subject, "event subscriber stopped");
                        break;
                    }
                    message = receiver.recv() => match message {
                        Ok(payload) => match Event::parse(&payload) {
                            Some(event) => {
                                if let Err(e) = handler.handle_event(event).await {
                                    error!(subject = %subject, error = %e, "failed to handle event");
                                }
                            }
                            None => {
                                warn!(
                                    subject = %subject,
                                    payload = %String::from_utf8_lossy(&payload),
                                    "unknown event payload"
                                );
                            }
                        },
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(subject = %subject, skipped, "event subscriber lagged, forcing a rebuild");
                            if let Err(e) = handler.handle_event(Event::Update).await {
                                error!(subject = %subject, error = %e, "failed to handle event");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!(subject = %subject, "event bus closed");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Subscribe to the raw payload stream without the parsing layer.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<Vec<u8>> {
        self.sender.subscribe()
    }
}

/// Publisher handle. Publishing is at-least-once: if no subscriber is
/// attached yet, the send is retried with exponential backoff up to a
/// bounded number of attempts before giving up.
#[derive(Clone)]
pub struct EventPublisher {
    subject: String,
    sender: broadcast::Sender<Vec<u8>>,
}

impl EventPublisher {
    pub async fn publish(&self, event: Event) -> Result<(), PublishError> {
        let payload = event.as_bytes().to_vec();
        let mut backoff = PUBLISH_BACKOFF_INITIAL;

        for attempt in 1..=PUBLISH_ATTEMPTS {
            match self.sender.send(payload.clone()) {
                Ok(_) => {
                    debug!(subject = %self.subject, event = ?event, "event published");
                    return Ok(());
                }
                Err(_) => {
                    if attempt == PUBLISH_ATTEMPTS {
                        break;
                    }
                    warn!(
                        subject = %self.subject,
                        attempt,
                        "no event subscribers, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(PUBLISH_BACKOFF_CEILING);
                }
            }
        }

        Err(PublishError::NoSubscribers {
            attempts: PUBLISH_ATTEMPTS,
        })
    }
}
