use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the storefront services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartItemAdded {
        product_id: Uuid,
        quantity: i32,
    },
    CartItemUpdated {
        product_id: Uuid,
        quantity: i32,
    },
    CartItemRemoved {
        product_id: Uuid,
    },
    CartCleared {
        items_removed: u64,
    },
    CartMerged {
        customer_id: Uuid,
        items_merged: u64,
    },

    // Catalog events
    ProductCreated(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Payment events
    PaymentAuthorized(Uuid),
    PaymentPending(Uuid),
}

/// Cloneable handle for publishing events onto the processing channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failures to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (but otherwise ignoring) channel failures.
    /// Used where event delivery must never fail the business operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(?event, "Event delivery failed: {}", e);
        }
    }
}

/// Consumes events from the channel until all senders are dropped.
///
/// Observability sink only: downstream integrations (webhooks, analytics)
/// subscribe here without touching the request path.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(%order_id, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "Order status changed");
            }
            Event::PaymentAuthorized(order_id) => {
                info!(%order_id, "Payment authorized");
            }
            Event::PaymentPending(order_id) => {
                info!(%order_id, "Payment awaiting settlement");
            }
            other => {
                info!(event = ?other, "Event received");
            }
        }
    }

    info!("Event processing loop stopped");
}
