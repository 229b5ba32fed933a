use crate::entities::{order, order_item, payment};
use async_trait::async_trait;
use tracing::{info, instrument};

/// Outbound order-notification dispatcher.
///
/// Contract: implementations report success as `true` and failure as
/// `false`; they never panic or return errors into the caller. Checkout
/// treats every send as best-effort.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn send_order_confirmation(
        &self,
        order: &order::Model,
        items: &[order_item::Model],
        payment: &payment::Model,
    ) -> bool;

    async fn send_order_shipped(&self, order: &order::Model) -> bool;
}

/// Simulated e-mail dispatcher that writes the message to the log stream.
///
/// Stands in for the SMTP/template integration, which lives outside this
/// service.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl OrderNotifier for LoggingNotifier {
    #[instrument(skip(self, order, items, payment), fields(order_number = %order.order_number))]
    async fn send_order_confirmation(
        &self,
        order: &order::Model,
        items: &[order_item::Model],
        payment: &payment::Model,
    ) -> bool {
        info!(
            customer_id = %order.customer_id,
            items = items.len(),
            amount = %payment.amount,
            payment_status = ?payment.status,
            "Order confirmation e-mail dispatched"
        );
        true
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn send_order_shipped(&self, order: &order::Model) -> bool {
        info!(customer_id = %order.customer_id, "Order shipped e-mail dispatched");
        true
    }
}
