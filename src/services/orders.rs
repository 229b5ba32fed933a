use crate::{
    entities::{order, order_item, payment, Order, OrderItem, OrderStatus, Payment},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::OrderNotifier,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Order joined with its line items and payment record, as shown on the
/// confirmation and history views.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub payment: Option<payment::Model>,
}

/// Paginated order listing.
#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Read surface over persisted orders plus status administration.
/// Orders are immutable after checkout except for status transitions.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifier: Arc<dyn OrderNotifier>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        Self {
            db,
            event_sender,
            notifier,
        }
    }

    /// Fetches one of the customer's orders with items and payment.
    /// Another customer's order id yields NotFound, not Forbidden, so order
    /// ids cannot be probed.
    pub async fn get_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order
            .find_related(OrderItem)
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let payment = order.find_related(Payment).one(&*self.db).await?;

        Ok(OrderDetail {
            order,
            items,
            payment,
        })
    }

    /// Lists the customer's orders, newest first.
    pub async fn list_orders(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderPage, ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderPage {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Applies a status transition, enforcing the order lifecycle.
    ///
    /// Emits an OrderStatusChanged event and, on transition to shipped,
    /// dispatches the best-effort shipped notification.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = ?new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidOperation(format!(
                "cannot transition order from {:?} to {:?}",
                old_status, new_status
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: format!("{:?}", old_status).to_lowercase(),
                new_status: format!("{:?}", new_status).to_lowercase(),
            })
            .await;

        if new_status == OrderStatus::Shipped && !self.notifier.send_order_shipped(&updated).await {
            warn!(order_id = %order_id, "Order shipped notification failed");
        }

        info!(
            "Order {} status: {:?} -> {:?}",
            updated.order_number, old_status, new_status
        );
        Ok(updated)
    }
}
