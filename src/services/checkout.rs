use crate::{
    entities::{
        cart_item, order, order_item, payment, product, CartItem, Product,
        OrderStatus, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::OrderNotifier,
    services::{
        cart::CartOwner,
        payments::{self, PaymentDetails, PaymentOutcome},
        pricing, shipping,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Delivery information collected at checkout. Every field is required.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeliveryInfo {
    #[validate(length(min = 1, max = 255, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 2, max = 2, message = "state must be a 2-letter code"))]
    pub state: String,
    #[validate(length(min = 1, max = 9, message = "postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 8, max = 20, message = "phone is required"))]
    pub phone: String,
}

/// Everything persisted by a committed checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutReceipt {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub payment: payment::Model,
}

/// Converts a cart into a persisted order.
///
/// The commit step is a single database transaction: per-line stock
/// re-check-and-decrement under row locks, order/line-item/payment inserts,
/// and cart cleanup all stand or fall together. Payment processing happens
/// before the transaction and persists nothing on decline.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifier: Arc<dyn OrderNotifier>,
    max_retries: u32,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        notifier: Arc<dyn OrderNotifier>,
        max_retries: u32,
    ) -> Self {
        Self {
            db,
            event_sender,
            notifier,
            max_retries: max_retries.max(1),
        }
    }

    /// Standalone shipping sub-action: lets the storefront show the fee
    /// before delivery info is finalized. Persists nothing.
    pub fn quote_shipping(&self, postal_code: &str) -> Result<shipping::ShippingQuote, ServiceError> {
        shipping::quote(postal_code)
    }

    /// Places an order from the customer's cart.
    #[instrument(skip(self, delivery, payment_details), fields(customer_id = %customer_id))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        delivery: DeliveryInfo,
        payment_details: PaymentDetails,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let owner = CartOwner::Customer(customer_id);

        // Nothing below persists state until the commit transaction, so the
        // whole preamble is freely retryable by the shopper.
        let cart_lines = self.load_cart(&owner).await?;
        if cart_lines.is_empty() {
            return Err(ServiceError::InvalidOperation("cart is empty".to_string()));
        }

        delivery.validate()?;

        let quote = shipping::quote(&delivery.postal_code)?;

        let cart_total: Decimal = cart_lines
            .iter()
            .map(|(item, product)| {
                pricing::product_price(product) * Decimal::from(item.quantity)
            })
            .sum();
        let grand_total = cart_total + quote.fee;

        let outcome = payments::process(grand_total, &payment_details)?;
        if outcome.status == PaymentStatus::Declined {
            info!(
                transaction_id = %outcome.transaction_id,
                "Payment declined, checkout aborted"
            );
            return Err(ServiceError::PaymentFailed(outcome.message));
        }

        let receipt = self
            .commit_with_retry(&owner, customer_id, &delivery, quote.fee, &outcome)
            .await?;

        // Post-commit side effects are best-effort: a failure here must not
        // disturb the committed order.
        if !self
            .notifier
            .send_order_confirmation(&receipt.order, &receipt.items, &receipt.payment)
            .await
        {
            warn!(
                order_id = %receipt.order.id,
                "Order confirmation notification failed"
            );
        }

        self.event_sender
            .send_or_log(Event::OrderCreated(receipt.order.id))
            .await;
        self.event_sender
            .send_or_log(match receipt.payment.status {
                PaymentStatus::Authorized => Event::PaymentAuthorized(receipt.order.id),
                _ => Event::PaymentPending(receipt.order.id),
            })
            .await;

        info!(
            order_id = %receipt.order.id,
            order_number = %receipt.order.order_number,
            total = %(receipt.order.subtotal + receipt.order.shipping_fee),
            "Checkout committed"
        );
        Ok(receipt)
    }

    async fn load_cart(
        &self,
        owner: &CartOwner,
    ) -> Result<Vec<(cart_item::Model, product::Model)>, ServiceError> {
        let rows = CartItem::find()
            .filter(owner.condition())
            .find_also_related(Product)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|p| (item, p)))
            .collect())
    }

    /// Runs the commit transaction, retrying a bounded number of times when
    /// the database reports lock contention from concurrent checkouts.
    async fn commit_with_retry(
        &self,
        owner: &CartOwner,
        customer_id: Uuid,
        delivery: &DeliveryInfo,
        shipping_fee: Decimal,
        outcome: &PaymentOutcome,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .commit_order(owner, customer_id, delivery, shipping_fee, outcome)
                .await
            {
                Err(err) if is_transient_conflict(&err) => {
                    if attempt >= self.max_retries {
                        warn!(attempt, "Checkout transaction conflicted, giving up");
                        return Err(ServiceError::Conflict(
                            "checkout conflicted with concurrent orders, please retry"
                                .to_string(),
                        ));
                    }
                    warn!(attempt, "Checkout transaction conflicted, retrying");
                }
                result => return result,
            }
        }
    }

    async fn commit_order(
        &self,
        owner: &CartOwner,
        customer_id: Uuid,
        delivery: &DeliveryInfo,
        shipping_fee: Decimal,
        outcome: &PaymentOutcome,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        // Re-read the cart inside the transaction: it is the authoritative
        // snapshot the order is built from.
        let cart_lines = CartItem::find()
            .filter(owner.condition())
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&txn)
            .await?;

        if cart_lines.is_empty() {
            return Err(ServiceError::InvalidOperation("cart is empty".to_string()));
        }

        // Lock and verify every product before touching stock. The exclusive
        // row lock is held until commit/rollback, serializing concurrent
        // checkouts on the same product.
        let mut allocations: Vec<(product::Model, i32, Decimal)> =
            Vec::with_capacity(cart_lines.len());

        for line in &cart_lines {
            let product = Product::find_by_id(line.product_id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            if !product.active {
                return Err(ServiceError::InvalidOperation(format!(
                    "product no longer available: {}",
                    product.name
                )));
            }

            if product.stock < line.quantity {
                // Dropping the transaction rolls back any decrements already
                // applied in this loop.
                return Err(ServiceError::InsufficientStock(format!(
                    "{}: {} available",
                    product.name, product.stock
                )));
            }

            let unit_price = pricing::product_price(&product);
            allocations.push((product, line.quantity, unit_price));
        }

        let subtotal: Decimal = allocations
            .iter()
            .map(|(_, quantity, unit_price)| *unit_price * Decimal::from(*quantity))
            .sum();

        let order_id = Uuid::new_v4();
        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!(
                "QO-{}",
                &order_id.simple().to_string().to_uppercase()[..8]
            )),
            customer_id: Set(customer_id),
            status: Set(OrderStatus::Pending),
            subtotal: Set(subtotal),
            shipping_fee: Set(shipping_fee),
            address: Set(delivery.address.clone()),
            city: Set(delivery.city.clone()),
            state: Set(delivery.state.to_uppercase()),
            postal_code: Set(shipping::normalize_postal_code(&delivery.postal_code)?),
            phone: Set(delivery.phone.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let mut order_row = order_model.insert(&txn).await?;

        let mut items = Vec::with_capacity(allocations.len());
        for (product, quantity, unit_price) in allocations {
            let new_stock = product.stock - quantity;
            let product_name = product.name.clone();
            let product_id = product.id;

            let mut product_update: product::ActiveModel = product.into();
            product_update.stock = Set(new_stock);
            product_update.updated_at = Set(now);
            product_update.update(&txn).await?;

            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product_id),
                product_name: Set(product_name),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                created_at: Set(now),
            };
            items.push(item.insert(&txn).await?);
        }

        let payment_row = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            method: Set(outcome.method),
            status: Set(outcome.status),
            amount: Set(subtotal + shipping_fee),
            transaction_id: Set(outcome.transaction_id.clone()),
            confirmation_code: Set(outcome.confirmation_code.clone()),
            message: Set(outcome.message.clone()),
            card_last_four: Set(outcome.card_last_four.clone()),
            cardholder_name: Set(outcome.cardholder_name.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if outcome.status == PaymentStatus::Authorized {
            let mut transition: order::ActiveModel = order_row.into();
            transition.status = Set(OrderStatus::Processing);
            transition.updated_at = Set(Utc::now());
            order_row = transition.update(&txn).await?;
        }

        // Cart cleanup is part of the unit of work: a rolled-back checkout
        // leaves the cart intact for retry.
        CartItem::delete_many()
            .filter(owner.condition())
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(CheckoutReceipt {
            order: order_row,
            items,
            payment: payment_row,
        })
    }
}

/// Whether a database error looks like lock/serialization contention that a
/// fresh attempt may resolve.
fn is_transient_conflict(err: &ServiceError) -> bool {
    let ServiceError::DatabaseError(db_err) = err else {
        return false;
    };

    let text = db_err.to_string().to_lowercase();
    text.contains("deadlock")
        || text.contains("lock timeout")
        || text.contains("could not serialize")
        || text.contains("database is locked")
}
