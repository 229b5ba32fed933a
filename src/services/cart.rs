use crate::{
    entities::{cart_item, product, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Identity a cart belongs to: an authenticated customer or an anonymous
/// session token minted by the HTTP layer. Every cart operation takes the
/// owner explicitly; there is no ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    Customer(Uuid),
    Anonymous(String),
}

impl CartOwner {
    pub(crate) fn condition(&self) -> Condition {
        match self {
            CartOwner::Customer(id) => {
                Condition::all().add(cart_item::Column::CustomerId.eq(*id))
            }
            CartOwner::Anonymous(token) => {
                Condition::all().add(cart_item::Column::SessionToken.eq(token.clone()))
            }
        }
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartOwner::Customer(id) => write!(f, "customer:{}", id),
            CartOwner::Anonymous(token) => write!(f, "session:{}", token),
        }
    }
}

/// A cart line joined with its product and resolved pricing.
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub stock: i32,
}

/// Full cart view returned to the storefront.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Decimal,
    pub item_count: i64,
}

/// Persistent shopping-cart store keyed by owner identity.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Loads the owner's cart lines in insertion order, joined with current
    /// product data. Lines whose product has been deleted are skipped.
    pub async fn load_lines(
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

    /// Returns the owner's cart with resolved prices and totals.
    /// An empty cart yields zero totals, never an error.
    pub async fn get_cart(&self, owner: &CartOwner) -> Result<CartView, ServiceError> {
        let lines = self.load_lines(owner).await?;

        let items: Vec<CartLine> = lines
            .into_iter()
            .map(|(item, product)| {
                let unit_price = pricing::product_price(&product);
                CartLine {
                    product_id: product.id,
                    product_name: product.name,
                    quantity: item.quantity,
                    unit_price,
                    line_total: unit_price * Decimal::from(item.quantity),
                    stock: product.stock,
                }
            })
            .collect();

        let total = items.iter().map(|line| line.line_total).sum();
        let item_count = items.iter().map(|line| i64::from(line.quantity)).sum();

        Ok(CartView {
            items,
            total,
            item_count,
        })
    }

    /// Adds a product to the cart, merging with an existing line for the
    /// same product. The merged quantity is bounded by current stock.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(product_id)
            .filter(product::Column::Active.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found or inactive", product_id))
            })?;

        let existing = CartItem::find()
            .filter(owner.condition())
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let item = match existing {
            Some(item) => {
                let new_quantity = item.quantity + quantity;
                ensure_stock(&product, new_quantity)?;

                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(new_quantity);
                item.updated_at = Set(Utc::now());
                item.update(&txn).await?
            }
            None => {
                ensure_stock(&product, quantity)?;
                new_item(owner, product_id, quantity).insert(&txn).await?
            }
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                product_id,
                quantity,
            })
            .await;

        info!(
            "Added to cart {}: product {} x{}",
            owner, product_id, quantity
        );
        Ok(item)
    }

    /// Sets the quantity of an existing cart line, bounded by stock.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn update_item_quantity(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let item = self.find_item(&*self.db, owner, product_id).await?;

        let product = item
            .find_related(Product)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        ensure_stock(&product, quantity)?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        let item = item.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                product_id,
                quantity,
            })
            .await;

        Ok(item)
    }

    /// Removes a cart line.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let item = self.find_item(&*self.db, owner, product_id).await?;
        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved { product_id })
            .await;

        Ok(())
    }

    /// Deletes every line the owner holds; returns the number removed.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn clear_cart(&self, owner: &CartOwner) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(owner.condition())
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared {
                items_removed: result.rows_affected,
            })
            .await;

        info!("Cleared cart {}: {} items", owner, result.rows_affected);
        Ok(result.rows_affected)
    }

    /// Cart total at resolved unit prices. Zero for an empty cart.
    pub async fn cart_total(&self, owner: &CartOwner) -> Result<Decimal, ServiceError> {
        Ok(self.get_cart(owner).await?.total)
    }

    /// Sum of quantities across all lines. Zero for an empty cart.
    pub async fn item_count(&self, owner: &CartOwner) -> Result<i64, ServiceError> {
        Ok(self.get_cart(owner).await?.item_count)
    }

    /// Folds an anonymous cart into a customer's cart after login.
    ///
    /// For products the customer already holds, quantities are summed and
    /// capped at current stock (the excess is dropped, matching storefront
    /// behavior); otherwise the anonymous line is re-owned. Returns the
    /// number of lines merged. A token with no lines is a no-op returning 0,
    /// so the login hook may fire more than once.
    #[instrument(skip(self))]
    pub async fn merge_anonymous_into_customer(
        &self,
        session_token: &str,
        customer_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;

        let anonymous_owner = CartOwner::Anonymous(session_token.to_string());
        let anonymous_items = CartItem::find()
            .filter(anonymous_owner.condition())
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&txn)
            .await?;

        if anonymous_items.is_empty() {
            return Ok(0);
        }

        let mut merged = 0u64;

        for anonymous_item in anonymous_items {
            let existing = CartItem::find()
                .filter(cart_item::Column::CustomerId.eq(customer_id))
                .filter(cart_item::Column::ProductId.eq(anonymous_item.product_id))
                .one(&txn)
                .await?;

            match existing {
                Some(customer_item) => {
                    let product = customer_item.find_related(Product).one(&txn).await?;
                    let stock = product.map(|p| p.stock).unwrap_or(0);

                    let combined =
                        (customer_item.quantity + anonymous_item.quantity).min(stock.max(0));

                    let mut customer_item: cart_item::ActiveModel = customer_item.into();
                    customer_item.quantity = Set(combined);
                    customer_item.updated_at = Set(Utc::now());
                    customer_item.update(&txn).await?;

                    anonymous_item.delete(&txn).await?;
                }
                None => {
                    let mut item: cart_item::ActiveModel = anonymous_item.into();
                    item.customer_id = Set(Some(customer_id));
                    item.session_token = Set(None);
                    item.updated_at = Set(Utc::now());
                    item.update(&txn).await?;
                }
            }

            merged += 1;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartMerged {
                customer_id,
                items_merged: merged,
            })
            .await;

        info!(
            "Merged {} anonymous cart lines into customer {}",
            merged, customer_id
        );
        Ok(merged)
    }

    async fn find_item(
        &self,
        conn: &impl ConnectionTrait,
        owner: &CartOwner,
        product_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        CartItem::find()
            .filter(owner.condition())
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not in the cart", product_id))
            })
    }
}

fn ensure_stock(product: &product::Model, requested: i32) -> Result<(), ServiceError> {
    if requested > product.stock {
        return Err(ServiceError::InsufficientStock(format!(
            "{}: {} available",
            product.name, product.stock
        )));
    }
    Ok(())
}

fn new_item(owner: &CartOwner, product_id: Uuid, quantity: i32) -> cart_item::ActiveModel {
    let now = Utc::now();
    let (customer_id, session_token) = match owner {
        CartOwner::Customer(id) => (Some(*id), None),
        CartOwner::Anonymous(token) => (None, Some(token.clone())),
    };

    cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        session_token: Set(session_token),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: Set(now),
        updated_at: Set(now),
    }
}
