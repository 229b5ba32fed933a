use crate::{
    entities::{product, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Read model over the product catalog, plus the single write the
/// storefront needs (product creation, used by seeding and the admin
/// surface). Stock mutation is checkout's job, not this service's.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fetches a product regardless of visibility.
    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Fetches a product that is visible to shoppers.
    pub async fn get_active_product(
        &self,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .filter(product::Column::Active.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found or inactive", product_id))
            })
    }

    /// Products highlighted on the storefront home page.
    pub async fn list_featured(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::Active.eq(true))
            .filter(product::Column::Featured.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            list_price: Set(input.list_price),
            promotional_price: Set(input.promotional_price),
            stock: Set(input.stock),
            active: Set(input.active),
            featured: Set(input.featured),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!("Created product: {} ({})", product.slug, product.id);
        Ok(product)
    }

    /// Idempotent variant of `create_product` used by the seed binary.
    pub async fn create_product_if_absent(
        &self,
        input: CreateProductInput,
    ) -> Result<Option<product::Model>, ServiceError> {
        let existing = Product::find()
            .filter(product::Column::Slug.eq(input.slug.clone()))
            .one(&*self.db)
            .await?;

        if existing.is_some() {
            return Ok(None);
        }

        Ok(Some(self.create_product(input).await?))
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub description: String,
    pub list_price: Decimal,
    pub promotional_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub featured: bool,
}

fn default_true() -> bool {
    true
}
