// Shared by several integration-test binaries; not every binary uses
// every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use queops_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::product,
    events::{self, EventSender},
    handlers::AppServices,
    notifications::{LoggingNotifier, OrderNotifier},
    services::{
        catalog::CreateProductInput, CartService, CheckoutService, OrderService,
        ProductCatalogService,
    },
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

/// Test harness over an in-memory SQLite database with the full service
/// stack wired up. Each instance owns its own database.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub catalog: Arc<ProductCatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub event_sender: Arc<EventSender>,
    // Keeps the channel open so send() in services does not error.
    _event_rx: mpsc::Receiver<events::Event>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_notifier(Arc::new(LoggingNotifier)).await
    }

    /// Builds the stack around a custom notifier (used to exercise the
    /// best-effort notification contract).
    pub async fn with_notifier(notifier: Arc<dyn OrderNotifier>) -> Self {
        // A single connection keeps the whole test on one in-memory database.
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(5),
        };

        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));

        let catalog = Arc::new(ProductCatalogService::new(db.clone(), event_sender.clone()));
        let cart = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            notifier.clone(),
            3,
        ));
        let orders = Arc::new(OrderService::new(db.clone(), event_sender.clone(), notifier));

        Self {
            db,
            catalog,
            cart,
            checkout,
            orders,
            event_sender,
            _event_rx: event_rx,
        }
    }

    /// Builds the v1 API router over this context's services, for
    /// request-level tests.
    #[allow(dead_code)]
    pub fn router(&self) -> axum::Router {
        let state = Arc::new(AppState {
            db: self.db.clone(),
            config: test_config(),
            event_sender: (*self.event_sender).clone(),
            services: AppServices {
                catalog: self.catalog.clone(),
                cart: self.cart.clone(),
                checkout: self.checkout.clone(),
                orders: self.orders.clone(),
            },
        });

        axum::Router::new()
            .nest("/api/v1", queops_api::api_v1_routes())
            .with_state(state)
    }

    /// Seeds a product and returns the stored row.
    pub async fn seed_product(
        &self,
        name: &str,
        list_price: Decimal,
        promotional_price: Option<Decimal>,
        stock: i32,
    ) -> product::Model {
        let slug = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect::<String>();

        self.catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                slug,
                description: format!("{} (test fixture)", name),
                list_price,
                promotional_price,
                stock,
                active: true,
                featured: false,
            })
            .await
            .expect("failed to seed product")
    }

    /// Seeds a product that is not visible to shoppers.
    pub async fn seed_inactive_product(&self, name: &str, list_price: Decimal) -> product::Model {
        use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

        let model = self.seed_product(name, list_price, None, 10).await;
        let mut active = model.into_active_model();
        active.active = Set(false);
        active
            .update(&*self.db)
            .await
            .expect("failed to deactivate product")
    }

    /// Current stock of a product.
    pub async fn stock_of(&self, product_id: uuid::Uuid) -> i32 {
        use sea_orm::EntityTrait;

        queops_api::entities::Product::find_by_id(product_id)
            .one(&*self.db)
            .await
            .expect("query failed")
            .expect("product missing")
            .stock
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18080,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        checkout_max_retries: 3,
    }
}
