pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::notifications::OrderNotifier;
use std::sync::Arc;

pub use carts::carts_routes;
pub use checkout::checkout_routes;
pub use orders::orders_routes;

/// Aggregate of the services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::ProductCatalogService>,
    pub cart: Arc<crate::services::CartService>,
    pub checkout: Arc<crate::services::CheckoutService>,
    pub orders: Arc<crate::services::OrderService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        notifier: Arc<dyn OrderNotifier>,
        checkout_max_retries: u32,
    ) -> Self {
        let catalog = Arc::new(crate::services::ProductCatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let cart = Arc::new(crate::services::CartService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            notifier.clone(),
            checkout_max_retries,
        ));
        let orders = Arc::new(crate::services::OrderService::new(
            db_pool,
            event_sender,
            notifier,
        ));

        Self {
            catalog,
            cart,
            checkout,
            orders,
        }
    }
}
