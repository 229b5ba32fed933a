//! Populates the database with a demo catalog for local development.
//!
//! Idempotent: products are matched by slug and skipped when they already
//! exist, so the binary can be re-run freely.

use queops_api as api;

use api::services::catalog::CreateProductInput;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    api::db::run_migrations(&db_pool).await?;

    let (event_tx, event_rx) = mpsc::channel(64);
    tokio::spawn(api::events::process_events(event_rx));

    let catalog = api::services::ProductCatalogService::new(
        Arc::new(db_pool),
        Arc::new(api::events::EventSender::new(event_tx)),
    );

    let mut created = 0usize;
    for input in demo_catalog() {
        let slug = input.slug.clone();
        if catalog.create_product_if_absent(input).await?.is_some() {
            created += 1;
        } else {
            info!("Skipping existing product: {}", slug);
        }
    }

    info!("Seed finished: {} products created", created);
    Ok(())
}

fn product(
    name: &str,
    slug: &str,
    description: &str,
    list_price: Decimal,
    promotional_price: Option<Decimal>,
    stock: i32,
    featured: bool,
) -> CreateProductInput {
    CreateProductInput {
        name: name.to_string(),
        slug: slug.to_string(),
        description: description.to_string(),
        list_price,
        promotional_price,
        stock,
        active: true,
        featured,
    }
}

fn demo_catalog() -> Vec<CreateProductInput> {
    vec![
        product(
            "Dipirona Sódica 500mg",
            "dipirona-sodica-500mg",
            "Analgesic and antipyretic for mild to moderate pain and fever. Pack of 20 tablets.",
            dec!(12.90),
            Some(dec!(9.90)),
            150,
            true,
        ),
        product(
            "Paracetamol 750mg",
            "paracetamol-750mg",
            "Effective analgesic and antipyretic. Box of 20 tablets.",
            dec!(15.50),
            None,
            200,
            true,
        ),
        product(
            "Omeprazol 20mg",
            "omeprazol-20mg",
            "Treatment for stomach acidity and reflux. 30 capsules.",
            dec!(24.90),
            Some(dec!(19.90)),
            80,
            false,
        ),
        product(
            "Ibuprofeno 600mg",
            "ibuprofeno-600mg",
            "Anti-inflammatory and analgesic. Pack of 30 tablets.",
            dec!(22.00),
            None,
            120,
            false,
        ),
        product(
            "Vitamina C 1g Efervescente",
            "vitamina-c-1g-efervescente",
            "Immunity support, 10 effervescent tablets.",
            dec!(18.90),
            Some(dec!(14.90)),
            90,
            true,
        ),
        product(
            "Complexo B",
            "complexo-b",
            "B-vitamin supplement, 60 capsules.",
            dec!(29.90),
            None,
            60,
            false,
        ),
        product(
            "Protetor Solar FPS 60",
            "protetor-solar-fps-60",
            "Facial sunscreen, oil-free, 50g.",
            dec!(54.90),
            Some(dec!(44.90)),
            45,
            true,
        ),
        product(
            "Shampoo Anticaspa",
            "shampoo-anticaspa",
            "Dandruff control shampoo, 200ml.",
            dec!(32.50),
            None,
            70,
            false,
        ),
        product(
            "Fralda Infantil M",
            "fralda-infantil-m",
            "Size M diapers, pack of 40 units.",
            dec!(49.90),
            Some(dec!(42.90)),
            55,
            false,
        ),
        product(
            "Termômetro Digital",
            "termometro-digital",
            "Digital clinical thermometer with fever alarm.",
            dec!(19.90),
            None,
            35,
            false,
        ),
    ]
}
