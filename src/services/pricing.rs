//! Promotional-price resolution for catalog products.

use crate::entities::product;
use rust_decimal::Decimal;

/// Returns the price a product actually sells for: the promotional price
/// when one is set and strictly below the list price, the list price
/// otherwise.
pub fn effective_price(list_price: Decimal, promotional_price: Option<Decimal>) -> Decimal {
    match promotional_price {
        Some(promo) if promo < list_price => promo,
        _ => list_price,
    }
}

/// Whether the product currently has an active promotion.
pub fn has_promotion(list_price: Decimal, promotional_price: Option<Decimal>) -> bool {
    matches!(promotional_price, Some(promo) if promo < list_price)
}

/// Convenience accessor over a loaded product row.
pub fn product_price(product: &product::Model) -> Decimal {
    effective_price(product.list_price, product.promotional_price)
}
