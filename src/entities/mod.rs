//! SeaORM entities for the storefront schema.

pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;

pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment::{Entity as Payment, Model as PaymentModel, PaymentMethod, PaymentStatus};
pub use product::{Entity as Product, Model as ProductModel};
