// shop/src/models/mod.rs

//! Data structures representing stored entities and their creation inputs.

pub mod order;
pub mod order_item;
pub mod product;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order, OrderLine, OrderStatus, OrderSummary};
pub use order_item::{NewOrderItem, OrderItem};
pub use product::{NewProduct, Product, ProductChanges};
pub use session::Session;
pub use user::{NewUser, Role, User};
