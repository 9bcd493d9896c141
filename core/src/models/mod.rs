// core/src/models/mod.rs

//! Data structures representing stored entities and the views built from them.

pub mod cart;
pub mod identity;
pub mod message;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, CartItemQuantity, CartLine};
pub use identity::{CartOwner, IdentitySignal, UserId};
pub use message::{CustomerMessage, NewCustomerMessage};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderItemView, OrderStatus, OrderWithItems};
pub use product::{Category, Product, ProductImage};
