// server/src/web/handlers/mod.rs

pub mod cart_handlers;
pub mod checkout_handlers;
pub mod message_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod verification_handlers;
