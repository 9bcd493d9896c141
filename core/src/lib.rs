// src/lib.rs

//! Atelier: cart resolution, checkout and payment reconciliation for a small
//! storefront.
//!
//! The crate is organised around a few seams:
//!  - [`store`] traits for persistence, with an in-memory implementation and a
//!    PostgreSQL one behind the `postgres` feature.
//!  - [`gateway::PaymentGateway`] for the external payment provider.
//!  - [`cache::FlagCache`] for short-lived flags (verification codes, cooldowns).
//!  - [`mail::Mailer`] for outbound email.
//!
//! [`Shop`] wires them together. Checkout and reconciliation run as step
//! pipelines ([`workflow`]) so every stage logs under its own span and any
//! failure aborts the rest of the run.

pub mod cache;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod inbox;
pub mod mail;
pub mod models;
pub mod orders;
pub mod payments;
pub mod settings;
pub mod shop;
pub mod store;
pub mod verification;
pub mod workflow;

pub use crate::cache::{FlagCache, MemoryFlagCache};
pub use crate::cart::{CartResolver, CartService, QuantityInput};
pub use crate::catalog::Catalog;
pub use crate::checkout::{CheckoutLine, CheckoutReceipt, CheckoutRequest, ProductRef};
pub use crate::error::{ShopError, ShopResult};
pub use crate::gateway::{GatewayError, GatewayTransaction, PaymentGateway, PaymentInit, PaymentSession};
pub use crate::inbox::Inbox;
pub use crate::mail::{Mailer, OutgoingMail};
pub use crate::orders::OrderLookup;
pub use crate::payments::PaymentConfirmation;
pub use crate::settings::ShopSettings;
pub use crate::shop::{Shop, ShopDeps};
pub use crate::store::{InMemoryStore, ShopStore};
pub use crate::verification::{CodeInput, EmailVerification};
pub use crate::workflow::{ContextData, Pipeline};
