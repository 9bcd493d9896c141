// server/src/services/mod.rs

pub mod mailer;
pub mod paystack;

pub use mailer::LoggingMailer;
pub use paystack::PaystackGateway;
