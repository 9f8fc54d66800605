pub mod client_handlers;
pub mod health_handlers;
