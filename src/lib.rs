pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod publisher;
pub mod qr;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
