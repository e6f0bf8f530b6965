//! HTTP request handlers.

pub mod documents;
pub mod health;
pub mod stock;
