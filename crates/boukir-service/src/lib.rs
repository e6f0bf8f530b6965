//! Boukir credit note HTTP API.
//!
//! This crate serves the credit note ("avoir") documents of the three sales channels
//! (registered clients, walk-in cash sales, e-commerce) and exposes the stock levels their
//! lifecycle moves.
//!
//! # Authentication
//!
//! Every `/api` route takes an HS256 bearer token whose claims carry the employee id and
//! role. Lead drivers (`ChefChauffeur`) get a restricted set of operations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // The health handler needs async for routing

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
