//! asj-server library target.
//!
//! Exposes the router and state for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod reports;
pub mod results;
pub mod routes;
pub mod square;
pub mod state;
pub mod telegram;
