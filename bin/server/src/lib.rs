//! Conversation service HTTP server.
//!
//! This crate wires the conversation service onto axum:
//!
//! - **Config**: environment-driven [`config::ServerConfig`]
//! - **Factory**: name-keyed construction of the data-access backend
//! - **Routes**: conversation CRUD, listing and background task polling
//! - **Tasks**: in-memory registry for background creations

pub mod config;
pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tasks;

pub use routes::router;
pub use state::AppState;
