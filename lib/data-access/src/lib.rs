//! Generic data access for the conversation service.
//!
//! This crate provides:
//!
//! - **DataService**: key-based CRUD, ordered pagination and counting against a
//!   named `database.table`
//! - **MySqlDataService**: the sqlx-backed MySQL implementation
//! - **InMemoryDataService**: a process-local implementation with the same
//!   contract, used for tests and local development
//!
//! Rows travel as [`Record`]s, ordered JSON objects keyed by column name.

pub mod config;
pub mod error;
pub mod identifier;
pub mod memory;
pub mod mysql;
pub mod service;
mod statement;

pub use config::DatabaseConfig;
pub use error::DataAccessError;
pub use memory::InMemoryDataService;
pub use mysql::MySqlDataService;
pub use service::{DataService, Record};
