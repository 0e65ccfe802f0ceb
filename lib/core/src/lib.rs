//! Core types and utilities for the conversation service.
//!
//! This crate provides the error handling foundation and the strongly-typed
//! identifiers shared by the data-access, conversation and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, TaskId};
