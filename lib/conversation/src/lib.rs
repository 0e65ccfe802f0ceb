//! Conversations for the conversation service.
//!
//! This crate provides:
//!
//! - **Model**: `Conversation`, `Message` and the request payload
//! - **Resource**: key-based CRUD bound to the conversations table
//! - **Service**: payload validation, not-found semantics and HTTP-style errors

pub mod error;
pub mod message;
pub mod model;
pub mod resource;
pub mod service;

pub use error::ServiceError;
pub use message::Message;
pub use model::{Conversation, ConversationId, ConversationPage, ConversationPayload, PageRequest};
pub use resource::ConversationResource;
pub use service::ConversationService;
