//! Error types for the conversation crate.
//!
//! `ServiceError` is what the service layer reports to its callers. Each
//! variant carries an HTTP-style status code so transports can translate it
//! without knowing how the failure came about.

use crate::model::ConversationId;
use std::fmt;

/// Errors from conversation service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request payload is missing fields or has the wrong shape.
    InvalidPayload { reason: String },
    /// Page or limit is out of range.
    InvalidPagination { reason: String },
    /// No conversation has the given id.
    NotFound { id: ConversationId },
    /// The listing found no conversations at all.
    NoneFound,
    /// Storage rejected the insert.
    Create { details: String },
    /// Storage rejected the update.
    Update { details: String },
    /// Storage rejected the delete.
    Delete { details: String },
    /// Reading one or all conversations failed.
    Fetch { details: String },
    /// Counting conversations failed.
    Count { details: String },
    /// Reading a page of conversations failed.
    Listing { details: String },
    /// A stored row could not be decoded.
    Corrupt { reason: String },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPayload { reason } => write!(f, "Invalid conversation payload: {reason}"),
            Self::InvalidPagination { reason } => write!(f, "Invalid pagination: {reason}"),
            Self::NotFound { id } => write!(f, "Conversation with ID {id} not found"),
            Self::NoneFound => write!(f, "Conversations not found"),
            Self::Create { details } => write!(f, "Error creating conversation: {details}"),
            Self::Update { details } => write!(f, "Error updating conversation: {details}"),
            Self::Delete { details } => write!(f, "Error deleting conversation: {details}"),
            Self::Fetch { details } => write!(f, "Error retrieving conversation: {details}"),
            Self::Count { details } => {
                write!(f, "Error retrieving total conversation count: {details}")
            }
            Self::Listing { details } => {
                write!(f, "Error retrieving paginated conversations: {details}")
            }
            Self::Corrupt { reason } => write!(f, "Stored conversation is invalid: {reason}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// The HTTP status code this error translates to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPayload { .. }
            | Self::InvalidPagination { .. }
            | Self::Create { .. }
            | Self::Update { .. }
            | Self::Delete { .. } => 400,
            Self::NotFound { .. } | Self::NoneFound => 404,
            Self::Fetch { .. } | Self::Count { .. } | Self::Listing { .. } | Self::Corrupt { .. } => {
                500
            }
        }
    }

    /// Returns true for failures caused by the server rather than the request.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = ServiceError::NotFound { id: 12 };
        assert_eq!(err.to_string(), "Conversation with ID 12 not found");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn storage_write_failures_are_bad_requests() {
        let err = ServiceError::Create {
            details: "Data too long for column 'name'".to_string(),
        };
        assert!(err.to_string().starts_with("Error creating conversation"));
        assert_eq!(err.status_code(), 400);
        assert!(!err.is_internal());
    }

    #[test]
    fn read_failures_are_internal() {
        let err = ServiceError::Count {
            details: "connection refused".to_string(),
        };
        assert_eq!(err.status_code(), 500);
        assert!(err.is_internal());
    }
}
