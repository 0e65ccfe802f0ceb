//! Conversation service.
//!
//! Sits between the transport and [`ConversationResource`]: validates and
//! reshapes payloads, decodes stored rows, enforces not-found semantics and
//! turns storage failures into [`ServiceError`]s.

use crate::error::ServiceError;
use crate::model::{Conversation, ConversationId, ConversationPage, ConversationPayload, PageRequest};
use crate::resource::ConversationResource;
use convo_core::Result;
use convo_data_access::{DataAccessError, Record};
use rootcause::Report;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Largest page size accepted unless configured otherwise.
pub const DEFAULT_MAX_PAGE_LIMIT: u64 = 100;

/// Validating service over the conversations resource.
#[derive(Clone)]
pub struct ConversationService {
    resource: ConversationResource,
    max_page_limit: u64,
}

impl ConversationService {
    /// Creates a service over the given resource.
    pub fn new(resource: ConversationResource) -> Self {
        Self {
            resource,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }

    /// Overrides the largest accepted page size.
    #[must_use]
    pub fn with_max_page_limit(mut self, max_page_limit: u64) -> Self {
        self.max_page_limit = max_page_limit.max(1);
        self
    }

    #[must_use]
    pub fn max_page_limit(&self) -> u64 {
        self.max_page_limit
    }

    /// Creates a conversation and returns its id.
    pub async fn create_conversation(
        &self,
        body: &Value,
    ) -> Result<ConversationId, ServiceError> {
        let record = ConversationPayload::from_json(body)?.to_record()?;

        let id = self
            .resource
            .create_conversation(record)
            .await
            .map_err(|e| ServiceError::Create {
                details: details(&e),
            })?;

        if id == 0 {
            return Err(ServiceError::Create {
                details: "Failed to retrieve conversation ID after creation.".to_string(),
            }
            .into());
        }

        info!(convo_id = id, "created conversation");
        Ok(id)
    }

    /// Replaces the stored fields of an existing conversation.
    pub async fn update_conversation(
        &self,
        id: ConversationId,
        body: &Value,
    ) -> Result<(), ServiceError> {
        let record = ConversationPayload::from_json(body)?.to_record()?;

        self.resource
            .update_conversation(id, record)
            .await
            .map_err(|e| write_error(id, &e, |details| ServiceError::Update { details }))?;

        info!(convo_id = id, "updated conversation");
        Ok(())
    }

    /// Retrieves one conversation.
    pub async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, ServiceError> {
        let record = self
            .resource
            .get_conversation(id)
            .await
            .map_err(|e| ServiceError::Fetch {
                details: details(&e),
            })?
            .ok_or(ServiceError::NotFound { id })?;

        Ok(Conversation::from_record(&record)?)
    }

    /// Deletes one conversation.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<(), ServiceError> {
        self.resource
            .delete_conversation(id)
            .await
            .map_err(|e| write_error(id, &e, |details| ServiceError::Delete { details }))?;

        info!(convo_id = id, "deleted conversation");
        Ok(())
    }

    /// Number of stored conversations.
    pub async fn get_total_conversation_count(&self) -> Result<u64, ServiceError> {
        Ok(self
            .resource
            .get_total_conversation_count()
            .await
            .map_err(|e| ServiceError::Count {
                details: details(&e),
            })?)
    }

    /// Retrieves one page of conversations without totals.
    pub async fn get_paginated_conversations(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Conversation>, ServiceError> {
        let request = self.page_request(page, limit)?;
        let records = self
            .resource
            .get_paginated_conversations(request.page(), request.limit())
            .await
            .map_err(|e| ServiceError::Listing {
                details: details(&e),
            })?;
        decode_all(&records)
    }

    /// Retrieves one page of conversations with navigation totals.
    ///
    /// An empty table is `NoneFound`; a page past the end is an empty page.
    pub async fn list_conversations(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<ConversationPage, ServiceError> {
        let request = self.page_request(page, limit)?;
        let total = self.get_total_conversation_count().await?;
        if total == 0 {
            return Err(ServiceError::NoneFound.into());
        }

        let items = if request.offset() >= total {
            debug!(page, limit, total, "page past the end");
            Vec::new()
        } else {
            self.get_paginated_conversations(page, limit).await?
        };

        Ok(ConversationPage::new(items, request, total))
    }

    fn page_request(&self, page: u64, limit: u64) -> Result<PageRequest, ServiceError> {
        if limit > self.max_page_limit {
            return Err(ServiceError::InvalidPagination {
                reason: format!("limit must be at most {}", self.max_page_limit),
            }
            .into());
        }
        Ok(PageRequest::new(page, limit)?)
    }
}

fn decode_all(records: &[Record]) -> Result<Vec<Conversation>, ServiceError> {
    records
        .iter()
        .map(|record| Conversation::from_record(record).map_err(Report::from))
        .collect()
}

fn details(err: &Report<DataAccessError>) -> String {
    err.current_context().to_string()
}

/// Maps a failed update or delete, keeping missing rows distinct.
fn write_error(
    id: ConversationId,
    err: &Report<DataAccessError>,
    wrap: impl FnOnce(String) -> ServiceError,
) -> ServiceError {
    if err.current_context().is_not_found() {
        ServiceError::NotFound { id }
    } else {
        warn!(convo_id = id, error = %err.current_context(), "conversation write failed");
        wrap(details(err))
    }
}
