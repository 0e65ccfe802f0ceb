//! Key-based access to the conversations table.

use crate::model::{ConversationId, ID_COLUMN};
use convo_core::Result;
use convo_data_access::{DataAccessError, DataService, Record};
use serde_json::Value;
use std::sync::Arc;

/// Maps conversation CRUD onto a [`DataService`] with fixed table names.
#[derive(Clone)]
pub struct ConversationResource {
    data_service: Arc<dyn DataService>,
}

impl ConversationResource {
    /// Database holding the conversations table.
    pub const DATABASE: &'static str = "p1_database";
    /// Table name.
    pub const TABLE: &'static str = "conversations";
    /// Primary key column.
    pub const KEY_FIELD: &'static str = ID_COLUMN;

    /// Creates a resource over the given data service.
    pub fn new(data_service: Arc<dyn DataService>) -> Self {
        Self { data_service }
    }

    /// Inserts a conversation row and returns the id storage assigned.
    pub async fn create_conversation(
        &self,
        conversation: Record,
    ) -> Result<ConversationId, DataAccessError> {
        self.data_service
            .insert(Self::DATABASE, Self::TABLE, conversation)
            .await
    }

    /// Overwrites the given columns of an existing conversation.
    ///
    /// Fails with `RecordNotFound` if the id is unknown.
    pub async fn update_conversation(
        &self,
        id: ConversationId,
        conversation: Record,
    ) -> Result<(), DataAccessError> {
        self.data_service
            .update(
                Self::DATABASE,
                Self::TABLE,
                conversation,
                Self::KEY_FIELD,
                &Value::from(id),
            )
            .await
    }

    /// Fetches a conversation row, or `None` if the id is unknown.
    pub async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Record>, DataAccessError> {
        self.data_service
            .fetch_one(Self::DATABASE, Self::TABLE, Self::KEY_FIELD, &Value::from(id))
            .await
    }

    /// Removes a conversation. Fails with `RecordNotFound` if the id is unknown.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<(), DataAccessError> {
        self.data_service
            .delete(Self::DATABASE, Self::TABLE, Self::KEY_FIELD, &Value::from(id))
            .await
    }

    /// Number of stored conversations.
    pub async fn get_total_conversation_count(&self) -> Result<u64, DataAccessError> {
        self.data_service
            .count_all(Self::DATABASE, Self::TABLE)
            .await
    }

    /// Fetches one page in id order; `page` is 1-based.
    pub async fn get_paginated_conversations(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Record>, DataAccessError> {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        self.data_service
            .fetch_paginated(
                Self::DATABASE,
                Self::TABLE,
                Some(Self::KEY_FIELD),
                offset,
                limit,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_data_access::InMemoryDataService;
    use serde_json::json;

    fn resource() -> ConversationResource {
        let service = InMemoryDataService::new();
        service
            .create_table(
                ConversationResource::DATABASE,
                ConversationResource::TABLE,
                ConversationResource::KEY_FIELD,
            )
            .expect("create table");
        ConversationResource::new(Arc::new(service))
    }

    fn row(name: &str) -> Record {
        let mut record = Record::new();
        record.insert("name".to_string(), json!(name));
        record
    }

    #[tokio::test]
    async fn create_then_get() {
        let resource = resource();

        let id = resource
            .create_conversation(row("first"))
            .await
            .expect("create");
        let stored = resource
            .get_conversation(id)
            .await
            .expect("get")
            .expect("exists");

        assert_eq!(stored["convo_id"], json!(id));
        assert_eq!(stored["name"], json!("first"));
    }

    #[tokio::test]
    async fn pages_are_one_based() {
        let resource = resource();
        for n in 0..5 {
            resource
                .create_conversation(row(&format!("c{n}")))
                .await
                .expect("create");
        }

        let second = resource
            .get_paginated_conversations(2, 2)
            .await
            .expect("page");
        assert_eq!(second[0]["name"], json!("c2"));
        assert_eq!(
            resource
                .get_total_conversation_count()
                .await
                .expect("count"),
            5
        );
    }

    #[tokio::test]
    async fn delete_missing_conversation_fails() {
        let resource = resource();

        let err = resource.delete_conversation(42).await.unwrap_err();
        assert!(err.current_context().is_not_found());
    }
}
