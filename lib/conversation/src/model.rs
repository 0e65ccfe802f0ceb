//! Conversation model and its mapping to storage rows.
//!
//! Participants and messages are persisted as JSON text in the
//! `participants` and `messages` columns; the group flag lives in `isGroup`.

use crate::error::ServiceError;
use crate::message::Message;
use convo_data_access::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage-assigned conversation identifier.
pub type ConversationId = u64;

/// Column holding the conversation id.
pub const ID_COLUMN: &str = "convo_id";
const NAME_COLUMN: &str = "name";
const PARTICIPANTS_COLUMN: &str = "participants";
const MESSAGES_COLUMN: &str = "messages";
const IS_GROUP_COLUMN: &str = "isGroup";

/// A stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Identifier assigned by storage.
    pub convo_id: ConversationId,
    /// Display name.
    pub name: String,
    /// Participant names in order.
    pub participants: Vec<String>,
    /// Messages in order.
    pub messages: Vec<Message>,
    /// Whether this is a group conversation.
    #[serde(rename = "isGroup")]
    pub is_group: bool,
}

impl Conversation {
    /// Decodes a storage row.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Corrupt` if a column is missing or malformed.
    pub fn from_record(record: &Record) -> Result<Self, ServiceError> {
        let convo_id = match record.get(ID_COLUMN) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| corrupt(format!("missing or invalid {ID_COLUMN}")))?;

        let name = record
            .get(NAME_COLUMN)
            .and_then(Value::as_str)
            .ok_or_else(|| corrupt(format!("conversation {convo_id} has no name")))?
            .to_string();

        let participants = decode_list(record.get(PARTICIPANTS_COLUMN), PARTICIPANTS_COLUMN)
            .map_err(|reason| corrupt(format!("conversation {convo_id}: {reason}")))?;
        let messages = decode_list(record.get(MESSAGES_COLUMN), MESSAGES_COLUMN)
            .map_err(|reason| corrupt(format!("conversation {convo_id}: {reason}")))?;

        let is_group = match record.get(IS_GROUP_COLUMN) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
            Some(Value::Null) | None => false,
            Some(other) => {
                return Err(corrupt(format!(
                    "conversation {convo_id}: invalid {IS_GROUP_COLUMN} value {other}"
                )));
            }
        };

        Ok(Self {
            convo_id,
            name,
            participants,
            messages,
            is_group,
        })
    }
}

/// Decodes a list column stored as JSON text. A NULL column is an empty list.
fn decode_list<T: serde::de::DeserializeOwned>(
    value: Option<&Value>,
    column: &str,
) -> Result<Vec<T>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => {
            serde_json::from_str(text).map_err(|e| format!("invalid {column} JSON: {e}"))
        }
        Some(array @ Value::Array(_)) => serde_json::from_value(array.clone())
            .map_err(|e| format!("invalid {column} list: {e}")),
        Some(other) => Err(format!("unexpected {column} value {other}")),
    }
}

fn corrupt(reason: String) -> ServiceError {
    ServiceError::Corrupt { reason }
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPayload {
    /// Display name; must not be blank.
    pub name: String,
    /// Participant names.
    pub participants: Vec<String>,
    /// Optional initial messages.
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    /// Group flag; accepts `isGroup` or `is_group`.
    #[serde(default, rename = "isGroup", alias = "is_group")]
    pub is_group: bool,
}

impl ConversationPayload {
    /// Parses and validates a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidPayload` if the body does not describe a
    /// conversation.
    pub fn from_json(body: &Value) -> Result<Self, ServiceError> {
        let payload: Self =
            serde_json::from_value(body.clone()).map_err(|e| ServiceError::InvalidPayload {
                reason: e.to_string(),
            })?;
        payload.validate()?;
        Ok(payload)
    }

    /// Checks field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::InvalidPayload {
                reason: "name must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Shapes the payload into a storage row, JSON-encoding the list fields.
    pub fn to_record(&self) -> Result<Record, ServiceError> {
        let encode_err = |e: serde_json::Error| ServiceError::InvalidPayload {
            reason: e.to_string(),
        };
        let participants = serde_json::to_string(&self.participants).map_err(encode_err)?;
        let messages = serde_json::to_string(self.messages.as_deref().unwrap_or_default())
            .map_err(encode_err)?;

        let mut record = Record::new();
        record.insert(NAME_COLUMN.to_string(), Value::from(self.name.clone()));
        record.insert(PARTICIPANTS_COLUMN.to_string(), Value::from(participants));
        record.insert(MESSAGES_COLUMN.to_string(), Value::from(messages));
        record.insert(IS_GROUP_COLUMN.to_string(), Value::from(self.is_group));
        Ok(record)
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Creates a page request. Pages are numbered from 1.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidPagination` if `page` or `limit` is zero.
    pub fn new(page: u64, limit: u64) -> Result<Self, ServiceError> {
        if page == 0 {
            return Err(ServiceError::InvalidPagination {
                reason: "page must be at least 1".to_string(),
            });
        }
        if limit == 0 {
            return Err(ServiceError::InvalidPagination {
                reason: "limit must be at least 1".to_string(),
            });
        }
        Ok(Self { page, limit })
    }

    /// The 1-based page number.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Maximum number of items on the page.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of rows preceding this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of conversations plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationPage {
    /// Conversations on this page, in id order.
    pub items: Vec<Conversation>,
    /// The 1-based page number.
    pub page: u64,
    /// Page size the listing was cut with.
    pub limit: u64,
    /// Number of conversations across all pages.
    pub total: u64,
    /// Number of pages at this limit; zero for an empty table.
    pub total_pages: u64,
}

impl ConversationPage {
    /// Builds a page, deriving `total_pages` from `total` and the limit.
    #[must_use]
    pub fn new(items: Vec<Conversation>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page(),
            limit: request.limit(),
            total,
            total_pages: total.div_ceil(request.limit()),
        }
    }

    /// Whether a later page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn payload_accepts_both_group_spellings() {
        let camel = ConversationPayload::from_json(
            &json!({"name": "Team", "participants": ["a", "b"], "isGroup": true}),
        )
        .expect("valid");
        let snake = ConversationPayload::from_json(
            &json!({"name": "Team", "participants": ["a", "b"], "is_group": true}),
        )
        .expect("valid");
        assert!(camel.is_group);
        assert_eq!(camel, snake);
    }

    #[test]
    fn payload_defaults_optional_fields() {
        let payload =
            ConversationPayload::from_json(&json!({"name": "Ana", "participants": ["Ana"]}))
                .expect("valid");
        assert!(!payload.is_group);
        assert_eq!(payload.messages, None);
    }

    #[test]
    fn payload_rejects_missing_participants() {
        let err = ConversationPayload::from_json(&json!({"name": "Ana"})).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload { .. }));
        assert!(err.to_string().contains("participants"));
    }

    #[test]
    fn payload_rejects_blank_name() {
        let err = ConversationPayload::from_json(&json!({"name": "  ", "participants": []}))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn record_encodes_lists_as_json_text() {
        let payload = ConversationPayload::from_json(&json!({
            "name": "John Doe",
            "participants": ["John Doe", "CurrentUser"],
            "messages": [{"text": "Hey", "sender": "CurrentUser", "timestamp": "10:00 AM"}],
            "isGroup": false
        }))
        .expect("valid");

        let record = payload.to_record().expect("encode");
        assert_eq!(record["participants"], json!(r#"["John Doe","CurrentUser"]"#));
        assert_eq!(
            record["messages"],
            json!(r#"[{"text":"Hey","sender":"CurrentUser","timestamp":"10:00 AM"}]"#)
        );
        assert_eq!(record["isGroup"], json!(false));
        let columns: Vec<_> = record.keys().cloned().collect();
        assert_eq!(columns, vec!["name", "participants", "messages", "isGroup"]);
    }

    #[test]
    fn missing_messages_are_stored_as_empty_list() {
        let payload = ConversationPayload::from_json(&json!({"name": "x", "participants": []}))
            .expect("valid");
        assert_eq!(payload.to_record().expect("encode")["messages"], json!("[]"));
    }

    #[test]
    fn conversation_decodes_stored_row() {
        let row = record(json!({
            "convo_id": 3,
            "name": "Team",
            "participants": r#"["a","b"]"#,
            "messages": null,
            "isGroup": 1
        }));

        let conversation = Conversation::from_record(&row).expect("decode");
        assert_eq!(conversation.convo_id, 3);
        assert_eq!(conversation.participants, vec!["a", "b"]);
        assert!(conversation.messages.is_empty());
        assert!(conversation.is_group);
    }

    #[test]
    fn conversation_rejects_garbled_participants() {
        let row = record(json!({"convo_id": 1, "name": "x", "participants": "not json"}));
        let err = Conversation::from_record(&row).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn conversation_serializes_with_storage_names() {
        let conversation = Conversation {
            convo_id: 1,
            name: "x".to_string(),
            participants: vec![],
            messages: vec![],
            is_group: true,
        };
        let value = serde_json::to_value(&conversation).expect("serialize");
        assert_eq!(value["isGroup"], json!(true));
        assert_eq!(value["convo_id"], json!(1));
    }

    #[test]
    fn page_request_rejects_zero() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
    }

    #[test]
    fn page_offset_arithmetic() {
        assert_eq!(PageRequest::new(1, 10).expect("valid").offset(), 0);
        assert_eq!(PageRequest::new(3, 10).expect("valid").offset(), 20);
        assert_eq!(PageRequest::new(2, 7).expect("valid").offset(), 7);
    }

    #[test]
    fn total_pages_rounds_up() {
        let request = PageRequest::new(1, 10).expect("valid");
        assert_eq!(ConversationPage::new(vec![], request, 0).total_pages, 0);
        assert_eq!(ConversationPage::new(vec![], request, 10).total_pages, 1);
        assert_eq!(ConversationPage::new(vec![], request, 11).total_pages, 2);

        let page = ConversationPage::new(vec![], request, 25);
        assert!(page.has_next());
        assert!(!page.has_prev());

        let last = ConversationPage::new(vec![], PageRequest::new(3, 10).expect("valid"), 25);
        assert!(!last.has_next());
        assert!(last.has_prev());
    }
}
