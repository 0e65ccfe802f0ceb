//! Shared application state.

use crate::config::PaginationConfig;
use crate::tasks::TaskRegistry;
use convo_conversation::ConversationService;

/// State handed to every handler behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub conversations: ConversationService,
    pub tasks: TaskRegistry,
    pub pagination: PaginationConfig,
}

impl AppState {
    pub fn new(conversations: ConversationService, pagination: PaginationConfig) -> Self {
        Self {
            conversations,
            tasks: TaskRegistry::new(),
            pagination,
        }
    }
}
