//! Service factory.
//!
//! A name-keyed registry of data-access constructors. The configured backend
//! name picks which `DataService` the conversation layers are built on.
//! Every call builds a fresh instance; the server asks once at startup.

use crate::config::ServerConfig;
use crate::error::FactoryError;
use convo_conversation::{ConversationResource, ConversationService};
use convo_core::Result;
use convo_data_access::{DataService, DatabaseConfig, InMemoryDataService, MySqlDataService};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a data service from the database configuration.
pub type DataServiceConstructor = Box<
    dyn Fn(&DatabaseConfig) -> Result<Arc<dyn DataService>, FactoryError> + Send + Sync,
>;

/// Name of the MySQL backend.
pub const MYSQL: &str = "mysql";
/// Name of the in-memory backend.
pub const MEMORY: &str = "memory";

/// Hands out configured service instances.
pub struct ServiceFactory {
    database: DatabaseConfig,
    selected: String,
    max_page_limit: u64,
    constructors: BTreeMap<String, DataServiceConstructor>,
}

impl ServiceFactory {
    /// Creates a factory with the built-in `mysql` and `memory` backends.
    pub fn new(config: &ServerConfig) -> Self {
        let mut factory = Self {
            database: config.database.clone(),
            selected: config.data_service.clone(),
            max_page_limit: config.pagination.max_limit,
            constructors: BTreeMap::new(),
        };
        factory.register(MYSQL, Box::new(build_mysql));
        factory.register(MEMORY, Box::new(build_memory));
        factory
    }

    /// Registers a constructor, replacing any previous one with that name.
    pub fn register(&mut self, name: impl Into<String>, constructor: DataServiceConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Names of all registered backends, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// The backend name the conversation layers will be built on.
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Builds the named data service.
    pub fn data_service(&self, name: &str) -> Result<Arc<dyn DataService>, FactoryError> {
        let constructor =
            self.constructors
                .get(name)
                .ok_or_else(|| FactoryError::UnknownService {
                    name: name.to_string(),
                    available: self.service_names(),
                })?;
        tracing::info!(service = name, "constructing data service");
        constructor(&self.database)
    }

    /// Builds the conversation resource on the selected backend.
    pub fn conversation_resource(&self) -> Result<ConversationResource, FactoryError> {
        Ok(ConversationResource::new(
            self.data_service(&self.selected)?,
        ))
    }

    /// Builds the conversation service on the selected backend.
    pub fn conversation_service(&self) -> Result<ConversationService, FactoryError> {
        Ok(ConversationService::new(self.conversation_resource()?)
            .with_max_page_limit(self.max_page_limit))
    }
}

fn build_mysql(database: &DatabaseConfig) -> Result<Arc<dyn DataService>, FactoryError> {
    Ok(Arc::new(MySqlDataService::connect_lazy(database)))
}

fn build_memory(_: &DatabaseConfig) -> Result<Arc<dyn DataService>, FactoryError> {
    let service = InMemoryDataService::new();
    service
        .create_table(
            ConversationResource::DATABASE,
            ConversationResource::TABLE,
            ConversationResource::KEY_FIELD,
        )
        .map_err(|e| FactoryError::ConstructionFailed {
            name: MEMORY.to_string(),
            details: e.current_context().to_string(),
        })?;
    Ok(Arc::new(service))
}
