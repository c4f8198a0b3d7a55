//! Composition root.
//!
//! # Responsibility
//! - Construct the record store explicitly from configuration.
//! - Wire the note service and the subscription hub over that one store.
//!
//! # Invariants
//! - Exactly one store instance per runtime; no process-global store handle.

use crate::config::{ConfigError, CoreConfig};
use crate::db::DbError;
use crate::logging::init_logging;
use crate::query::engine::QueryEngine;
use crate::service::note_service::NoteService;
use crate::store::{RecordStore, SqliteRecordStore};
use crate::subscription::{MapObserver, SubscriptionHub};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Startup failure.
#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for RuntimeError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Owns the store and the services built on it.
pub struct CoreRuntime {
    store: Arc<SqliteRecordStore>,
    notes: NoteService,
    hub: SubscriptionHub,
}

impl CoreRuntime {
    /// Validates `config`, starts logging when configured, and opens the store.
    pub fn open(config: &CoreConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        if let Some(log_dir) = &config.log_dir {
            init_logging(&config.log_level, log_dir).map_err(RuntimeError::Logging)?;
        }

        let store = Arc::new(match &config.db_path {
            Some(path) => SqliteRecordStore::open(path)?,
            None => SqliteRecordStore::open_in_memory()?,
        });
        let shared: Arc<dyn RecordStore> = store.clone();
        let runtime = Self {
            notes: NoteService::new(Arc::clone(&shared)),
            hub: SubscriptionHub::new(QueryEngine::new(shared), config.clustering),
            store,
        };
        info!(
            "event=runtime_open module=runtime status=ok persistent={}",
            config.db_path.is_some()
        );
        Ok(runtime)
    }

    pub fn notes(&self) -> &NoteService {
        &self.notes
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    /// New idle map observer.
    pub fn observer(&self) -> MapObserver {
        self.hub.observer()
    }

    pub fn store(&self) -> &Arc<SqliteRecordStore> {
        &self.store
    }
}
