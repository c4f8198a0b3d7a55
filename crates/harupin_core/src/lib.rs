//! Core domain logic for Harupin: geotagged notes, live filtered views and
//! map clustering.
//! This crate is the single source of truth for note and clustering invariants.

pub mod cluster;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod runtime;
pub mod service;
pub mod store;
pub mod subscription;

pub use cluster::{angular_distance_degrees, cluster, Cluster, Located, NoteCluster, ThresholdPolicy};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{GeoPoint, Note, NoteDraft, NoteId, NoteValidationError, MAX_IMAGES};
pub use query::archive::{months_in, years};
pub use query::criteria::{Filter, FilterCriteria};
pub use query::engine::{NoteQuery, NoteSet, QueryEngine, QueryStatus};
pub use runtime::{CoreRuntime, RuntimeError};
pub use service::note_service::{NoteService, NoteServiceError};
pub use store::{
    LiveQueryHandle, NotePredicate, NotesSink, RecordStore, SqliteRecordStore, StoreError,
    StoreResult,
};
pub use subscription::{ClusterUpdate, MapEvent, MapObserver, ObserverState, SubscriptionHub};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
