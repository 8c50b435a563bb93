//! fieldsync-core - Core library for fieldsync
//!
//! Offline storage and synchronization for property inspection capture: the
//! local cache of inspections, report data and captured media, the outbound
//! sync queue, and the engine that pushes it to the remote inspection API.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;
pub mod util;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{Document, InspectionId, InspectionStatus};
pub use store::{open_store, shared_store, LocalStore, StoreBackend, StoreConfig};
pub use sync::{SyncEngine, SyncOptions, SyncOutcome};
