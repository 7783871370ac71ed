//! relish-core: a locally-persisted shopping cart state engine.
//!
//! The engine establishes identity for configurable line items (base item
//! plus heat selection and add-ons), merges duplicate configurations into
//! quantity counts, computes derived pricing on demand, and keeps one
//! serialized snapshot in sync with the in-memory model. It is a library
//! with no rendering, event-wiring, or network surface; a UI shell consumes
//! [`CartStore`] and registers count listeners.
//!
//! # Conventions
//!
//! - **Errors**: operations return `Result` with [`CartError`]; boundary
//!   failures (persistence, key derivation) are contained and logged, never
//!   raised to the caller.
//! - **Logging**: `tracing` macros, with machine-readable [`ErrorCode`]
//!   values attached to warnings.

pub mod config;
pub mod display;
pub mod error;
pub mod identity;
pub mod migrate;
pub mod model;
pub mod notify;
pub mod storage;
pub mod store;

pub use config::{CartConfig, load_config};
pub use error::{CartError, ErrorCode};
pub use migrate::MigrationReport;
pub use model::{Addon, LineEntry, Totals};
pub use notify::CountNotifier;
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{CartStore, NewItem};
