//! Core types and traits for the linkstub URL shortener.
//!
//! This crate defines the persisted link record, the abstract key-value
//! backend contract, and the error taxonomy shared by the storage backends
//! and the link store service.

pub mod backend;
pub mod error;
pub mod record;

pub use backend::KvBackend;
pub use error::{BackendError, RecordError, Result, StoreError};
pub use record::{field, LinkRecord};
