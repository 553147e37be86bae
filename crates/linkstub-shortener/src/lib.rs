//! Link store service for the linkstub URL shortener.
//!
//! [`LinkStore`] owns the allocate/persist/resolve/inspect lifecycle of a
//! short link: it draws a random 64-bit identifier, claims it through the
//! backend's conditional write, and hands out the base62 short code that maps
//! back to it. Core types are re-exported from `linkstub_core`.

pub mod store;

pub use linkstub_core::{BackendError, KvBackend, LinkRecord, RecordError, StoreError};
pub use store::LinkStore;
