//! Key-value backend implementations for the linkstub URL shortener.
//!
//! [`RedisBackend`] is the production backend; [`InMemoryBackend`] serves
//! tests and embedded use without a network dependency.

pub mod memory;
pub mod redis;

pub use memory::InMemoryBackend;
pub use redis::{RedisBackend, RedisBackendConfig};
