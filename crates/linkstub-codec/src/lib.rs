//! Base62 identifier codec for the linkstub URL shortener.
//!
//! A short code is the base62 rendering of a 64-bit identifier. The mapping
//! is a pure, stateless bijection: [`encode`] is total and infallible,
//! [`decode`] is its inverse and rejects anything outside the identifier
//! space.

mod base62;
pub mod error;

pub use base62::{decode, encode, ALPHABET};
pub use error::DecodeError;
