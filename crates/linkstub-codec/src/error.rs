use thiserror::Error;

/// Errors returned when decoding a short code back into an identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("character '{0}' is not in the base62 alphabet")]
    InvalidSymbol(char),
    #[error("decoded value does not fit in 64 bits")]
    Overflow,
    #[error("short code is empty")]
    Empty,
}
