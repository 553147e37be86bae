use crate::error::BackendError;
use crate::record::LinkRecord;
use async_trait::async_trait;
use jiff::Timestamp;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, BackendError>;

/// The key-value capability a link store runs against.
///
/// A record is a string field map stored under a key derived from its numeric
/// identifier. Expiry is owned by the backend: once a record's expiry instant
/// has passed, every read operation must treat it as absent.
#[async_trait]
pub trait KvBackend: Send + Sync + 'static {
    /// Checks whether a live record exists for `id`.
    async fn exists(&self, id: u64) -> Result<bool>;

    /// Writes all fields of `record` in a single multi-field write.
    async fn write_record(&self, record: &LinkRecord) -> Result<()>;

    /// Writes `record` only if no live record exists for its id.
    ///
    /// Returns `false` when the id is already taken. Backends with a native
    /// conditional-write primitive should override this with an atomic claim;
    /// the default is an existence check followed by a write, which leaves a
    /// race window between the two calls.
    async fn write_record_if_absent(&self, record: &LinkRecord) -> Result<bool> {
        if self.exists(record.id).await? {
            return Ok(false);
        }
        self.write_record(record).await?;
        Ok(true)
    }

    /// Schedules the record for eviction at the given absolute instant.
    async fn set_expiry(&self, id: u64, at: Timestamp) -> Result<()>;

    /// Reads a single field. `None` when the record or field is absent.
    async fn read_field(&self, id: u64, name: &str) -> Result<Option<String>>;

    /// Adds `delta` to a numeric field and returns the new value.
    ///
    /// Follows hash-increment semantics: an absent field counts as zero, and
    /// an absent record is created on the spot.
    async fn increment_field(&self, id: u64, name: &str, delta: i64) -> Result<i64>;

    /// Reads the full field map. Empty when the record is absent.
    async fn read_all_fields(&self, id: u64) -> Result<HashMap<String, String>>;

    /// Releases any pooled connections held by the backend.
    async fn close(&self) -> Result<()>;
}
