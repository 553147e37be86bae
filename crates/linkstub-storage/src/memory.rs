use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use linkstub_core::{BackendError, KvBackend, LinkRecord};
use std::collections::HashMap;

type Result<T> = std::result::Result<T, BackendError>;

/// One stored record: its field map plus the eviction instant, if set.
#[derive(Debug, Clone, Default)]
struct Stored {
    fields: HashMap<String, String>,
    expire_at: Option<Timestamp>,
}

impl Stored {
    fn new(record: &LinkRecord) -> Self {
        let fields = record
            .to_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Self {
            fields,
            expire_at: None,
        }
    }

    fn is_expired(&self) -> bool {
        self.expire_at
            .is_some_and(|expire_at| Timestamp::now() >= expire_at)
    }
}

/// In-memory implementation of [`KvBackend`] backed by a DashMap.
///
/// Expiry is emulated lazily: expired entries are treated as absent by every
/// read path and removed when encountered. DashMap's sharded locks allow
/// concurrent access to different buckets without blocking.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: DashMap<u64, Stored>,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Creates an in-memory backend with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
        }
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    async fn exists(&self, id: u64) -> Result<bool> {
        let Some(stored) = self.entries.get(&id) else {
            return Ok(false);
        };

        if stored.is_expired() {
            drop(stored);
            self.entries.remove(&id);
            return Ok(false);
        }

        Ok(true)
    }

    async fn write_record(&self, record: &LinkRecord) -> Result<()> {
        match self.entries.entry(record.id) {
            // A plain multi-field write leaves a previously set expiry alone,
            // matching hash-write semantics.
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().fields = Stored::new(record).fields;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Stored::new(record));
            }
        }
        Ok(())
    }

    async fn write_record_if_absent(&self, record: &LinkRecord) -> Result<bool> {
        // The entry guard holds the shard lock, making the claim atomic.
        match self.entries.entry(record.id) {
            Entry::Occupied(occupied) if !occupied.get().is_expired() => Ok(false),
            Entry::Occupied(mut occupied) => {
                occupied.insert(Stored::new(record));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Stored::new(record));
                Ok(true)
            }
        }
    }

    async fn set_expiry(&self, id: u64, at: Timestamp) -> Result<()> {
        if let Some(mut stored) = self.entries.get_mut(&id) {
            stored.expire_at = Some(at);
        }
        Ok(())
    }

    async fn read_field(&self, id: u64, name: &str) -> Result<Option<String>> {
        let Some(stored) = self.entries.get(&id) else {
            return Ok(None);
        };

        if stored.is_expired() {
            drop(stored);
            self.entries.remove(&id);
            return Ok(None);
        }

        Ok(stored.fields.get(name).cloned())
    }

    async fn increment_field(&self, id: u64, name: &str, delta: i64) -> Result<i64> {
        let mut stored = self.entries.entry(id).or_default();
        if stored.is_expired() {
            // The expired entry is gone as far as callers are concerned; the
            // increment starts over on a fresh one.
            *stored = Stored::default();
        }

        let current = match stored.fields.get(name) {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                BackendError::Operation(format!("field '{name}' is not an integer: '{raw}'"))
            })?,
            None => 0,
        };
        let next = current + delta;
        stored.fields.insert(name.to_string(), next.to_string());
        Ok(next)
    }

    async fn read_all_fields(&self, id: u64) -> Result<HashMap<String, String>> {
        let Some(stored) = self.entries.get(&id) else {
            return Ok(HashMap::new());
        };

        if stored.is_expired() {
            drop(stored);
            self.entries.remove(&id);
            return Ok(HashMap::new());
        }

        Ok(stored.fields.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use linkstub_core::field;

    fn record(id: u64, url: &str) -> LinkRecord {
        LinkRecord::new(id, url, Timestamp::now() + SignedDuration::from_hours(1))
    }

    #[tokio::test]
    async fn write_and_read_fields() {
        let backend = InMemoryBackend::new();

        backend
            .write_record(&record(1, "https://example.com"))
            .await
            .unwrap();

        let url = backend.read_field(1, field::URL).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com"));

        let fields = backend.read_all_fields(1).await.unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[field::VISITS], "0");
    }

    #[tokio::test]
    async fn absent_record_reads_empty() {
        let backend = InMemoryBackend::new();

        assert!(!backend.exists(9).await.unwrap());
        assert!(backend.read_field(9, field::URL).await.unwrap().is_none());
        assert!(backend.read_all_fields(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn conditional_write_rejects_taken_id() {
        let backend = InMemoryBackend::new();

        assert!(backend
            .write_record_if_absent(&record(1, "https://first.com"))
            .await
            .unwrap());
        assert!(!backend
            .write_record_if_absent(&record(1, "https://second.com"))
            .await
            .unwrap());

        let url = backend.read_field(1, field::URL).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://first.com"));
    }

    #[tokio::test]
    async fn conditional_write_reclaims_expired_id() {
        let backend = InMemoryBackend::new();

        backend
            .write_record(&record(1, "https://old.com"))
            .await
            .unwrap();
        backend
            .set_expiry(1, Timestamp::now() - SignedDuration::from_secs(1))
            .await
            .unwrap();

        assert!(backend
            .write_record_if_absent(&record(1, "https://new.com"))
            .await
            .unwrap());

        let url = backend.read_field(1, field::URL).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://new.com"));
    }

    #[tokio::test]
    async fn expired_record_is_absent_everywhere() {
        let backend = InMemoryBackend::new();

        backend
            .write_record(&record(1, "https://example.com"))
            .await
            .unwrap();
        backend
            .set_expiry(1, Timestamp::now() - SignedDuration::from_secs(1))
            .await
            .unwrap();

        assert!(!backend.exists(1).await.unwrap());
        assert!(backend.read_field(1, field::URL).await.unwrap().is_none());
        assert!(backend.read_all_fields(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn future_expiry_keeps_record_live() {
        let backend = InMemoryBackend::new();

        backend
            .write_record(&record(1, "https://example.com"))
            .await
            .unwrap();
        backend
            .set_expiry(1, Timestamp::now() + SignedDuration::from_hours(1))
            .await
            .unwrap();

        assert!(backend.exists(1).await.unwrap());
    }

    #[tokio::test]
    async fn increment_counts_from_zero() {
        let backend = InMemoryBackend::new();

        backend
            .write_record(&record(1, "https://example.com"))
            .await
            .unwrap();

        assert_eq!(backend.increment_field(1, field::VISITS, 1).await.unwrap(), 1);
        assert_eq!(backend.increment_field(1, field::VISITS, 1).await.unwrap(), 2);
        assert_eq!(backend.increment_field(1, field::VISITS, 3).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn increment_creates_absent_record() {
        let backend = InMemoryBackend::new();

        assert_eq!(backend.increment_field(9, field::VISITS, 1).await.unwrap(), 1);
        let fields = backend.read_all_fields(9).await.unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[tokio::test]
    async fn increment_rejects_non_numeric_field() {
        let backend = InMemoryBackend::new();

        backend
            .write_record(&record(1, "https://example.com"))
            .await
            .unwrap();

        let err = backend.increment_field(1, field::URL, 1).await.unwrap_err();
        assert!(matches!(err, BackendError::Operation(_)));
    }

    #[tokio::test]
    async fn concurrent_conditional_writes() {
        use std::sync::Arc;

        let backend = Arc::new(InMemoryBackend::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                let rec = record(i, &format!("https://example{i}.com"));
                assert!(backend.write_record_if_absent(&rec).await.unwrap());
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let url = backend.read_field(i, field::URL).await.unwrap();
            assert_eq!(url.as_deref(), Some(format!("https://example{i}.com").as_str()));
        }
    }
}
