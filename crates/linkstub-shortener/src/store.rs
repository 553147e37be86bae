use jiff::Timestamp;
use linkstub_codec as base62;
use linkstub_core::{field, KvBackend, LinkRecord, Result, StoreError};
use rand::RngExt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Collision retries before `save` fails closed.
///
/// A second draw is already vanishingly rare in a 64-bit space; reaching the
/// bound means the backend is misreporting existence, and looping forever on
/// it would be worse than failing.
const MAX_ALLOC_ATTEMPTS: u32 = 16;

/// The allocation and resolution engine for short links.
///
/// Generic over the [`KvBackend`] it persists to. Cloning is cheap; clones
/// share the backend.
#[derive(Debug)]
pub struct LinkStore<B> {
    backend: Arc<B>,
}

// Manual `Clone` to avoid the `#[derive(Clone)]` bound `B: Clone`; only the
// `Arc` is cloned, so clones share the backend regardless of whether `B` is
// itself `Clone`.
impl<B> Clone for LinkStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: KvBackend> LinkStore<B> {
    /// Creates a store over the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Shortens `url`, keeping the mapping alive until `expires_at`.
    ///
    /// Draws uniformly random identifiers until the backend accepts a
    /// conditional write, schedules eviction, and returns the encoded short
    /// code. A partial write (record claimed, expiry set failed) is not
    /// rolled back; the error is surfaced and the record ages out only if a
    /// later expiry lands.
    pub async fn save(&self, url: &str, expires_at: Timestamp) -> Result<String> {
        for attempt in 1..=MAX_ALLOC_ATTEMPTS {
            let id = rand::rng().random::<u64>();
            let record = LinkRecord::new(id, url, expires_at);

            if !self.backend.write_record_if_absent(&record).await? {
                debug!(id, attempt, "identifier collision, redrawing");
                continue;
            }

            self.backend.set_expiry(id, expires_at).await?;

            let code = base62::encode(id);
            debug!(id, code = %code, "short link saved");
            return Ok(code);
        }

        Err(StoreError::AllocationExhausted {
            attempts: MAX_ALLOC_ATTEMPTS,
        })
    }

    /// Resolves a short code to its original URL.
    ///
    /// Every successful resolution bumps the stored visit counter. The bump
    /// is best-effort: resolution never fails because bookkeeping did.
    pub async fn load(&self, code: &str) -> Result<String> {
        trace!(code, "resolving short code");
        let id = base62::decode(code)?;

        let url = self
            .backend
            .read_field(id, field::URL)
            .await?
            .filter(|url| !url.is_empty())
            .ok_or(StoreError::NotFound)?;

        self.record_visit(id).await;

        debug!(code, id, "short code resolved");
        Ok(url)
    }

    /// Returns the full stored record for a short code.
    ///
    /// Unlike [`load`](Self::load), this does not touch the visit counter.
    pub async fn load_info(&self, code: &str) -> Result<LinkRecord> {
        trace!(code, "loading link info");
        let id = base62::decode(code)?;

        let fields = self.backend.read_all_fields(id).await?;
        if fields.is_empty() {
            return Err(StoreError::NotFound);
        }

        Ok(LinkRecord::from_fields(&fields)?)
    }

    /// Releases the backend's pooled connections.
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await?;
        Ok(())
    }

    async fn record_visit(&self, id: u64) {
        if let Err(e) = self.backend.increment_field(id, field::VISITS, 1).await {
            warn!(id, error = %e, "failed to record visit");
        }
    }
}
