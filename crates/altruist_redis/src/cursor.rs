use std::marker::PhantomData;

use crate::documents::RedisDocument;
use crate::error::BackplaneError;
use crate::pool::RedisPool;

/// An async cursor over every document of type `T` (optionally scoped to a
/// `group`), produced by [`crate::documents::DocumentStore`]'s `getAll`
/// equivalent.
///
/// SCANs keys in pages, `MGET`s their values, and yields one decoded batch
/// at a time. Not restartable — a consumer that needs to re-read from the
/// start creates a new cursor.
pub struct DocumentCursor<T: RedisDocument> {
    pool: RedisPool,
    pattern: String,
    batch_size: usize,
    scan_cursor: u64,
    scan_exhausted: bool,
    pending_keys: Vec<String>,
    has_next: bool,
    _marker: PhantomData<T>,
}

impl<T: RedisDocument> DocumentCursor<T> {
    pub(crate) fn new(pool: RedisPool, group: Option<&str>, batch_size: usize) -> Self {
        let pattern = match group {
            Some(g) => format!("{}_{g}:*", T::PREFIX),
            None => format!("{}:*", T::PREFIX),
        };
        Self {
            pool,
            pattern,
            batch_size: batch_size.max(1),
            scan_cursor: 0,
            scan_exhausted: false,
            pending_keys: Vec::new(),
            has_next: true,
            _marker: PhantomData,
        }
    }

    /// Whether the last batch returned by [`Self::next_batch`] was full —
    /// the source's own (imprecise but documented) signal that more might
    /// remain, rather than tracking the underlying `SCAN` cursor directly.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Fetches keys until at least `batch_size` are buffered (or the
    /// underlying `SCAN` is exhausted), `MGET`s that page, and decodes each
    /// value into `T`. Returns an empty vec once the scan is exhausted and
    /// the buffer has drained.
    pub async fn next_batch(&mut self) -> Result<Vec<T>, BackplaneError> {
        while self.pending_keys.len() < self.batch_size && !self.scan_exhausted {
            let (next_cursor, keys) = self.pool.scan_page(&self.pattern, self.scan_cursor, self.batch_size).await?;
            self.pending_keys.extend(keys);
            self.scan_cursor = next_cursor;
            if next_cursor == 0 {
                self.scan_exhausted = true;
            }
        }

        let take = self.pending_keys.len().min(self.batch_size);
        let page: Vec<String> = self.pending_keys.drain(..take).collect();
        self.has_next = page.len() == self.batch_size;

        if page.is_empty() {
            return Ok(Vec::new());
        }

        let raw_values = self.pool.mget(&page).await?;
        let mut out = Vec::with_capacity(raw_values.len());
        for raw in raw_values.into_iter().flatten() {
            out.push(crate::documents::decode_for_cursor::<T>(&raw)?);
        }
        Ok(out)
    }
}
