use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::error::OverlayResult;
use crate::overlay::loader::{OverlaySource, load_document};
use crate::overlay::model::OverlayDocument;

/// Shared source -> document cache for players that show the same overlay.
///
/// Only successful loads are stored, so a failed source is retried on the next request.
/// Entries live until [`OverlayCache::invalidate`] or [`OverlayCache::clear`].
#[derive(Debug, Default)]
pub struct OverlayCache {
    entries: Mutex<HashMap<OverlaySource, Arc<OverlayDocument>>>,
}

impl OverlayCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<OverlaySource, Arc<OverlayDocument>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, source: &OverlaySource) -> Option<Arc<OverlayDocument>> {
        self.lock().get(source).cloned()
    }

    pub fn insert(&self, source: OverlaySource, doc: Arc<OverlayDocument>) {
        self.lock().insert(source, doc);
    }

    /// Return the cached document or load it. Load errors are returned and not cached.
    ///
    /// The lock is not held across I/O; concurrent misses may both load, last insert wins.
    pub fn get_or_load(&self, source: &OverlaySource) -> OverlayResult<Arc<OverlayDocument>> {
        if let Some(doc) = self.get(source) {
            tracing::debug!(source = %source, "overlay cache hit");
            return Ok(doc);
        }
        let doc = Arc::new(load_document(source)?);
        self.insert(source.clone(), Arc::clone(&doc));
        Ok(doc)
    }

    /// Like [`OverlayCache::get_or_load`], but failures degrade to `None` after logging.
    pub fn get_or_fetch(&self, source: &OverlaySource) -> Option<Arc<OverlayDocument>> {
        match self.get_or_load(source) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "overlay unavailable; drawing nothing");
                None
            }
        }
    }

    pub fn invalidate(&self, source: &OverlaySource) -> bool {
        self.lock().remove(source).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
