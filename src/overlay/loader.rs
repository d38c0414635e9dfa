use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::cache::OverlayCache;
use crate::overlay::model::OverlayDocument;

/// Where an overlay document comes from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverlaySource {
    Path(PathBuf),
    Url(String),
}

impl OverlaySource {
    /// `http://` and `https://` strings are URLs, everything else is a filesystem path.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_owned())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for OverlaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

fn http_client() -> OverlayResult<&'static reqwest::blocking::Client> {
    static CLIENT: OnceLock<reqwest::blocking::Client> = OnceLock::new();
    if let Some(c) = CLIENT.get() {
        return Ok(c);
    }
    let client = reqwest::blocking::Client::builder()
        .build()
        .context("failed to build http client")?;
    Ok(CLIENT.get_or_init(|| client))
}

fn read_source_bytes(source: &OverlaySource) -> OverlayResult<Vec<u8>> {
    match source {
        OverlaySource::Path(p) => Ok(std::fs::read(p)
            .with_context(|| format!("read overlay '{}'", p.display()))?),
        OverlaySource::Url(u) => {
            let resp = http_client()?
                .get(u)
                .send()
                .map_err(|e| OverlayError::load(format!("GET {u} failed: {e}")))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(OverlayError::load(format!("GET {u} returned {status}")));
            }
            let bytes = resp
                .bytes()
                .map_err(|e| OverlayError::load(format!("GET {u} body read failed: {e}")))?;
            Ok(bytes.to_vec())
        }
    }
}

/// Load and validate a document, surfacing every failure.
#[tracing::instrument(skip_all, fields(source = %source))]
pub fn load_document(source: &OverlaySource) -> OverlayResult<OverlayDocument> {
    let bytes = read_source_bytes(source)?;
    let doc = OverlayDocument::from_json_slice(&bytes)?;
    tracing::debug!(frames = doc.frames.len(), "overlay document loaded");
    Ok(doc)
}

/// Load a document, degrading any failure to `None`. Failures are logged, never returned.
pub fn fetch_overlay(source: &OverlaySource) -> Option<OverlayDocument> {
    match load_document(source) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(source = %source, error = %e, "overlay unavailable; drawing nothing");
            None
        }
    }
}

/// Result of one background fetch, tagged with the generation that requested it.
#[derive(Debug)]
pub struct LoadResult {
    pub generation: u64,
    pub document: Option<Arc<OverlayDocument>>,
}

/// Handle to a fetch running on a background thread.
///
/// Once cancelled the worker never delivers its result.
#[derive(Debug)]
pub struct PendingOverlay {
    generation: u64,
    cancelled: Arc<AtomicBool>,
    rx: Receiver<LoadResult>,
}

impl PendingOverlay {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Non-blocking poll. `Some` exactly once, when the fetch has resolved.
    pub fn try_take(&self) -> Option<LoadResult> {
        if self.is_cancelled() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(r) => Some(r),
            Err(TryRecvError::Empty) => None,
            // Worker went away without delivering; treat as a failed load.
            Err(TryRecvError::Disconnected) => Some(LoadResult {
                generation: self.generation,
                document: None,
            }),
        }
    }

    /// Block until the fetch resolves or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<LoadResult> {
        if self.is_cancelled() {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(LoadResult {
                generation: self.generation,
                document: None,
            }),
        }
    }
}

/// Start fetching `source` on a background thread.
///
/// With a cache, a hit resolves without I/O and a successful load is inserted.
pub fn spawn_fetch(
    source: OverlaySource,
    generation: u64,
    cache: Option<Arc<OverlayCache>>,
) -> PendingOverlay {
    let (tx, rx) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let spawned = std::thread::Builder::new()
        .name(format!("overlay-fetch-{generation}"))
        .spawn(move || {
            let document = match cache.as_deref() {
                Some(cache) => cache.get_or_fetch(&source),
                None => fetch_overlay(&source).map(Arc::new),
            };
            if flag.load(Ordering::SeqCst) {
                tracing::debug!(generation, "overlay fetch finished after cancellation; dropped");
                return;
            }
            let _ = tx.send(LoadResult {
                generation,
                document,
            });
        });

    if let Err(e) = spawned {
        // The sender was moved into the closure and dropped, so the handle reports a failed load.
        tracing::warn!(error = %e, "failed to spawn overlay fetch thread");
    }

    PendingOverlay {
        generation,
        cancelled,
        rx,
    }
}
