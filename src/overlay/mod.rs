//! Overlay documents: model, loading, caching and pipeline import.

pub mod cache;
pub mod import;
pub mod loader;
pub mod model;
