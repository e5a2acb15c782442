//! Result cache domain module

pub mod entities;

pub use entities::{CacheEntry, CacheStatus};
