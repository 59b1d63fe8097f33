//! Storage collaborators for the built-in handler modules.
//!
//! - [`ClockSource`]: wall-clock abstraction for record timestamps
//! - [`MemoryStore`]: in-memory [`SightingStore`](crate::traits::SightingStore)

pub mod memory;

use std::time::{SystemTime, UNIX_EPOCH};

pub use memory::MemoryStore;

/// Source of wall-clock milliseconds since the Unix epoch.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> u64;
}

/// [`ClockSource`] backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
