//! Option Store Module
//!
//! The durable key-value collaborator underneath the transient cache. Every
//! option carries a preload hint deciding whether it is bulk-loaded with each
//! lifecycle or fetched on demand.

mod memory;

pub use memory::MemoryOptionStore;

// == Preload Hint ==
/// Storage-tier hint attached to an option when it is first added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preload {
    /// Loaded in bulk with every lifecycle (entries without an expiry)
    Always,
    /// Fetched with a point read when needed (entries with an expiry)
    OnDemand,
}

// == Option Store ==
/// Raw persistence for string-keyed byte payloads.
///
/// Implementations report write failures as `false`; they never panic or
/// return structured errors. `update` keeps the hint chosen by `add`.
pub trait OptionStore: Send + Sync {
    /// Returns the stored bytes for `key`, or `None` if absent.
    fn read(&self, key: &str) -> Option<Vec<u8>>;

    /// Adds a new option. Fails if `key` already exists.
    fn add(&self, key: &str, bytes: Vec<u8>, preload: Preload) -> bool;

    /// Replaces the bytes of an existing option in place. Fails if absent.
    fn update(&self, key: &str, bytes: Vec<u8>) -> bool;

    /// Removes an option. Fails if absent.
    fn remove(&self, key: &str) -> bool;

    /// Whether `key` belongs to the bulk-preloaded option set.
    fn is_preloaded(&self, key: &str) -> bool;
}
