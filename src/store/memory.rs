//! In-Memory Option Store
//!
//! HashMap-backed `OptionStore` shared across lifecycles.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{OptionStore, Preload};

// == Stored Option ==
#[derive(Debug, Clone)]
struct StoredOption {
    bytes: Vec<u8>,
    preload: Preload,
}

// == Memory Option Store ==
/// Process-local option store.
///
/// Cloning the store is not supported; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: RwLock<HashMap<String, StoredOption>>,
}

impl MemoryOptionStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the number of stored options.
    pub fn len(&self) -> usize {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // == Is Empty ==
    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Contains ==
    /// Returns true if `key` exists.
    pub fn contains(&self, key: &str) -> bool {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl OptionStore for MemoryOptionStore {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|option| option.bytes.clone())
    }

    fn add(&self, key: &str, bytes: Vec<u8>, preload: Preload) -> bool {
        let mut options = self.options.write().unwrap_or_else(PoisonError::into_inner);
        if options.contains_key(key) {
            return false;
        }
        options.insert(key.to_string(), StoredOption { bytes, preload });
        true
    }

    fn update(&self, key: &str, bytes: Vec<u8>) -> bool {
        let mut options = self.options.write().unwrap_or_else(PoisonError::into_inner);
        match options.get_mut(key) {
            Some(option) => {
                option.bytes = bytes;
                true
            }
            None => false,
        }
    }

    fn remove(&self, key: &str) -> bool {
        self.options
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    fn is_preloaded(&self, key: &str) -> bool {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|option| option.preload == Preload::Always)
    }
}
