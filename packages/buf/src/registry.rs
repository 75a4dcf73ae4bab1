//! Store implementation selection.
//!
//! Several [`ByteStore`] implementations are registered in a fixed
//! preference order. Each declares an availability probe; the first
//! implementation whose probe passes becomes the default allocation target
//! for size- and content-based buffer construction. Selection happens once,
//! on first use, and is only reconsidered through an explicit override.

use std::sync::RwLock;

use lazy_static::lazy_static;
use log::{debug, warn};

use crate::heap::HeapProvider;
use crate::paged::PagedProvider;
use crate::store::ByteStore;
use crate::temp_file::TempFileProvider;

/// A store implementation plus its availability probe.
pub trait StoreProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the implementation can run in this environment. Probed once
    /// when the default is selected.
    fn is_available(&self) -> bool {
        true
    }

    /// Allocates a zero-filled store of `len` bytes.
    ///
    /// May panic if availability was lost after probing; losing the
    /// selected implementation mid-run is fatal.
    fn alloc(&self, len: usize) -> Box<dyn ByteStore>;
}

/// Registered implementations in preference order.
pub static PROVIDERS: [&dyn StoreProvider; 3] =
    [&HeapProvider, &PagedProvider, &TempFileProvider];

lazy_static! {
    static ref SELECTED: RwLock<&'static dyn StoreProvider> = RwLock::new(select());
}

fn select() -> &'static dyn StoreProvider {
    for provider in PROVIDERS {
        if provider.is_available() {
            debug!("selected byte store implementation '{}'", provider.name());
            return provider;
        }
        warn!("byte store implementation '{}' is unavailable", provider.name());
    }
    panic!("no byte store implementation is available");
}

/// The implementation used for default buffer allocation.
pub fn default_provider() -> &'static dyn StoreProvider {
    *SELECTED.read().expect("store registry lock poisoned")
}

/// Overrides the default selection. Intended for tests and for embedders
/// that know better than the probe order.
pub fn set_default_provider(provider: &'static dyn StoreProvider) {
    *SELECTED.write().expect("store registry lock poisoned") = provider;
}

/// Every registered implementation whose probe currently passes.
pub fn available_providers() -> Vec<&'static dyn StoreProvider> {
    PROVIDERS.iter().copied().filter(|p| p.is_available()).collect()
}

pub(crate) fn alloc_default(len: usize) -> Box<dyn ByteStore> {
    default_provider().alloc(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_is_first_preference() {
        assert_eq!(PROVIDERS[0].name(), "heap");
        assert!(available_providers().iter().any(|p| p.name() == "heap"));
    }

    #[test]
    fn override_redirects_allocation_and_restores() {
        let original = default_provider();
        set_default_provider(&PagedProvider);
        assert_eq!(default_provider().name(), "paged");
        let store = alloc_default(10);
        assert_eq!(store.len(), 10);
        set_default_provider(original);
    }
}
