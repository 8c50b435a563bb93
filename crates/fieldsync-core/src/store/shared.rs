//! Process-wide store handle.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::Result;

use super::{open_store, LocalStore, StoreConfig};

static SHARED_STORE: OnceCell<Arc<dyn LocalStore>> = OnceCell::new();

/// Return the process-wide store, opening and migrating it on first use.
///
/// Concurrent first callers block until the single initialization finishes and
/// then share its result. A failed open leaves the handle uninitialized so a
/// later call can retry. The config is only consulted by the call that opens it.
pub fn shared_store(config: &StoreConfig) -> Result<Arc<dyn LocalStore>> {
    SHARED_STORE
        .get_or_try_init(|| open_store(config))
        .map(Arc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shared_store_is_opened_once_and_reused() {
        let first = shared_store(&StoreConfig::memory()).unwrap();
        first.save_inspection(&json!({ "id": 9001 })).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| shared_store(&StoreConfig::memory()).unwrap()))
            .map(|handle| handle.join().unwrap())
            .collect();

        for handle in handles {
            assert!(Arc::ptr_eq(&first, &handle));
        }
        assert!(first
            .get_inspection(crate::models::InspectionId::new(9001))
            .unwrap()
            .is_some());
    }
}
