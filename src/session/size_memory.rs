use std::sync::{Arc, Mutex};

use crate::host::SurfaceSize;
use crate::settings::SettingsStore;

/// Last known PiP surface size, persisted on every resize.
///
/// Advisory only: nothing here asks the native layer to restore it.
pub struct SizeMemory {
    store: Arc<SettingsStore>,
    last: Mutex<Option<SurfaceSize>>,
}

impl SizeMemory {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        let last = store.load_last_size();
        Self {
            store,
            last: Mutex::new(last),
        }
    }

    pub fn record(&self, size: SurfaceSize) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        match self.last.lock() {
            Ok(mut last) => *last = Some(size),
            Err(poisoned) => *poisoned.into_inner() = Some(size),
        }
        log::trace!("[PIP] Surface resized to {}x{}", size.width, size.height);
        // Failure is already logged by the store; the in-memory value stays
        let _ = self.store.save_last_size(size);
    }

    pub fn last(&self) -> Option<SurfaceSize> {
        match self.last.lock() {
            Ok(last) => *last,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemoryBackend, SettingsBackend, LAST_SIZE_KEY};
    use crate::tests::test_data_helpers::FailingBackend;
    use serde_json::json;

    #[test]
    fn test_record_overwrites_and_persists() {
        let backend = Arc::new(MemoryBackend::new());
        let memory = SizeMemory::new(Arc::new(SettingsStore::new(backend.clone())));
        assert_eq!(memory.last(), None);

        memory.record(SurfaceSize { width: 320, height: 180 });
        memory.record(SurfaceSize { width: 640, height: 360 });

        assert_eq!(memory.last(), Some(SurfaceSize { width: 640, height: 360 }));
        assert_eq!(
            backend.read(LAST_SIZE_KEY).unwrap(),
            Some(json!({"width": 640, "height": 360}))
        );
    }

    #[test]
    fn test_loads_previous_size() {
        let backend = Arc::new(MemoryBackend::with_values([(
            LAST_SIZE_KEY,
            json!({"width": 500, "height": 281}),
        )]));
        let memory = SizeMemory::new(Arc::new(SettingsStore::new(backend)));
        assert_eq!(memory.last(), Some(SurfaceSize { width: 500, height: 281 }));
    }

    #[test]
    fn test_storage_failure_keeps_value_in_memory() {
        let memory = SizeMemory::new(Arc::new(SettingsStore::new(Arc::new(FailingBackend))));
        memory.record(SurfaceSize { width: 300, height: 200 });
        assert_eq!(memory.last(), Some(SurfaceSize { width: 300, height: 200 }));
    }

    #[test]
    fn test_degenerate_sizes_ignored() {
        let memory = SizeMemory::new(Arc::new(SettingsStore::new(Arc::new(MemoryBackend::new()))));
        memory.record(SurfaceSize { width: 0, height: 200 });
        assert_eq!(memory.last(), None);
    }
}
