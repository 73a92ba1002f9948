//! Persisted history must load or be rejected; never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use sculpt_state::ModelStore;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        if let Ok(store) = ModelStore::from_json(json) {
            let _ = store.to_json();
            if let Some(head) = store.head_version() {
                let _ = store.lineage(head);
            }
        }
    }
});
