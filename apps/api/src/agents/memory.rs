use std::collections::HashMap;
use std::sync::Mutex;

/// Exchanges kept per thread; older entries are dropped.
const MAX_TURNS: usize = 10;

/// In-memory rolling conversation window, keyed by thread id. Process-local
/// by design: history that must survive restarts lives in the database.
#[derive(Default)]
pub struct ThreadMemory {
    store: Mutex<HashMap<String, Vec<String>>>,
}

impl ThreadMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last two exchanges for the thread, newest last.
    pub fn recent_context(&self, thread_id: &str) -> Option<String> {
        let store = self.lock();
        store.get(thread_id).map(|entries| {
            let start = entries.len().saturating_sub(2);
            entries[start..].join("\n")
        })
    }

    pub fn append(&self, thread_id: &str, entry: String) {
        let mut store = self.lock();
        let entries = store.entry(thread_id.to_string()).or_default();
        entries.push(entry);
        if entries.len() > MAX_TURNS {
            let drop = entries.len() - MAX_TURNS;
            entries.drain(..drop);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<String>>> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
