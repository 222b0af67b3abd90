//! In-process store for dry runs (`REMOTE_STORE=memory`) and tests.
//! Dry runs only log what would have been written.

use super::{RemoteStore, StoreError, StoreResult};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Push(String),
    Increment(String),
}

#[derive(Default)]
struct State {
    records: Vec<(String, String, Value)>,
    counters: HashMap<String, i64>,
    ops: Vec<StoreOp>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Makes every following write fail until switched off again.
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|(c, _, _)| c == collection)
            .map(|(_, _, v)| v.clone())
            .collect()
    }

    pub fn counter(&self, path: &str) -> i64 {
        self.state.lock().counters.get(path).copied().unwrap_or(0)
    }

    /// Every attempted write, failed ones included, in call order.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.state.lock().ops.clone()
    }
}

impl MemoryStore {
    fn check_available(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }

    fn push_now(&self, collection: &str, value: &Value) -> StoreResult<String> {
        let mut state = self.state.lock();
        state.ops.push(StoreOp::Push(collection.to_string()));
        self.check_available()?;

        let key = Uuid::new_v4().simple().to_string();
        state
            .records
            .push((collection.to_string(), key.clone(), value.clone()));
        info!(collection = %collection, key = %key, "Stored record in memory");
        Ok(key)
    }

    fn increment_now(&self, path: &str) -> StoreResult<i64> {
        let mut state = self.state.lock();
        state.ops.push(StoreOp::Increment(path.to_string()));
        self.check_available()?;

        let counter = state.counters.entry(path.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

impl RemoteStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn push<'a>(&'a self, collection: &'a str, value: &'a Value) -> BoxFuture<'a, StoreResult<String>> {
        Box::pin(async move { self.push_now(collection, value) })
    }

    fn increment<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StoreResult<i64>> {
        Box::pin(async move { self.increment_now(path) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_counters_start_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.counter("stats/totalEmergencies"), 0);
        assert_eq!(store.increment("stats/totalEmergencies").await.unwrap(), 1);
        assert_eq!(store.increment("stats/totalEmergencies").await.unwrap(), 2);
        assert_eq!(store.counter("stats/totalEmergencies"), 2);
    }

    #[tokio::test]
    async fn test_failing_writes_are_logged_but_not_applied() {
        let store = MemoryStore::new();
        store.set_failing(true);

        assert!(store.push("emergencies", &json!({})).await.is_err());
        assert!(store.increment("stats/activeEmergencies").await.is_err());
        assert!(store.records("emergencies").is_empty());
        assert_eq!(store.counter("stats/activeEmergencies"), 0);
        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Push("emergencies".to_string()),
                StoreOp::Increment("stats/activeEmergencies".to_string()),
            ]
        );

        store.set_failing(false);
        let key = store.push("emergencies", &json!({ "userId": "DEV-003" })).await.unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(store.records("emergencies")[0]["userId"], "DEV-003");
    }
}
