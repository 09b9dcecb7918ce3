//! In-memory thread store (non-persistent).
//!
//! Threads live for the lifetime of the process. There is no eviction and no
//! capacity bound.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{Thread, ThreadHandle, ThreadStore};

#[derive(Clone, Default)]
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<String, ThreadHandle>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn get_or_create(&self, id: &str) -> ThreadHandle {
        if let Some(handle) = self.threads.read().await.get(id) {
            return handle.clone();
        }

        let mut threads = self.threads.write().await;
        threads
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(thread_id = %id, "Creating thread");
                Arc::new(Mutex::new(Thread::new(id)))
            })
            .clone()
    }

    async fn get(&self, id: &str) -> Option<ThreadHandle> {
        self.threads.read().await.get(id).cloned()
    }

    async fn delete(&self, id: &str) -> bool {
        let removed = self.threads.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(thread_id = %id, "Deleted thread");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn unseen_ids_get_empty_threads() {
        let store = InMemoryThreadStore::new();
        for id in ["a", "b", "c"] {
            let handle = store.get_or_create(id).await;
            let thread = handle.lock().await;
            assert_eq!(thread.id(), id);
            assert!(thread.is_empty());
        }
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_thread() {
        let store = InMemoryThreadStore::new();
        let first = store.get_or_create("t").await;
        let second = store.get_or_create("t").await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn append_is_monotonic() {
        let store = InMemoryThreadStore::new();
        for i in 0..5 {
            store.append("t", ChatMessage::user(format!("msg {i}"))).await;
            assert_eq!(store.snapshot("t").await.unwrap().len(), i + 1);
        }

        let thread = store.snapshot("t").await.unwrap();
        assert_eq!(thread.messages()[0].text(), "msg 0");
        assert_eq!(thread.messages()[4].text(), "msg 4");
    }

    #[tokio::test]
    async fn delete_purges_history() {
        let store = InMemoryThreadStore::new();
        store.append("t", ChatMessage::user("hello")).await;

        assert!(store.delete("t").await);
        assert!(!store.delete("t").await);
        assert!(store.snapshot("t").await.is_none());

        let handle = store.get_or_create("t").await;
        assert!(handle.lock().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_of_unknown_thread_is_none() {
        let store = InMemoryThreadStore::new();
        assert!(store.snapshot("missing").await.is_none());
        assert!(!store.is_persistent());
    }
}
