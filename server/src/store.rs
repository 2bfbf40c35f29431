//! Conversation store: conversation id → last upstream response id.
//!
//! DESIGN
//! ======
//! The upstream provider keeps the actual conversation context; all the
//! server remembers is the continuation token of the most recent reply in
//! each conversation. One entry per conversation, latest write wins.
//!
//! `ConversationStore` is the seam the chat service depends on. The
//! in-memory implementation lives for the process lifetime and is handed
//! to the service at startup, so tests build their own isolated instance.
//!
//! TRADE-OFFS
//! ==========
//! Abandoned conversations would otherwise accumulate forever. Entries carry
//! a last-touched timestamp: an entry idle for longer than the TTL reads as
//! absent, and inserting past capacity evicts the least recently touched
//! conversation. A pruned conversation simply restarts without upstream
//! context on its next turn.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or returned an error.
    #[error("conversation store backend failed: {0}")]
    Backend(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "E_STORE_BACKEND",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// Maps a conversation to the provider's most recent response id.
///
/// Calls for different conversations never interfere. Racing a read against
/// a write for the same conversation may observe either value.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Continuation token for `conversation_id`, or `None` on the first turn.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    async fn get(&self, conversation_id: Uuid) -> Result<Option<String>, StoreError>;

    /// Record `response_id` as the latest reply, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    async fn set(&self, conversation_id: Uuid, response_id: String) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Memory bounds for [`MemoryConversationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Idle time after which an entry is dropped.
    pub ttl: Duration,
    /// Maximum number of conversations tracked at once.
    pub capacity: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(crate::config::DEFAULT_STORE_TTL_SECS),
            capacity: crate::config::DEFAULT_STORE_CAPACITY,
        }
    }
}

struct Entry {
    response_id: String,
    touched: Instant,
}

/// Process-local store. Cheap to clone; clones share the same map.
#[derive(Clone)]
pub struct MemoryConversationStore {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    limits: StoreLimits,
}

impl MemoryConversationStore {
    #[must_use]
    pub fn new(limits: StoreLimits) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), limits }
    }

    #[must_use]
    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    /// Number of conversations currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry idle longer than the TTL. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Internal: lookup with explicit timestamp (for testing).
    fn get_at(&self, conversation_id: Uuid, now: Instant) -> Option<String> {
        let mut map = self.lock();
        let expired = is_expired(map.get(&conversation_id)?, now, self.limits.ttl);
        if expired {
            map.remove(&conversation_id);
            debug!(%conversation_id, "store: entry expired on read");
            return None;
        }
        let entry = map.get_mut(&conversation_id)?;
        entry.touched = now;
        Some(entry.response_id.clone())
    }

    /// Internal: insert/overwrite with explicit timestamp (for testing).
    fn set_at(&self, conversation_id: Uuid, response_id: String, now: Instant) {
        let mut map = self.lock();
        if !map.contains_key(&conversation_id) && map.len() >= self.limits.capacity {
            prune(&mut map, now, self.limits.ttl);
            while map.len() >= self.limits.capacity {
                let Some(oldest) = least_recently_touched(&map) else {
                    break;
                };
                map.remove(&oldest);
                debug!(conversation_id = %oldest, "store: evicted at capacity");
            }
        }
        map.insert(conversation_id, Entry { response_id, touched: now });
    }

    fn prune_expired_at(&self, now: Instant) -> usize {
        let mut map = self.lock();
        prune(&mut map, now, self.limits.ttl)
    }
}

impl Default for MemoryConversationStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

#[async_trait::async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, conversation_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.get_at(conversation_id, Instant::now()))
    }

    async fn set(&self, conversation_id: Uuid, response_id: String) -> Result<(), StoreError> {
        self.set_at(conversation_id, response_id, Instant::now());
        Ok(())
    }
}

fn is_expired(entry: &Entry, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(entry.touched) >= ttl
}

fn prune(map: &mut HashMap<Uuid, Entry>, now: Instant, ttl: Duration) -> usize {
    let before = map.len();
    map.retain(|_, entry| !is_expired(entry, now, ttl));
    before - map.len()
}

fn least_recently_touched(map: &HashMap<Uuid, Entry>) -> Option<Uuid> {
    map.iter()
        .min_by_key(|(_, entry)| entry.touched)
        .map(|(id, _)| *id)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
