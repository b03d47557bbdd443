//! Per-user session state: which cart a user is currently filling.
//!
//! Each user has their own async mutex. A message holds its user's lock from
//! the override check until the new cart id is recorded, so two near-simultaneous
//! "create cart" messages from one user cannot both see "no cart". Different
//! users never contend.
//!
//! Only users with a recorded cart keep an entry. A slot that ends up with no
//! cart and no other holder is removed when its guard is released.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Slots = DashMap<String, Arc<Mutex<Option<u64>>>>;

/// Exclusive access to one user's session.
///
/// Released on drop.
pub struct SessionGuard {
    user_id: String,
    guard: Option<OwnedMutexGuard<Option<u64>>>,
    slots: Arc<Slots>,
}

impl SessionGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Active cart, if the user has created one.
    pub fn cart_id(&self) -> Option<u64> {
        self.guard.as_deref().copied().flatten()
    }

    /// Record the user's active cart. Replaces any earlier cart id.
    pub fn set_cart(&mut self, cart_id: u64) {
        debug!(user = %self.user_id, cart_id, "Session cart recorded");
        if let Some(guard) = self.guard.as_mut() {
            **guard = Some(cart_id);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // The guard keeps its own reference to the slot; release it first.
        drop(self.guard.take());
        prune(&self.slots, &self.user_id);
    }
}

/// Remove a user's slot if it holds no cart and nobody else references it.
///
/// Runs under the shard lock, so no new holder can appear between the check
/// and the removal.
fn prune(slots: &Slots, user_id: &str) {
    slots.remove_if(user_id, |_, slot| {
        Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|cart| cart.is_none())
    });
}

/// Process-wide mapping from user identity to active cart. In-memory, no expiry.
#[derive(Debug, Default)]
pub struct SessionStore {
    slots: Arc<Slots>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the user's session for a read-modify-write sequence.
    pub async fn lock(&self, user_id: &str) -> SessionGuard {
        // Clone the Arc so the map shard is not held while waiting.
        let slot = Arc::clone(self.slots.entry(user_id.to_string()).or_default().value());
        SessionGuard {
            user_id: user_id.to_string(),
            guard: Some(slot.lock_owned().await),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Active cart for a user, if any.
    pub async fn get(&self, user_id: &str) -> Option<u64> {
        let slot = self.slots.get(user_id).map(|s| Arc::clone(s.value()))?;
        let cart_id = *slot.lock().await;
        drop(slot);
        prune(&self.slots, user_id);
        cart_id
    }

    /// Record the user's active cart.
    pub async fn set(&self, user_id: &str, cart_id: u64) {
        self.lock(user_id).await.set_cart(cart_id);
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_absent_user_has_no_cart() {
        let store = SessionStore::new();
        assert_eq!(store.get("+5491100000000").await, None);
        assert_eq!(store.entries(), 0);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = SessionStore::new();
        store.set("alice", 7).await;
        store.set("alice", 9).await;
        store.set("bob", 3).await;

        assert_eq!(store.get("alice").await, Some(9));
        assert_eq!(store.get("bob").await, Some(3));
        assert_eq!(store.entries(), 2);
    }

    #[tokio::test]
    async fn test_guard_records_cart() {
        let store = SessionStore::new();
        {
            let mut session = store.lock("alice").await;
            assert_eq!(session.user_id(), "alice");
            assert_eq!(session.cart_id(), None);
            session.set_cart(12);
            assert_eq!(session.cart_id(), Some(12));
        }
        assert_eq!(store.get("alice").await, Some(12));
    }

    #[tokio::test]
    async fn test_lock_without_cart_leaves_no_entry() {
        let store = SessionStore::new();
        for i in 0..50 {
            let session = store.lock(&format!("sender-{i}")).await;
            assert_eq!(session.cart_id(), None);
        }
        assert_eq!(store.entries(), 0);

        store.set("alice", 4).await;
        drop(store.lock("alice").await);
        assert_eq!(store.entries(), 1);
        assert_eq!(store.get("alice").await, Some(4));
    }

    #[tokio::test]
    async fn test_waiting_holder_keeps_the_slot() {
        let store = Arc::new(SessionStore::new());
        let guard = store.lock("alice").await;

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut session = store.lock("alice").await;
                session.set_cart(8);
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        // released without a cart while the other message is queued
        drop(guard);
        waiter.await.unwrap();

        assert_eq!(store.get("alice").await, Some(8));
    }

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let store = Arc::new(SessionStore::new());
        let guard = store.lock("alice").await;

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let session = store.lock("alice").await;
                session.cart_id()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let mut guard = guard;
        guard.set_cart(5);
        drop(guard);

        assert_eq!(waiter.await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_other_users_do_not_wait() {
        let store = SessionStore::new();
        let _alice = store.lock("alice").await;

        let bob = tokio::time::timeout(Duration::from_millis(100), store.lock("bob")).await;
        assert!(bob.is_ok());
    }
}
