//! Per-user browser-session storage for event fan-out.
//!
//! [`UserSessionRegistry`] maps user ids to the set of their live browser
//! connections. A user with several tabs open has several entries in the
//! set; there is no supersede here, every session is kept.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::UserId;
use super::handle::ConnectionHandle;

/// Central store for all live browser sessions, grouped by user.
///
/// A handle appears in exactly one user's set. Removal is idempotent
/// because disconnect cleanup may race with process shutdown; when a
/// user's set empties, the entry is evicted so the map never accumulates
/// dangling users.
#[derive(Debug, Default)]
pub struct UserSessionRegistry {
    sessions: RwLock<HashMap<UserId, Vec<Arc<ConnectionHandle>>>>,
}

impl UserSessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handle` to `user_id`'s session set.
    pub async fn add(&self, user_id: UserId, handle: Arc<ConnectionHandle>) {
        let mut map = self.sessions.write().await;
        map.entry(user_id).or_default().push(handle);
    }

    /// Removes `handle` from `user_id`'s session set. Idempotent: removing
    /// an already-removed handle is a no-op. Returns `true` when a removal
    /// happened.
    pub async fn remove(&self, user_id: &UserId, handle: &Arc<ConnectionHandle>) -> bool {
        let mut map = self.sessions.write().await;
        let Some(handles) = map.get_mut(user_id) else {
            return false;
        };
        let before = handles.len();
        handles.retain(|h| !Arc::ptr_eq(h, handle));
        let removed = handles.len() < before;
        if handles.is_empty() {
            map.remove(user_id);
        }
        removed
    }

    /// Returns a snapshot copy of `user_id`'s current sessions.
    ///
    /// Callers iterate the snapshot to fan out; concurrent connects and
    /// disconnects never invalidate it.
    pub async fn sessions_of(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        let map = self.sessions.read().await;
        map.get(user_id).cloned().unwrap_or_default()
    }

    /// Returns a snapshot of every session handle across all users.
    ///
    /// Used at shutdown to close all connections through the ordinary
    /// disconnect path.
    pub async fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        let map = self.sessions.read().await;
        map.values().flatten().cloned().collect()
    }

    /// Returns the number of users with at least one live session.
    pub async fn user_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SessionId;

    fn make_session(user: &str) -> Arc<ConnectionHandle> {
        let (handle, _rx) =
            ConnectionHandle::for_browser(UserId::new(user), SessionId::new(), 8);
        handle
    }

    #[tokio::test]
    async fn add_and_snapshot_sessions() {
        let registry = UserSessionRegistry::new();
        let user = UserId::new("alice");
        let s1 = make_session("alice");
        let s2 = make_session("alice");

        registry.add(user.clone(), Arc::clone(&s1)).await;
        registry.add(user.clone(), Arc::clone(&s2)).await;

        let sessions = registry.sessions_of(&user).await;
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = UserSessionRegistry::new();
        let user = UserId::new("alice");
        let s1 = make_session("alice");
        let s2 = make_session("alice");

        registry.add(user.clone(), Arc::clone(&s1)).await;
        registry.add(user.clone(), Arc::clone(&s2)).await;

        assert!(registry.remove(&user, &s1).await);
        assert!(!registry.remove(&user, &s1).await);
        assert_eq!(registry.sessions_of(&user).await.len(), 1);
    }

    #[tokio::test]
    async fn empty_set_is_evicted() {
        let registry = UserSessionRegistry::new();
        let user = UserId::new("alice");
        let s1 = make_session("alice");

        registry.add(user.clone(), Arc::clone(&s1)).await;
        assert_eq!(registry.user_count().await, 1);

        let _ = registry.remove(&user, &s1).await;
        assert_eq!(registry.user_count().await, 0);
        assert!(registry.sessions_of(&user).await.is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let registry = UserSessionRegistry::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        registry.add(alice.clone(), make_session("alice")).await;
        registry.add(bob.clone(), make_session("bob")).await;

        assert_eq!(registry.sessions_of(&alice).await.len(), 1);
        assert_eq!(registry.sessions_of(&bob).await.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_spans_all_users() {
        let registry = UserSessionRegistry::new();
        registry.add(UserId::new("alice"), make_session("alice")).await;
        registry.add(UserId::new("bob"), make_session("bob")).await;
        assert_eq!(registry.snapshot().await.len(), 2);
    }
}
