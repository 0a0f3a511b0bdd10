//! Concurrent device-connection storage with supersede semantics.
//!
//! [`DeviceRegistry`] maps device ids to their live [`ConnectionHandle`]
//! and is the single source of truth for "is this device online". At most
//! one handle per device id is ever authoritative: a reconnect atomically
//! replaces the previous registration.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::DeviceId;
use super::handle::ConnectionHandle;

/// Central store for all live device connections.
///
/// # Concurrency
///
/// All mutation goes through the narrow operation set below; the map is
/// guarded by a [`tokio::sync::RwLock`] whose critical sections are plain
/// `HashMap` operations, so unrelated device ids never wait on each
/// other's socket I/O.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Arc<ConnectionHandle>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically installs `handle` as the authoritative connection for
    /// `device_id`, returning the superseded handle if one was registered.
    ///
    /// The caller is responsible for closing the returned handle.
    pub async fn register(
        &self,
        device_id: DeviceId,
        handle: Arc<ConnectionHandle>,
    ) -> Option<Arc<ConnectionHandle>> {
        let mut map = self.devices.write().await;
        map.insert(device_id, handle)
    }

    /// Removes the registration for `device_id` only if `handle` is still
    /// the registered instance. Returns `true` when a removal happened.
    ///
    /// The identity check guards against a stale disconnect racing a newer
    /// reconnect: cleanup of the superseded connection must not evict the
    /// fresh one.
    pub async fn unregister(&self, device_id: &DeviceId, handle: &Arc<ConnectionHandle>) -> bool {
        let mut map = self.devices.write().await;
        match map.get(device_id) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                map.remove(device_id);
                true
            }
            _ => false,
        }
    }

    /// Returns the live handle for `device_id`, if any.
    pub async fn lookup(&self, device_id: &DeviceId) -> Option<Arc<ConnectionHandle>> {
        let map = self.devices.read().await;
        map.get(device_id).cloned()
    }

    /// Returns `true` if a connection is registered for `device_id`.
    pub async fn is_online(&self, device_id: &DeviceId) -> bool {
        let map = self.devices.read().await;
        map.contains_key(device_id)
    }

    /// Returns a snapshot of every registered handle.
    ///
    /// Used at shutdown to close all connections through the ordinary
    /// disconnect path.
    pub async fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        let map = self.devices.read().await;
        map.values().cloned().collect()
    }

    /// Returns the number of registered devices.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns `true` if no device is registered.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_handle(id: &str) -> Arc<ConnectionHandle> {
        let (handle, _rx) = ConnectionHandle::for_device(DeviceId::new(id), 8);
        handle
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = DeviceRegistry::new();
        let id = DeviceId::new("D1");
        let handle = make_handle("D1");

        assert!(registry.register(id.clone(), Arc::clone(&handle)).await.is_none());
        let found = registry.lookup(&id).await;
        assert!(found.is_some_and(|h| Arc::ptr_eq(&h, &handle)));
        assert!(registry.is_online(&id).await);
    }

    #[tokio::test]
    async fn reconnect_supersedes_previous_registration() {
        let registry = DeviceRegistry::new();
        let id = DeviceId::new("D1");
        let h1 = make_handle("D1");
        let h2 = make_handle("D1");

        assert!(registry.register(id.clone(), Arc::clone(&h1)).await.is_none());
        let prev = registry.register(id.clone(), Arc::clone(&h2)).await;
        assert!(prev.is_some_and(|p| Arc::ptr_eq(&p, &h1)));

        let current = registry.lookup(&id).await;
        assert!(current.is_some_and(|c| Arc::ptr_eq(&c, &h2)));
    }

    #[tokio::test]
    async fn stale_unregister_does_not_remove_fresh_connection() {
        let registry = DeviceRegistry::new();
        let id = DeviceId::new("D1");
        let h1 = make_handle("D1");
        let h2 = make_handle("D1");

        let _ = registry.register(id.clone(), Arc::clone(&h1)).await;
        let _ = registry.register(id.clone(), Arc::clone(&h2)).await;

        // Cleanup of the superseded connection races in late.
        assert!(!registry.unregister(&id, &h1).await);
        let current = registry.lookup(&id).await;
        assert!(current.is_some_and(|c| Arc::ptr_eq(&c, &h2)));

        assert!(registry.unregister(&id, &h2).await);
        assert!(!registry.is_online(&id).await);
    }

    #[tokio::test]
    async fn lookup_unknown_device_is_none() {
        let registry = DeviceRegistry::new();
        assert!(registry.lookup(&DeviceId::new("nope")).await.is_none());
        assert!(!registry.is_online(&DeviceId::new("nope")).await);
    }

    #[tokio::test]
    async fn snapshot_returns_all_handles() {
        let registry = DeviceRegistry::new();
        let _ = registry.register(DeviceId::new("D1"), make_handle("D1")).await;
        let _ = registry.register(DeviceId::new("D2"), make_handle("D2")).await;

        assert_eq!(registry.snapshot().await.len(), 2);
        assert_eq!(registry.len().await, 2);
        assert!(!registry.is_empty().await);
    }
}
