//! In-memory store implementations for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{BackedUpAccountRecord, DeviceRecord};
use super::{BackedUpAccountStore, DeviceStore};
use crate::domain::{DeviceId, UserId};
use crate::error::GatewayError;

/// In-process [`DeviceStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryDeviceStore {
    devices: RwLock<HashMap<DeviceId, DeviceRecord>>,
}

impl InMemoryDeviceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn find_by_id(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>, GatewayError> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<DeviceRecord>, GatewayError> {
        Ok(self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn save(&self, record: &DeviceRecord) -> Result<(), GatewayError> {
        self.devices
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}

/// In-process [`BackedUpAccountStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryBackedUpAccountStore {
    accounts: RwLock<HashMap<Uuid, BackedUpAccountRecord>>,
}

impl InMemoryBackedUpAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackedUpAccountStore for InMemoryBackedUpAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BackedUpAccountRecord>, GatewayError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<BackedUpAccountRecord>, GatewayError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .filter(|a| a.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_account(
        &self,
        user_id: &UserId,
        account_id: &str,
    ) -> Result<Option<BackedUpAccountRecord>, GatewayError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.user_id == *user_id && a.account_id == account_id)
            .cloned())
    }

    async fn save(&self, record: &BackedUpAccountRecord) -> Result<(), GatewayError> {
        self.accounts
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        self.accounts.write().await.remove(&id);
        Ok(())
    }
}
