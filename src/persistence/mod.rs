//! Persistence layer: device and backed-up-account stores.
//!
//! The relay consumes persistence through the [`DeviceStore`] and
//! [`BackedUpAccountStore`] traits. The production implementation uses
//! `sqlx::PgPool`; [`memory`] provides in-process implementations for
//! tests and local development.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{DeviceId, UserId};
use crate::error::GatewayError;
pub use models::{BackedUpAccountRecord, DeviceRecord};

/// Durable storage of device records.
///
/// `save` has upsert semantics keyed by [`DeviceRecord::id`].
#[async_trait]
pub trait DeviceStore: Send + Sync + std::fmt::Debug {
    /// Loads a device record by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_by_id(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>, GatewayError>;

    /// Loads every device record owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<DeviceRecord>, GatewayError>;

    /// Inserts or replaces the record keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn save(&self, record: &DeviceRecord) -> Result<(), GatewayError>;
}

/// Durable storage of backed-up-account records.
///
/// `save` has upsert semantics keyed by [`BackedUpAccountRecord::id`].
#[async_trait]
pub trait BackedUpAccountStore: Send + Sync + std::fmt::Debug {
    /// Loads a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BackedUpAccountRecord>, GatewayError>;

    /// Loads every record owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<BackedUpAccountRecord>, GatewayError>;

    /// Loads the record for `(user_id, account_id)`, the upsert key used
    /// when a backup completes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn find_by_user_and_account(
        &self,
        user_id: &UserId,
        account_id: &str,
    ) -> Result<Option<BackedUpAccountRecord>, GatewayError>;

    /// Inserts or replaces the record keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn save(&self, record: &BackedUpAccountRecord) -> Result<(), GatewayError>;

    /// Deletes the record with the given id, if present.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    async fn delete(&self, id: Uuid) -> Result<(), GatewayError>;
}
