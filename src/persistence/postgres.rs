//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{BackedUpAccountRecord, DeviceRecord};
use super::{BackedUpAccountStore, DeviceStore};
use crate::domain::{BackupStatus, DeviceId, UserId};
use crate::error::GatewayError;

type DeviceRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
);

const DEVICE_COLUMNS: &str = "id, user_id, device_name, os, app_version, online, last_seen, \
     active_account_id, active_account_phone, last_backup_status, \
     last_backup_account_id, last_backup_message, last_backup_path, last_backup_at";

fn device_from_row(row: DeviceRow) -> DeviceRecord {
    let (
        id,
        user_id,
        device_name,
        os,
        app_version,
        online,
        last_seen,
        active_account_id,
        active_account_phone,
        last_backup_status,
        last_backup_account_id,
        last_backup_message,
        last_backup_path,
        last_backup_at,
    ) = row;
    DeviceRecord {
        id: DeviceId::new(id),
        user_id: UserId::new(user_id),
        device_name,
        os,
        app_version,
        online,
        last_seen,
        active_account_id,
        active_account_phone,
        last_backup_status: last_backup_status.as_deref().and_then(BackupStatus::parse),
        last_backup_account_id,
        last_backup_message,
        last_backup_path,
        last_backup_at,
    }
}

/// PostgreSQL-backed device store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresDeviceStore {
    pool: PgPool,
}

impl PostgresDeviceStore {
    /// Creates a store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PostgresDeviceStore {
    async fn find_by_id(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>, GatewayError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1"
        ))
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(row.map(device_from_row))
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<DeviceRecord>, GatewayError> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(device_from_row).collect())
    }

    async fn save(&self, record: &DeviceRecord) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO devices (id, user_id, device_name, os, app_version, online, last_seen, \
             active_account_id, active_account_phone, last_backup_status, \
             last_backup_account_id, last_backup_message, last_backup_path, last_backup_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             ON CONFLICT (id) DO UPDATE SET \
             user_id = EXCLUDED.user_id, device_name = EXCLUDED.device_name, \
             os = EXCLUDED.os, app_version = EXCLUDED.app_version, \
             online = EXCLUDED.online, last_seen = EXCLUDED.last_seen, \
             active_account_id = EXCLUDED.active_account_id, \
             active_account_phone = EXCLUDED.active_account_phone, \
             last_backup_status = EXCLUDED.last_backup_status, \
             last_backup_account_id = EXCLUDED.last_backup_account_id, \
             last_backup_message = EXCLUDED.last_backup_message, \
             last_backup_path = EXCLUDED.last_backup_path, \
             last_backup_at = EXCLUDED.last_backup_at",
        )
        .bind(record.id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.device_name.as_deref())
        .bind(record.os.as_deref())
        .bind(record.app_version.as_deref())
        .bind(record.online)
        .bind(record.last_seen)
        .bind(record.active_account_id.as_deref())
        .bind(record.active_account_phone.as_deref())
        .bind(record.last_backup_status.map(|s| s.as_str()))
        .bind(record.last_backup_account_id.as_deref())
        .bind(record.last_backup_message.as_deref())
        .bind(record.last_backup_path.as_deref())
        .bind(record.last_backup_at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(())
    }
}

type AccountRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
);

const ACCOUNT_COLUMNS: &str =
    "id, user_id, device_id, account_id, account_name, phone_number, backup_path, backup_at";

fn account_from_row(row: AccountRow) -> BackedUpAccountRecord {
    let (id, user_id, device_id, account_id, account_name, phone_number, backup_path, backup_at) =
        row;
    BackedUpAccountRecord {
        id,
        user_id: UserId::new(user_id),
        device_id: DeviceId::new(device_id),
        account_id,
        account_name,
        phone_number,
        backup_path,
        backup_at,
    }
}

/// PostgreSQL-backed backed-up-account store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresBackedUpAccountStore {
    pool: PgPool,
}

impl PostgresBackedUpAccountStore {
    /// Creates a store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BackedUpAccountStore for PostgresBackedUpAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BackedUpAccountRecord>, GatewayError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM backed_up_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(row.map(account_from_row))
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<BackedUpAccountRecord>, GatewayError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM backed_up_accounts \
             WHERE user_id = $1 ORDER BY backup_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(account_from_row).collect())
    }

    async fn find_by_user_and_account(
        &self,
        user_id: &UserId,
        account_id: &str,
    ) -> Result<Option<BackedUpAccountRecord>, GatewayError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM backed_up_accounts \
             WHERE user_id = $1 AND account_id = $2"
        ))
        .bind(user_id.as_str())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(row.map(account_from_row))
    }

    async fn save(&self, record: &BackedUpAccountRecord) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO backed_up_accounts (id, user_id, device_id, account_id, account_name, \
             phone_number, backup_path, backup_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
             user_id = EXCLUDED.user_id, device_id = EXCLUDED.device_id, \
             account_id = EXCLUDED.account_id, account_name = EXCLUDED.account_name, \
             phone_number = EXCLUDED.phone_number, backup_path = EXCLUDED.backup_path, \
             backup_at = EXCLUDED.backup_at",
        )
        .bind(record.id)
        .bind(record.user_id.as_str())
        .bind(record.device_id.as_str())
        .bind(&record.account_id)
        .bind(&record.account_name)
        .bind(&record.phone_number)
        .bind(record.backup_path.as_deref())
        .bind(record.backup_at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        sqlx::query("DELETE FROM backed_up_accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(())
    }
}
