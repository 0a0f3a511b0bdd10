//! Device service: orchestrates persistence updates and event fan-out.
//!
//! Every inbound frame and every lifecycle transition runs through here:
//! load the device record, apply the update, save it under a bounded
//! timeout, then notify the owning user's browser sessions through the
//! [`RelayService`]. Persistence failures on the relay path are logged
//! and never abort frame processing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::RelayService;
use crate::domain::{BackupStatus, DeviceId, RelayEvent, UserId};
use crate::error::GatewayError;
use crate::persistence::{BackedUpAccountRecord, BackedUpAccountStore, DeviceRecord, DeviceStore};

/// Command frame instructing a device to start a backup.
pub const CMD_START_BACKUP: &str = r#"{"command": "start_backup"}"#;
/// Command frame instructing a device to export its friends list.
pub const CMD_EXPORT_FRIENDS: &str = r#"{"command": "export_friends"}"#;
/// Command frame instructing a device to refresh its active account.
pub const CMD_REFRESH_ACCOUNT: &str = r#"{"command": "refresh_account"}"#;

/// Handshake metadata supplied by a device connection.
#[derive(Debug, Clone)]
pub struct DeviceConnectInfo {
    /// Device identifier from the `deviceId` query parameter.
    pub device_id: DeviceId,
    /// Owning user from the trusted `X-User-Name` header.
    pub user_id: UserId,
    /// Optional device name.
    pub device_name: Option<String>,
    /// Optional operating system string.
    pub os: Option<String>,
    /// Optional app version string.
    pub app_version: Option<String>,
}

/// Orchestration layer for device state and backed-up-account records.
#[derive(Debug)]
pub struct DeviceService {
    devices: Arc<dyn DeviceStore>,
    accounts: Arc<dyn BackedUpAccountStore>,
    relay: Arc<RelayService>,
    persist_timeout: Duration,
}

impl DeviceService {
    /// Creates a new `DeviceService`.
    #[must_use]
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        accounts: Arc<dyn BackedUpAccountStore>,
        relay: Arc<RelayService>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            devices,
            accounts,
            relay,
            persist_timeout,
        }
    }

    /// Returns the relay this service fans events out through.
    #[must_use]
    pub fn relay(&self) -> &Arc<RelayService> {
        &self.relay
    }

    /// Runs a store call under the configured timeout, logging failures.
    ///
    /// Returns `None` when the call failed or timed out; relay-path
    /// callers continue regardless.
    async fn store_call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.persist_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::error!(op, error = %e, "persistence call failed");
                None
            }
            Err(_) => {
                tracing::error!(op, timeout_ms = self.persist_timeout.as_millis() as u64, "persistence call timed out");
                None
            }
        }
    }

    /// Loads the device record, falling back to a blank one so a store
    /// outage never drops a status update on the floor.
    async fn load_or_new(&self, device_id: &DeviceId, user_id: &UserId) -> DeviceRecord {
        match self
            .store_call("device find", self.devices.find_by_id(device_id))
            .await
        {
            Some(Some(record)) => record,
            _ => DeviceRecord::new(device_id.clone(), user_id.clone()),
        }
    }

    // ── Connection lifecycle ────────────────────────────────────────────

    /// Marks the device online and notifies the owner's browser sessions.
    ///
    /// Called by the lifecycle code after a successful registration.
    pub async fn handle_device_connected(&self, info: &DeviceConnectInfo) {
        let now = Utc::now();
        let mut record = self.load_or_new(&info.device_id, &info.user_id).await;

        record.user_id = info.user_id.clone();
        if info.device_name.is_some() {
            record.device_name = info.device_name.clone();
        }
        if info.os.is_some() {
            record.os = info.os.clone();
        }
        if info.app_version.is_some() {
            record.app_version = info.app_version.clone();
        }
        record.online = true;
        record.last_seen = Some(now);

        let _ = self
            .store_call("device online", self.devices.save(&record))
            .await;
        tracing::info!(device_id = %info.device_id, user_id = %info.user_id, "device connected");

        let _ = self
            .relay
            .broadcast_to_user(
                &info.user_id,
                &RelayEvent::DeviceStatusUpdate {
                    device_id: info.device_id.clone(),
                    online: Some(true),
                    last_seen: Some(now),
                    active_account_id: None,
                    active_account_phone: None,
                    timestamp: now,
                },
            )
            .await;
    }

    /// Marks the device offline and notifies the owner's browser sessions.
    ///
    /// Called by the lifecycle code only when the disconnecting handle was
    /// still the registered one (a superseded connection skips this).
    pub async fn handle_device_disconnected(&self, device_id: &DeviceId, user_id: &UserId) {
        let now = Utc::now();

        if let Some(Some(mut record)) = self
            .store_call("device find", self.devices.find_by_id(device_id))
            .await
        {
            record.online = false;
            record.last_seen = Some(now);
            let _ = self
                .store_call("device offline", self.devices.save(&record))
                .await;
        }
        tracing::info!(%device_id, %user_id, "device disconnected");

        let _ = self
            .relay
            .broadcast_to_user(
                user_id,
                &RelayEvent::DeviceStatusUpdate {
                    device_id: device_id.clone(),
                    online: Some(false),
                    last_seen: Some(now),
                    active_account_id: None,
                    active_account_phone: None,
                    timestamp: now,
                },
            )
            .await;
    }

    // ── Inbound frame handlers ──────────────────────────────────────────

    /// Persists the device's active-account fields and re-broadcasts the
    /// new state to the owning user.
    pub async fn update_active_account(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        account_id: Option<String>,
        account_phone: Option<String>,
    ) {
        let now = Utc::now();
        let mut record = self.load_or_new(device_id, user_id).await;
        record.active_account_id = account_id.clone();
        record.active_account_phone = account_phone.clone();

        let _ = self
            .store_call("active account", self.devices.save(&record))
            .await;

        let _ = self
            .relay
            .broadcast_to_user(
                user_id,
                &RelayEvent::DeviceStatusUpdate {
                    device_id: device_id.clone(),
                    online: None,
                    last_seen: None,
                    active_account_id: account_id,
                    active_account_phone: account_phone,
                    timestamp: now,
                },
            )
            .await;
    }

    /// Persists the device's last-backup fields, broadcasts the update,
    /// and on `COMPLETED` upserts the backed-up-account record.
    ///
    /// The upsert runs only after the status persistence succeeded; its
    /// own failure is logged and rolls nothing back.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_backup_status(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        status: BackupStatus,
        account_id: &str,
        account_name: &str,
        phone_number: &str,
        message: &str,
        backup_path: Option<&str>,
    ) {
        let now = Utc::now();
        let mut record = self.load_or_new(device_id, user_id).await;
        record.active_account_id = Some(account_id.to_string());
        record.active_account_phone = Some(phone_number.to_string());
        record.last_backup_status = Some(status);
        record.last_backup_account_id = Some(account_id.to_string());
        record.last_backup_message = Some(message.to_string());
        if let Some(path) = backup_path {
            record.last_backup_path = Some(path.to_string());
        }
        record.last_backup_at = Some(now);

        let persisted = self
            .store_call("backup status", self.devices.save(&record))
            .await
            .is_some();
        tracing::info!(%device_id, %status, account_id, "backup status update");

        let _ = self
            .relay
            .broadcast_to_user(
                user_id,
                &RelayEvent::BackupStatusUpdate {
                    device_id: device_id.clone(),
                    account_id: account_id.to_string(),
                    status,
                    message: message.to_string(),
                    timestamp: now,
                },
            )
            .await;

        if persisted && status == BackupStatus::Completed {
            self.upsert_backed_up_account(
                device_id,
                user_id,
                account_id,
                account_name,
                phone_number,
                backup_path,
            )
            .await;
        }
    }

    /// Touches the device record and broadcasts the export update with its
    /// raw data payload. No side-table writes.
    pub async fn update_friends_export_status(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        account_id: &str,
        phone_number: &str,
        status: &str,
        data: serde_json::Value,
        message: &str,
    ) {
        let now = Utc::now();

        if let Some(Some(mut record)) = self
            .store_call("device find", self.devices.find_by_id(device_id))
            .await
        {
            record.last_seen = Some(now);
            let _ = self
                .store_call("device touch", self.devices.save(&record))
                .await;
        }
        tracing::info!(%device_id, account_id, status, "friends export update");

        let _ = self
            .relay
            .broadcast_to_user(
                user_id,
                &RelayEvent::FriendsExportStatusUpdate {
                    device_id: device_id.clone(),
                    account_id: account_id.to_string(),
                    phone_number: phone_number.to_string(),
                    status: status.to_string(),
                    data,
                    message: message.to_string(),
                    timestamp: now,
                },
            )
            .await;
    }

    /// Upserts the backed-up-account record keyed by `(user, account)`:
    /// merges into an existing record or creates a new one.
    async fn upsert_backed_up_account(
        &self,
        device_id: &DeviceId,
        user_id: &UserId,
        account_id: &str,
        account_name: &str,
        phone_number: &str,
        backup_path: Option<&str>,
    ) {
        let existing = self
            .store_call(
                "account find",
                self.accounts.find_by_user_and_account(user_id, account_id),
            )
            .await;

        let record = match existing {
            Some(Some(mut account)) => {
                account.account_name = account_name.to_string();
                account.phone_number = phone_number.to_string();
                account.device_id = device_id.clone();
                if let Some(path) = backup_path {
                    account.backup_path = Some(path.to_string());
                }
                account.backup_at = Utc::now();
                account
            }
            Some(None) => BackedUpAccountRecord::new(
                user_id.clone(),
                device_id.clone(),
                account_id,
                account_name,
                phone_number,
                backup_path.map(ToString::to_string),
            ),
            // The lookup already logged its failure; skip the write rather
            // than risk a duplicate record.
            None => return,
        };

        if self
            .store_call("account upsert", self.accounts.save(&record))
            .await
            .is_some()
        {
            tracing::info!(%device_id, %user_id, account_id, "backed-up account saved");
        }
    }

    // ── Command initiators (REST path) ──────────────────────────────────

    /// Sends the start-backup command to the device.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeviceOffline`] when the device has no live
    /// connection; the command is never queued for later.
    pub async fn initiate_backup(
        &self,
        user_id: &UserId,
        device_id: &DeviceId,
    ) -> Result<(), GatewayError> {
        self.send_device_command(user_id, device_id, CMD_START_BACKUP, "backup")
            .await
    }

    /// Sends the export-friends command to the device.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeviceOffline`] when the device has no live
    /// connection.
    pub async fn initiate_friends_export(
        &self,
        user_id: &UserId,
        device_id: &DeviceId,
    ) -> Result<(), GatewayError> {
        self.send_device_command(user_id, device_id, CMD_EXPORT_FRIENDS, "friends export")
            .await
    }

    /// Sends the refresh-account command to the device.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeviceOffline`] when the device has no live
    /// connection.
    pub async fn refresh_account(
        &self,
        user_id: &UserId,
        device_id: &DeviceId,
    ) -> Result<(), GatewayError> {
        self.send_device_command(user_id, device_id, CMD_REFRESH_ACCOUNT, "account refresh")
            .await
    }

    async fn send_device_command(
        &self,
        user_id: &UserId,
        device_id: &DeviceId,
        command: &str,
        op: &'static str,
    ) -> Result<(), GatewayError> {
        if !self.relay.is_online(device_id).await {
            tracing::warn!(%device_id, %user_id, op, "device offline, command rejected");
            return Err(GatewayError::DeviceOffline(device_id.clone()));
        }
        self.relay.send_command(device_id, command).await?;
        tracing::info!(%device_id, %user_id, op, "command sent");
        Ok(())
    }

    // ── Queries and account management (REST path) ──────────────────────

    /// Returns the user's devices with the online flag overlaid live from
    /// the connection registry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn devices_of_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DeviceRecord>, GatewayError> {
        let mut records = self.devices.find_by_user(user_id).await?;
        for record in &mut records {
            record.online = self.relay.is_online(&record.id).await;
        }
        Ok(records)
    }

    /// Returns one device with the online flag overlaid live.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeviceNotFound`] for an unknown id and
    /// [`GatewayError::PersistenceError`] on storage failure.
    pub async fn device_by_id(&self, device_id: &DeviceId) -> Result<DeviceRecord, GatewayError> {
        let mut record = self
            .devices
            .find_by_id(device_id)
            .await?
            .ok_or_else(|| GatewayError::DeviceNotFound(device_id.to_string()))?;
        record.online = self.relay.is_online(&record.id).await;
        Ok(record)
    }

    /// Returns the user's backed-up accounts.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on storage failure.
    pub async fn backed_up_accounts_of(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<BackedUpAccountRecord>, GatewayError> {
        self.accounts.find_by_user(user_id).await
    }

    /// Deletes a backed-up-account record after an ownership check.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AccountNotFound`] for an unknown id,
    /// [`GatewayError::AccessDenied`] when the caller is not the owner,
    /// and [`GatewayError::PersistenceError`] on storage failure.
    pub async fn delete_backed_up_account(
        &self,
        id: Uuid,
        requesting_user: &UserId,
    ) -> Result<(), GatewayError> {
        let account = self
            .accounts
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::AccountNotFound(id.to_string()))?;
        if account.user_id != *requesting_user {
            tracing::warn!(%requesting_user, account = %id, "delete denied: not the owner");
            return Err(GatewayError::AccessDenied);
        }
        self.accounts.delete(id).await
    }

    /// Transfers backed-up accounts to another user after ownership checks.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] when the target is the
    /// current owner, [`GatewayError::AccountNotFound`] /
    /// [`GatewayError::AccessDenied`] per record, and
    /// [`GatewayError::PersistenceError`] on storage failure.
    pub async fn transfer_backed_up_accounts(
        &self,
        account_ids: &[Uuid],
        target_user: &UserId,
        requesting_user: &UserId,
    ) -> Result<Vec<BackedUpAccountRecord>, GatewayError> {
        if target_user == requesting_user {
            return Err(GatewayError::InvalidRequest(
                "target user cannot be the current owner".to_string(),
            ));
        }

        let mut transferred = Vec::with_capacity(account_ids.len());
        for id in account_ids {
            let mut account = self
                .accounts
                .find_by_id(*id)
                .await?
                .ok_or_else(|| GatewayError::AccountNotFound(id.to_string()))?;
            if account.user_id != *requesting_user {
                tracing::warn!(%requesting_user, account = %id, "transfer denied: not the owner");
                return Err(GatewayError::AccessDenied);
            }
            account.user_id = target_user.clone();
            self.accounts.save(&account).await?;
            transferred.push(account);
        }
        tracing::info!(%requesting_user, %target_user, count = transferred.len(), "accounts transferred");
        Ok(transferred)
    }
}
