use super::models::{
    CameraPatch, DashboardStats, DbCamera, DbDevice, DeviceImport, DevicePatch, NewDevice,
};
use super::sqlite::{HomeStorage, merge_json, now_ts, parse_json, parse_ts, to_json};
use crate::error::HubError;
use crate::types::device::{CameraStatus, DeviceType};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const DEVICE_COLUMNS: &str = "id, room_id, integration_id, external_id, name, type, is_on, \
                              settings, metadata, updated_at";

impl HomeStorage {
    pub async fn list_devices(
        &self,
        user_id: &str,
        room_id: Option<i64>,
    ) -> Result<Vec<DbDevice>, HubError> {
        let rows = match room_id {
            Some(room) => {
                sqlx::query(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = ? AND room_id = ? ORDER BY name"
                ))
                .bind(user_id)
                .bind(room)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = ? ORDER BY name"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows
            .into_iter()
            .map(row_to_device)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_device(&self, user_id: &str, id: i64) -> Result<DbDevice, HubError> {
        let row = sqlx::query(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(HubError::NotFound("Device"))?;
        Ok(row_to_device(row)?)
    }

    /// Insert a device; cameras also get their `cameras` row.
    pub async fn create_device(
        &self,
        user_id: &str,
        device: NewDevice,
    ) -> Result<DbDevice, HubError> {
        if let Some(room_id) = device.room_id {
            self.get_room(user_id, room_id).await?;
        }
        if let Some(integration_id) = device.integration_id {
            sqlx::query("SELECT id FROM integrations WHERE id = ? AND user_id = ?")
                .bind(integration_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(HubError::NotFound("Integration"))?;
        }
        let mut tx = self.pool.begin().await?;
        let id = sqlx::query(
            r#"INSERT INTO devices (user_id, room_id, integration_id, name, type, is_on, updated_at)
               VALUES (?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(user_id)
        .bind(device.room_id)
        .bind(device.integration_id)
        .bind(device.name)
        .bind(device.device_type.as_str())
        .bind(now_ts())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if device.device_type == DeviceType::Camera {
            sqlx::query("INSERT INTO cameras (device_id, stream_url, status) VALUES (?, ?, ?)")
                .bind(id)
                .bind(device.stream_url)
                .bind(CameraStatus::Offline.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.get_device(user_id, id).await
    }

    pub async fn update_device(
        &self,
        user_id: &str,
        id: i64,
        patch: DevicePatch,
    ) -> Result<DbDevice, HubError> {
        let current = self.get_device(user_id, id).await?;
        let room_id = match patch.room_id {
            Some(Some(room_id)) => {
                self.get_room(user_id, room_id).await?;
                Some(room_id)
            }
            Some(None) => None,
            None => current.room_id,
        };
        let settings = match patch.settings {
            Some(patch) => merge_json(current.settings, patch),
            None => current.settings,
        };
        sqlx::query(
            r#"UPDATE devices SET name = ?, room_id = ?, is_on = ?, settings = ?, updated_at = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(patch.name.unwrap_or(current.name))
        .bind(room_id)
        .bind(patch.is_on.unwrap_or(current.is_on))
        .bind(to_json(&settings)?)
        .bind(now_ts())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        self.get_device(user_id, id).await
    }

    pub async fn toggle_device(&self, user_id: &str, id: i64) -> Result<DbDevice, HubError> {
        let updated = sqlx::query(
            "UPDATE devices SET is_on = NOT is_on, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(now_ts())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(HubError::NotFound("Device"));
        }
        self.get_device(user_id, id).await
    }

    /// Removes the camera row (if any) before the device.
    pub async fn delete_device(&self, user_id: &str, id: i64) -> Result<(), HubError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM cameras WHERE device_id IN (SELECT id FROM devices WHERE id = ? AND user_id = ?)",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        let deleted = sqlx::query("DELETE FROM devices WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(HubError::NotFound("Device"));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Insert or refresh a vendor device keyed by `(user_id, external_id)`.
    /// Returns the device id.
    pub async fn upsert_imported_device(
        &self,
        user_id: &str,
        device: DeviceImport,
    ) -> Result<i64, HubError> {
        sqlx::query(
            r#"
            INSERT INTO devices (
                user_id, integration_id, external_id, name, type, is_on, metadata, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, external_id) DO UPDATE SET
                integration_id=excluded.integration_id,
                name=excluded.name,
                type=excluded.type,
                is_on=excluded.is_on,
                metadata=excluded.metadata,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(device.integration_id)
        .bind(device.external_id.as_str())
        .bind(device.name)
        .bind(device.device_type.as_str())
        .bind(device.is_on)
        .bind(to_json(&device.metadata)?)
        .bind(now_ts())
        .execute(&self.pool)
        .await?;

        let rec: (i64,) =
            sqlx::query_as("SELECT id FROM devices WHERE user_id = ? AND external_id = ?")
                .bind(user_id)
                .bind(device.external_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }

    /// Apply the outcome of a vendor command.
    pub async fn set_device_state(
        &self,
        user_id: &str,
        id: i64,
        is_on: Option<bool>,
        settings: Option<Value>,
    ) -> Result<DbDevice, HubError> {
        self.update_device(
            user_id,
            id,
            DevicePatch {
                is_on,
                settings,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn list_cameras(&self, user_id: &str) -> Result<Vec<DbCamera>, HubError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.device_id, d.name AS device_name, c.stream_url, c.status
               FROM cameras c JOIN devices d ON d.id = c.device_id
               WHERE d.user_id = ? ORDER BY d.name"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(row_to_camera)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_camera(&self, user_id: &str, id: i64) -> Result<DbCamera, HubError> {
        let row = sqlx::query(
            r#"SELECT c.id, c.device_id, d.name AS device_name, c.stream_url, c.status
               FROM cameras c JOIN devices d ON d.id = c.device_id
               WHERE c.id = ? AND d.user_id = ?"#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(HubError::NotFound("Camera"))?;
        Ok(row_to_camera(row)?)
    }

    pub async fn update_camera(
        &self,
        user_id: &str,
        id: i64,
        patch: CameraPatch,
    ) -> Result<DbCamera, HubError> {
        let current = self.get_camera(user_id, id).await?;
        sqlx::query("UPDATE cameras SET stream_url = ?, status = ? WHERE id = ?")
            .bind(patch.stream_url.or(current.stream_url))
            .bind(patch.status.unwrap_or(current.status).as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_camera(user_id, id).await
    }

    /// Camera row for an imported device; keeps a stream URL already set.
    pub async fn upsert_camera(
        &self,
        device_id: i64,
        status: CameraStatus,
    ) -> Result<(), HubError> {
        sqlx::query(
            r#"INSERT INTO cameras (device_id, status) VALUES (?, ?)
               ON CONFLICT(device_id) DO UPDATE SET status=excluded.status"#,
        )
        .bind(device_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn dashboard_stats(&self, user_id: &str) -> Result<DashboardStats, HubError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM devices WHERE user_id = ?1) AS devices_total,
                (SELECT COUNT(*) FROM devices WHERE user_id = ?1 AND is_on = 1) AS devices_on,
                (SELECT COUNT(*) FROM devices WHERE user_id = ?1 AND is_on = 1 AND type = 'light') AS lights_on,
                (SELECT COUNT(*) FROM cameras c JOIN devices d ON d.id = c.device_id
                    WHERE d.user_id = ?1 AND c.status = 'online') AS cameras_online,
                (SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0) AS unread_notifications
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(DashboardStats {
            devices_total: row.try_get("devices_total")?,
            devices_on: row.try_get("devices_on")?,
            lights_on: row.try_get("lights_on")?,
            cameras_online: row.try_get("cameras_online")?,
            unread_notifications: row.try_get("unread_notifications")?,
        })
    }
}

fn row_to_device(row: SqliteRow) -> Result<DbDevice, sqlx::Error> {
    let device_type: String = row.try_get("type")?;
    let is_on: i64 = row.try_get("is_on")?;
    let settings: String = row.try_get("settings")?;
    let metadata: String = row.try_get("metadata")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(DbDevice {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        integration_id: row.try_get("integration_id")?,
        external_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        device_type: DeviceType::parse_lenient(&device_type),
        is_on: is_on != 0,
        settings: parse_json(&settings)?,
        metadata: parse_json(&metadata)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_camera(row: SqliteRow) -> Result<DbCamera, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(DbCamera {
        id: row.try_get("id")?,
        device_id: row.try_get("device_id")?,
        device_name: row.try_get("device_name")?,
        stream_url: row.try_get("stream_url")?,
        status: CameraStatus::parse_lenient(&status),
    })
}
