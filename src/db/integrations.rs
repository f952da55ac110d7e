use super::models::{DbIntegration, DbSmartThingsConnection, IntegrationUpsert};
use super::sqlite::{HomeStorage, merge_json, parse_json, parse_ts, to_json, to_ts};
use crate::error::HubError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::info;

impl HomeStorage {
    pub async fn list_integrations(&self, user_id: &str) -> Result<Vec<DbIntegration>, HubError> {
        let rows = sqlx::query(
            r#"SELECT id, type, name, is_connected, access_token, metadata
               FROM integrations WHERE user_id = ? ORDER BY type"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(row_to_integration)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_integration(
        &self,
        user_id: &str,
        integration_type: &str,
    ) -> Result<Option<DbIntegration>, HubError> {
        let row = sqlx::query(
            r#"SELECT id, type, name, is_connected, access_token, metadata
               FROM integrations WHERE user_id = ? AND type = ?"#,
        )
        .bind(user_id)
        .bind(integration_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_integration).transpose()?)
    }

    /// One row per `(user_id, type)`. A `None` token or metadata keeps
    /// the stored value.
    pub async fn upsert_integration(
        &self,
        user_id: &str,
        integration: IntegrationUpsert,
    ) -> Result<DbIntegration, HubError> {
        let metadata = integration.metadata.as_ref().map(to_json).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO integrations (user_id, type, name, is_connected, access_token, metadata)
            VALUES (?, ?, ?, ?, ?, COALESCE(?, '{}'))
            ON CONFLICT(user_id, type) DO UPDATE SET
                name=excluded.name,
                is_connected=excluded.is_connected,
                access_token=COALESCE(?, integrations.access_token),
                metadata=COALESCE(?, integrations.metadata)
            "#,
        )
        .bind(user_id)
        .bind(integration.integration_type.as_str())
        .bind(integration.name)
        .bind(integration.is_connected)
        .bind(integration.access_token.as_deref())
        .bind(metadata.as_deref())
        .bind(integration.access_token.as_deref())
        .bind(metadata.as_deref())
        .execute(&self.pool)
        .await?;

        self.get_integration(user_id, &integration.integration_type)
            .await?
            .ok_or(HubError::NotFound("Integration"))
    }

    /// Shallow-merge `patch` into the integration's metadata.
    pub async fn merge_integration_metadata(
        &self,
        user_id: &str,
        integration_type: &str,
        patch: Value,
    ) -> Result<(), HubError> {
        let current = self
            .get_integration(user_id, integration_type)
            .await?
            .ok_or(HubError::NotFound("Integration"))?;
        let merged = merge_json(current.metadata, patch);
        sqlx::query("UPDATE integrations SET metadata = ? WHERE id = ?")
            .bind(to_json(&merged)?)
            .bind(current.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop the integration together with everything imported through it.
    pub async fn disconnect_integration(
        &self,
        user_id: &str,
        integration_type: &str,
    ) -> Result<(), HubError> {
        let integration = self
            .get_integration(user_id, integration_type)
            .await?
            .ok_or(HubError::NotFound("Integration"))?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM cameras WHERE device_id IN
                (SELECT id FROM devices WHERE integration_id = ? AND user_id = ?)",
        )
        .bind(integration.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        let devices = sqlx::query("DELETE FROM devices WHERE integration_id = ? AND user_id = ?")
            .bind(integration.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM integrations WHERE id = ?")
            .bind(integration.id)
            .execute(&mut *tx)
            .await?;
        if integration_type == "smartthings" {
            sqlx::query("DELETE FROM smartthings_connections WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!(user_id, integration_type, devices, "integration disconnected");
        Ok(())
    }

    pub async fn upsert_connection(&self, conn: &DbSmartThingsConnection) -> Result<(), HubError> {
        sqlx::query(
            r#"
            INSERT INTO smartthings_connections (
                user_id, access_token, refresh_token, expires_at, installed_app_id
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token=excluded.access_token,
                refresh_token=excluded.refresh_token,
                expires_at=excluded.expires_at,
                installed_app_id=COALESCE(excluded.installed_app_id, smartthings_connections.installed_app_id)
            "#,
        )
        .bind(conn.user_id.as_str())
        .bind(conn.access_token.as_str())
        .bind(conn.refresh_token.as_deref())
        .bind(to_ts(conn.expires_at))
        .bind(conn.installed_app_id.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_connection(
        &self,
        user_id: &str,
    ) -> Result<Option<DbSmartThingsConnection>, HubError> {
        let row = sqlx::query(
            r#"SELECT user_id, access_token, refresh_token, expires_at, installed_app_id
               FROM smartthings_connections WHERE user_id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_connection).transpose()?)
    }

    /// Persist a refreshed token pair. A `None` refresh token keeps the old one.
    pub async fn update_connection_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), HubError> {
        sqlx::query(
            r#"UPDATE smartthings_connections
               SET access_token = ?, refresh_token = COALESCE(?, refresh_token), expires_at = ?
               WHERE user_id = ?"#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(to_ts(expires_at))
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_integration(row: SqliteRow) -> Result<DbIntegration, sqlx::Error> {
    let is_connected: i64 = row.try_get("is_connected")?;
    let metadata: String = row.try_get("metadata")?;
    Ok(DbIntegration {
        id: row.try_get("id")?,
        integration_type: row.try_get("type")?,
        name: row.try_get("name")?,
        is_connected: is_connected != 0,
        access_token: row.try_get("access_token")?,
        metadata: parse_json(&metadata)?,
    })
}

fn row_to_connection(row: SqliteRow) -> Result<DbSmartThingsConnection, sqlx::Error> {
    let expires_at: String = row.try_get("expires_at")?;
    Ok(DbSmartThingsConnection {
        user_id: row.try_get("user_id")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        expires_at: parse_ts(&expires_at)?,
        installed_app_id: row.try_get("installed_app_id")?,
    })
}

#[cfg(test)]
mod tests {
    use crate::db::models::{DbSmartThingsConnection, DeviceImport, IntegrationUpsert};
    use crate::db::sqlite::test_support::temp_storage;
    use crate::types::device::{CameraStatus, DeviceType};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn tapo(token: Option<&str>, metadata: Option<serde_json::Value>) -> IntegrationUpsert {
        IntegrationUpsert {
            integration_type: "tapo".into(),
            name: "TP-Link Tapo".into(),
            is_connected: true,
            access_token: token.map(str::to_string),
            metadata,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_token_and_metadata_when_absent() {
        let db = temp_storage().await;
        let first = db
            .upsert_integration("alice", tapo(Some("tok-1"), Some(json!({"email": "a@b.c"}))))
            .await
            .unwrap();
        let second = db.upsert_integration("alice", tapo(None, None)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.access_token.as_deref(), Some("tok-1"));
        assert_eq!(second.metadata, json!({"email": "a@b.c"}));

        db.merge_integration_metadata("alice", "tapo", json!({"device_count": 2}))
            .await
            .unwrap();
        let merged = db.get_integration("alice", "tapo").await.unwrap().unwrap();
        assert_eq!(merged.metadata, json!({"email": "a@b.c", "device_count": 2}));
    }

    #[tokio::test]
    async fn disconnect_removes_imported_devices_and_connection() {
        let db = temp_storage().await;
        let st = db
            .upsert_integration(
                "alice",
                IntegrationUpsert {
                    integration_type: "smartthings".into(),
                    name: "SmartThings".into(),
                    is_connected: true,
                    access_token: None,
                    metadata: None,
                },
            )
            .await
            .unwrap();
        let id = db
            .upsert_imported_device(
                "alice",
                DeviceImport {
                    integration_id: st.id,
                    external_id: "abc".into(),
                    name: "Câmera".into(),
                    device_type: DeviceType::Camera,
                    is_on: true,
                    metadata: json!({}),
                },
            )
            .await
            .unwrap();
        db.upsert_camera(id, CameraStatus::Online).await.unwrap();
        db.upsert_connection(&DbSmartThingsConnection {
            user_id: "alice".into(),
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: Utc::now() + Duration::hours(24),
            installed_app_id: Some("app".into()),
        })
        .await
        .unwrap();

        db.disconnect_integration("alice", "smartthings").await.unwrap();

        assert!(db.list_devices("alice", None).await.unwrap().is_empty());
        assert!(db.list_cameras("alice").await.unwrap().is_empty());
        assert!(db.get_integration("alice", "smartthings").await.unwrap().is_none());
        assert!(db.get_connection("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_refresh_keeps_refresh_token_when_not_rotated() {
        let db = temp_storage().await;
        db.upsert_connection(&DbSmartThingsConnection {
            user_id: "alice".into(),
            access_token: "old".into(),
            refresh_token: Some("refresh".into()),
            expires_at: Utc::now(),
            installed_app_id: None,
        })
        .await
        .unwrap();
        db.update_connection_tokens("alice", "new", None, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        let conn = db.get_connection("alice").await.unwrap().unwrap();
        assert_eq!(conn.access_token, "new");
        assert_eq!(conn.refresh_token.as_deref(), Some("refresh"));
    }
}
