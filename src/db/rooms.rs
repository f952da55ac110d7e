use super::models::{DbRoom, NewRoom, RoomPatch};
use super::sqlite::{HomeStorage, now_ts, parse_ts};
use crate::error::HubError;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

impl HomeStorage {
    pub async fn list_rooms(&self, user_id: &str) -> Result<Vec<DbRoom>, HubError> {
        let rows = sqlx::query(
            "SELECT id, name, icon, created_at FROM rooms WHERE user_id = ? ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(row_to_room)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_room(&self, user_id: &str, id: i64) -> Result<DbRoom, HubError> {
        let row = sqlx::query(
            "SELECT id, name, icon, created_at FROM rooms WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(HubError::NotFound("Room"))?;
        Ok(row_to_room(row)?)
    }

    pub async fn create_room(&self, user_id: &str, room: NewRoom) -> Result<DbRoom, HubError> {
        let id = sqlx::query("INSERT INTO rooms (user_id, name, icon, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(room.name)
            .bind(room.icon)
            .bind(now_ts())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        self.get_room(user_id, id).await
    }

    pub async fn update_room(
        &self,
        user_id: &str,
        id: i64,
        patch: RoomPatch,
    ) -> Result<DbRoom, HubError> {
        let current = self.get_room(user_id, id).await?;
        sqlx::query("UPDATE rooms SET name = ?, icon = ? WHERE id = ? AND user_id = ?")
            .bind(patch.name.unwrap_or(current.name))
            .bind(patch.icon.or(current.icon))
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.get_room(user_id, id).await
    }

    /// Devices in the room are kept and detached.
    pub async fn delete_room(&self, user_id: &str, id: i64) -> Result<(), HubError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE devices SET room_id = NULL WHERE room_id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM rooms WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(HubError::NotFound("Room"));
        }
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_room(row: SqliteRow) -> Result<DbRoom, sqlx::Error> {
    let created_at: String = row.try_get("created_at")?;
    Ok(DbRoom {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        icon: row.try_get("icon")?,
        created_at: parse_ts(&created_at)?,
    })
}
