use super::models::{DbNotification, NewNotification};
use super::sqlite::{HomeStorage, now_ts, parse_ts};
use crate::error::HubError;
use crate::types::notification::{NotificationKind, NotificationSource};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

const NOTIFICATION_COLUMNS: &str = "id, member_id, title, message, type, is_read, source, created_at";

impl HomeStorage {
    /// Newest first. With a member filter, the member's own rows plus
    /// household-wide rows (no member) are returned.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        member_id: Option<i64>,
    ) -> Result<Vec<DbNotification>, HubError> {
        let rows = match member_id {
            Some(member_id) => {
                sqlx::query(&format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE user_id = ? AND (member_id = ? OR member_id IS NULL)
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .bind(member_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE user_id = ? ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows
            .into_iter()
            .map(row_to_notification)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_notification(
        &self,
        user_id: &str,
        id: i64,
    ) -> Result<DbNotification, HubError> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(HubError::NotFound("Notification"))?;
        Ok(row_to_notification(row)?)
    }

    pub async fn create_notification(
        &self,
        user_id: &str,
        notification: NewNotification,
    ) -> Result<DbNotification, HubError> {
        if let Some(member_id) = notification.member_id {
            self.get_member(user_id, member_id).await?;
        }
        let mut tx = self.pool.begin().await?;
        let id = insert_notification(&mut tx, user_id, notification).await?;
        tx.commit().await?;
        self.get_notification(user_id, id).await
    }

    pub async fn mark_read(
        &self,
        user_id: &str,
        id: i64,
        is_read: bool,
    ) -> Result<DbNotification, HubError> {
        let updated =
            sqlx::query("UPDATE notifications SET is_read = ? WHERE id = ? AND user_id = ?")
                .bind(is_read)
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        if updated == 0 {
            return Err(HubError::NotFound("Notification"));
        }
        self.get_notification(user_id, id).await
    }

    pub async fn delete_notification(&self, user_id: &str, id: i64) -> Result<(), HubError> {
        let deleted = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(HubError::NotFound("Notification"));
        }
        Ok(())
    }

    /// Atomically swap the generated notifications of a member (or, with
    /// `None`, the household-wide ones) for `batch`. Manual rows are kept.
    pub async fn replace_generated(
        &self,
        user_id: &str,
        member_id: Option<i64>,
        batch: Vec<NewNotification>,
    ) -> Result<Vec<DbNotification>, HubError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM notifications WHERE user_id = ? AND member_id IS ? AND source = ?")
            .bind(user_id)
            .bind(member_id)
            .bind(NotificationSource::Generated.as_str())
            .execute(&mut *tx)
            .await?;
        let mut ids = Vec::with_capacity(batch.len());
        for mut notification in batch {
            notification.member_id = member_id;
            notification.source = NotificationSource::Generated;
            ids.push(insert_notification(&mut tx, user_id, notification).await?);
        }
        tx.commit().await?;

        let mut inserted = Vec::with_capacity(ids.len());
        for id in ids {
            inserted.push(self.get_notification(user_id, id).await?);
        }
        Ok(inserted)
    }
}

async fn insert_notification(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    notification: NewNotification,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(
        r#"INSERT INTO notifications (user_id, member_id, title, message, type, is_read, source, created_at)
           VALUES (?, ?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(user_id)
    .bind(notification.member_id)
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.kind.as_str())
    .bind(notification.source.as_str())
    .bind(now_ts())
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();
    Ok(id)
}

fn row_to_notification(row: SqliteRow) -> Result<DbNotification, sqlx::Error> {
    let kind: String = row.try_get("type")?;
    let source: String = row.try_get("source")?;
    let is_read: i64 = row.try_get("is_read")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(DbNotification {
        id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        kind: NotificationKind::parse_lenient(&kind),
        is_read: is_read != 0,
        source: NotificationSource::parse_lenient(&source),
        created_at: parse_ts(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::db::models::{NewMember, NewNotification};
    use crate::db::sqlite::test_support::temp_storage;
    use crate::error::HubError;
    use crate::types::notification::{NotificationKind, NotificationSource};

    fn note(member_id: Option<i64>, title: &str) -> NewNotification {
        NewNotification {
            member_id,
            title: title.into(),
            message: format!("{title} body"),
            kind: NotificationKind::Reminder,
            source: NotificationSource::Manual,
        }
    }

    async fn member(db: &crate::db::HomeStorage, name: &str) -> i64 {
        db.create_member(
            "alice",
            NewMember {
                name: name.into(),
                avatar_url: None,
                preferences: Default::default(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn member_filter_includes_household_wide_rows() {
        let db = temp_storage().await;
        let ana = member(&db, "Ana").await;
        let bia = member(&db, "Bia").await;
        db.create_notification("alice", note(Some(ana), "ana")).await.unwrap();
        db.create_notification("alice", note(Some(bia), "bia")).await.unwrap();
        db.create_notification("alice", note(None, "casa")).await.unwrap();

        let titles: Vec<String> = db
            .list_notifications("alice", Some(ana))
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["casa", "ana"]);
        assert_eq!(db.list_notifications("alice", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn replacing_generated_keeps_manual_rows() {
        let db = temp_storage().await;
        let ana = member(&db, "Ana").await;
        db.create_notification("alice", note(Some(ana), "manual")).await.unwrap();

        let first = db
            .replace_generated("alice", Some(ana), vec![note(None, "g1"), note(None, "g2")])
            .await
            .unwrap();
        assert!(first.iter().all(|n| n.source == NotificationSource::Generated));
        assert!(first.iter().all(|n| n.member_id == Some(ana)));

        db.replace_generated("alice", Some(ana), vec![note(None, "g3")])
            .await
            .unwrap();
        let mut titles: Vec<String> = db
            .list_notifications("alice", Some(ana))
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["g3", "manual"]);
    }

    #[tokio::test]
    async fn household_batch_only_touches_rows_without_member() {
        let db = temp_storage().await;
        let ana = member(&db, "Ana").await;
        db.replace_generated("alice", Some(ana), vec![note(None, "ana")])
            .await
            .unwrap();
        db.replace_generated("alice", None, vec![note(None, "casa-1")])
            .await
            .unwrap();
        db.replace_generated("alice", None, vec![note(None, "casa-2")])
            .await
            .unwrap();

        let mut titles: Vec<String> = db
            .list_notifications("alice", None)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["ana", "casa-2"]);
    }

    #[tokio::test]
    async fn mark_read_and_delete() {
        let db = temp_storage().await;
        let n = db.create_notification("alice", note(None, "x")).await.unwrap();
        assert!(!n.is_read);
        assert!(db.mark_read("alice", n.id, true).await.unwrap().is_read);
        assert!(matches!(
            db.mark_read("bob", n.id, true).await,
            Err(HubError::NotFound(_))
        ));
        db.delete_notification("alice", n.id).await.unwrap();
        assert!(matches!(
            db.delete_notification("alice", n.id).await,
            Err(HubError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_member_is_rejected() {
        let db = temp_storage().await;
        assert!(matches!(
            db.create_notification("alice", note(Some(999), "x")).await,
            Err(HubError::NotFound("Member"))
        ));
    }
}
