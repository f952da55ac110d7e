use super::models::{DbMember, MemberPatch, NewMember};
use super::sqlite::{HomeStorage, parse_json, to_json};
use crate::error::HubError;
use crate::face::{EnrolledFace, normalize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

impl HomeStorage {
    pub async fn list_members(&self, user_id: &str) -> Result<Vec<DbMember>, HubError> {
        let rows = sqlx::query(
            r#"SELECT id, name, avatar_url, face_embedding, preferences
               FROM household_members WHERE user_id = ? ORDER BY name"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(row_to_member)
            .collect::<Result<_, _>>()?)
    }

    pub async fn get_member(&self, user_id: &str, id: i64) -> Result<DbMember, HubError> {
        let row = sqlx::query(
            r#"SELECT id, name, avatar_url, face_embedding, preferences
               FROM household_members WHERE id = ? AND user_id = ?"#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(HubError::NotFound("Member"))?;
        Ok(row_to_member(row)?)
    }

    pub async fn create_member(
        &self,
        user_id: &str,
        member: NewMember,
    ) -> Result<DbMember, HubError> {
        let id = sqlx::query(
            "INSERT INTO household_members (user_id, name, avatar_url, preferences) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(member.name)
        .bind(member.avatar_url)
        .bind(to_json(&member.preferences)?)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        self.get_member(user_id, id).await
    }

    /// Preferences are replaced as a whole when present.
    pub async fn update_member(
        &self,
        user_id: &str,
        id: i64,
        patch: MemberPatch,
    ) -> Result<DbMember, HubError> {
        let current = self.get_member(user_id, id).await?;
        sqlx::query(
            r#"UPDATE household_members SET name = ?, avatar_url = ?, preferences = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(patch.name.unwrap_or(current.name))
        .bind(patch.avatar_url.or(current.avatar_url))
        .bind(to_json(&patch.preferences.unwrap_or(current.preferences))?)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        self.get_member(user_id, id).await
    }

    /// Store a face embedding for the member, normalized to unit length.
    /// `None` or an empty vector clears the enrollment.
    pub async fn set_face_embedding(
        &self,
        user_id: &str,
        id: i64,
        embedding: Option<Vec<f32>>,
    ) -> Result<DbMember, HubError> {
        let stored = match embedding {
            Some(e) if !e.is_empty() => Some(to_json(&normalize(&e))?),
            _ => None,
        };
        let updated = sqlx::query(
            "UPDATE household_members SET face_embedding = ? WHERE id = ? AND user_id = ?",
        )
        .bind(stored)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(HubError::NotFound("Member"));
        }
        self.get_member(user_id, id).await
    }

    /// Every member of the household with whatever embedding is stored.
    pub async fn enrolled_faces(&self, user_id: &str) -> Result<Vec<EnrolledFace>, HubError> {
        Ok(self
            .list_members(user_id)
            .await?
            .into_iter()
            .map(|m| EnrolledFace {
                member_id: m.id,
                embedding: m.face_embedding,
            })
            .collect())
    }

    /// Removes the member's notifications first.
    pub async fn delete_member(&self, user_id: &str, id: i64) -> Result<(), HubError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM notifications WHERE member_id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM household_members WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(HubError::NotFound("Member"));
        }
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_member(row: SqliteRow) -> Result<DbMember, sqlx::Error> {
    let face_embedding: Option<String> = row.try_get("face_embedding")?;
    let preferences: String = row.try_get("preferences")?;
    Ok(DbMember {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        avatar_url: row.try_get("avatar_url")?,
        face_embedding: face_embedding
            .as_deref()
            .map(parse_json::<Vec<f32>>)
            .transpose()?,
        preferences: parse_json(&preferences)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::db::models::{MemberPatch, NewMember, NewNotification};
    use crate::db::sqlite::test_support::temp_storage;
    use crate::error::HubError;
    use crate::types::member::Preferences;

    fn member(name: &str) -> NewMember {
        NewMember {
            name: name.into(),
            avatar_url: None,
            preferences: Preferences {
                music: vec!["Samba".into()],
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn embeddings_are_stored_normalized() {
        let db = temp_storage().await;
        let ana = db.create_member("alice", member("Ana")).await.unwrap();
        assert!(!ana.has_face());

        let ana = db
            .set_face_embedding("alice", ana.id, Some(vec![3.0, 4.0]))
            .await
            .unwrap();
        let stored = ana.face_embedding.unwrap();
        assert!((stored[0] - 0.6).abs() < 1e-6);
        assert!((stored[1] - 0.8).abs() < 1e-6);

        let faces = db.enrolled_faces("alice").await.unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].member_id, ana.id);

        let cleared = db
            .set_face_embedding("alice", ana.id, Some(vec![]))
            .await
            .unwrap();
        assert!(!cleared.has_face());
    }

    #[tokio::test]
    async fn preferences_patch_replaces_whole_object() {
        let db = temp_storage().await;
        let bia = db.create_member("alice", member("Bia")).await.unwrap();
        let bia = db
            .update_member(
                "alice",
                bia.id,
                MemberPatch {
                    preferences: Some(Preferences {
                        sports: vec!["Flamengo".into()],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(bia.name, "Bia");
        assert!(bia.preferences.music.is_empty());
        assert_eq!(bia.preferences.sports, vec!["Flamengo"]);
    }

    #[tokio::test]
    async fn deleting_a_member_drops_their_notifications() {
        let db = temp_storage().await;
        let caio = db.create_member("alice", member("Caio")).await.unwrap();
        db.create_notification(
            "alice",
            NewNotification {
                member_id: Some(caio.id),
                title: "Oi".into(),
                message: "Bem-vindo".into(),
                kind: Default::default(),
                source: Default::default(),
            },
        )
        .await
        .unwrap();

        db.delete_member("alice", caio.id).await.unwrap();
        assert!(db.list_notifications("alice", None).await.unwrap().is_empty());
        assert!(matches!(
            db.get_member("alice", caio.id).await,
            Err(HubError::NotFound(_))
        ));
    }
}
