use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use super::types::UserRecord;

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        hashed_password: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, is_active, created_at, updated_at";

impl Store {
    /// Returns `None` when the username or email is already registered.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<UserRecord>> {
        let db = self.db.lock().await;
        let taken: i64 = db.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
            params![username, email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Ok(None);
        }
        db.execute(
            "INSERT INTO users (username, email, hashed_password) VALUES (?1, ?2, ?3)",
            params![username, email, hashed_password],
        )?;
        let id = db.last_insert_rowid();
        let user = db.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )?;
        Ok(Some(user))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let db = self.db.lock().await;
        let user = db
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }
}
