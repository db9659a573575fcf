use anyhow::Result;
use rusqlite::params;
use tracing::info;

use super::Store;
use crate::core::auth::hash_password;

const DEFAULT_TOOLS: &[(&str, &str, &str)] = &[
    ("Web Search", "Search the web for information", "search"),
    ("Calculator", "Perform calculations", "calculator"),
    ("Weather", "Get weather information", "cloud"),
    ("Calendar", "Manage calendar events", "calendar"),
    ("Email", "Send and read emails", "envelope"),
];

impl Store {
    /// Seeds the admin account, the default tool catalog, and a starter
    /// agent. Skipped whenever any user already exists.
    pub async fn seed_defaults(&self) -> Result<()> {
        let mut db = self.db.lock().await;
        let users: i64 = db.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        if users > 0 {
            info!("Database already seeded, skipping");
            return Ok(());
        }

        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO users (username, email, hashed_password) VALUES (?1, ?2, ?3)",
            params!["admin", "admin@evolve.ai", hash_password("admin")],
        )?;
        let admin_id = tx.last_insert_rowid();
        for (name, description, icon) in DEFAULT_TOOLS {
            tx.execute(
                "INSERT INTO tools (name, description, icon) VALUES (?1, ?2, ?3)",
                params![name, description, icon],
            )?;
        }
        tx.execute(
            "INSERT INTO agents (name, description, model, owner_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                "General Assistant",
                "A general-purpose AI assistant",
                "gpt-3.5-turbo",
                admin_id
            ],
        )?;
        tx.commit()?;
        info!("Seeded admin user, {} default tools, and a starter agent", DEFAULT_TOOLS.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::verify_password;

    #[tokio::test]
    async fn seeding_creates_admin_tools_and_agent() {
        let store = Store::open_in_memory().unwrap();
        store.seed_defaults().await.unwrap();

        let admin = store.user_by_username("admin").await.unwrap().unwrap();
        assert!(verify_password("admin", &admin.hashed_password));
        assert_eq!(store.list_tools(0, 100).await.unwrap().len(), 5);
        assert_eq!(store.list_agents(admin.id, 0, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.seed_defaults().await.unwrap();
        store.seed_defaults().await.unwrap();
        assert_eq!(store.list_tools(0, 100).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn seeding_skips_a_populated_database() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_user("existing", "existing@evolve.ai", "hash")
            .await
            .unwrap()
            .unwrap();
        store.seed_defaults().await.unwrap();
        assert!(store.user_by_username("admin").await.unwrap().is_none());
        assert!(store.list_tools(0, 100).await.unwrap().is_empty());
    }
}
