use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use super::types::AgentRecord;

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        model: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const AGENT_COLUMNS: &str = "id, name, description, model, owner_id, created_at, updated_at";

impl Store {
    pub async fn create_agent(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        model: &str,
    ) -> Result<AgentRecord> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO agents (name, description, model, owner_id) VALUES (?1, ?2, ?3, ?4)",
            params![name, description, model, owner_id],
        )?;
        let id = db.last_insert_rowid();
        let agent = db.query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
            params![id],
            agent_from_row,
        )?;
        Ok(agent)
    }

    pub async fn list_agents(&self, owner_id: i64, skip: i64, limit: i64) -> Result<Vec<AgentRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE owner_id = ?1
             ORDER BY id LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![owner_id, limit, skip], agent_from_row)?;
        let mut agents = Vec::new();
        for row in rows {
            agents.push(row?);
        }
        Ok(agents)
    }

    /// The ownership guard for agents: yields the record only when it exists
    /// AND belongs to the caller. Absent and not-owned are indistinguishable.
    pub async fn owned_agent(&self, owner_id: i64, agent_id: i64) -> Result<Option<AgentRecord>> {
        let db = self.db.lock().await;
        let agent = db
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1 AND owner_id = ?2"),
                params![agent_id, owner_id],
                agent_from_row,
            )
            .optional()?;
        Ok(agent)
    }

    /// Full replace of the mutable fields, scoped by ownership.
    pub async fn update_agent(
        &self,
        owner_id: i64,
        agent_id: i64,
        name: &str,
        description: Option<&str>,
        model: &str,
    ) -> Result<Option<AgentRecord>> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE agents SET name = ?3, description = ?4, model = ?5,
             updated_at = datetime('now') WHERE id = ?1 AND owner_id = ?2",
            params![agent_id, owner_id, name, description, model],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        let agent = db.query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
            params![agent_id],
            agent_from_row,
        )?;
        Ok(Some(agent))
    }

    /// Deletes an owned agent together with its executions, their logs, and
    /// its tool attachments, in one transaction.
    pub async fn delete_agent(&self, owner_id: i64, agent_id: i64) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let owned: Option<i64> = tx
            .query_row(
                "SELECT id FROM agents WHERE id = ?1 AND owner_id = ?2",
                params![agent_id, owner_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Ok(false);
        }
        tx.execute(
            "DELETE FROM execution_logs WHERE execution_id IN
             (SELECT id FROM executions WHERE agent_id = ?1)",
            params![agent_id],
        )?;
        tx.execute("DELETE FROM executions WHERE agent_id = ?1", params![agent_id])?;
        tx.execute("DELETE FROM agent_tools WHERE agent_id = ?1", params![agent_id])?;
        tx.execute("DELETE FROM agents WHERE id = ?1", params![agent_id])?;
        tx.commit()?;
        Ok(true)
    }
}
