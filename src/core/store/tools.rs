use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use super::types::{AgentToolRecord, ToolRecord};

fn tool_from_row(row: &Row<'_>) -> rusqlite::Result<ToolRecord> {
    Ok(ToolRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn agent_tool_from_row(row: &Row<'_>) -> rusqlite::Result<AgentToolRecord> {
    Ok(AgentToolRecord {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        tool_id: row.get(2)?,
        config: row.get(3)?,
    })
}

const TOOL_COLUMNS: &str = "id, name, description, icon, created_at";

impl Store {
    /// Returns `None` when a tool with this name already exists; names are
    /// unique, never upserted.
    pub async fn create_tool(
        &self,
        name: &str,
        description: &str,
        icon: Option<&str>,
    ) -> Result<Option<ToolRecord>> {
        let db = self.db.lock().await;
        let taken: i64 = db.query_row(
            "SELECT COUNT(*) FROM tools WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Ok(None);
        }
        db.execute(
            "INSERT INTO tools (name, description, icon) VALUES (?1, ?2, ?3)",
            params![name, description, icon],
        )?;
        let id = db.last_insert_rowid();
        let tool = db.query_row(
            &format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = ?1"),
            params![id],
            tool_from_row,
        )?;
        Ok(Some(tool))
    }

    /// Tools are global; no ownership filter applies.
    pub async fn list_tools(&self, skip: i64, limit: i64) -> Result<Vec<ToolRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {TOOL_COLUMNS} FROM tools ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![limit, skip], tool_from_row)?;
        let mut tools = Vec::new();
        for row in rows {
            tools.push(row?);
        }
        Ok(tools)
    }

    pub async fn tool_by_id(&self, tool_id: i64) -> Result<Option<ToolRecord>> {
        let db = self.db.lock().await;
        let tool = db
            .query_row(
                &format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = ?1"),
                params![tool_id],
                tool_from_row,
            )
            .optional()?;
        Ok(tool)
    }

    /// Returns `None` when the (agent, tool) pair is already attached. The
    /// caller is responsible for the agent ownership and tool existence
    /// checks.
    pub async fn attach_tool(
        &self,
        agent_id: i64,
        tool_id: i64,
        config: Option<&str>,
    ) -> Result<Option<AgentToolRecord>> {
        let db = self.db.lock().await;
        let attached: i64 = db.query_row(
            "SELECT COUNT(*) FROM agent_tools WHERE agent_id = ?1 AND tool_id = ?2",
            params![agent_id, tool_id],
            |row| row.get(0),
        )?;
        if attached > 0 {
            return Ok(None);
        }
        db.execute(
            "INSERT INTO agent_tools (agent_id, tool_id, config) VALUES (?1, ?2, ?3)",
            params![agent_id, tool_id, config],
        )?;
        let id = db.last_insert_rowid();
        let agent_tool = db.query_row(
            "SELECT id, agent_id, tool_id, config FROM agent_tools WHERE id = ?1",
            params![id],
            agent_tool_from_row,
        )?;
        Ok(Some(agent_tool))
    }

    pub async fn detach_tool(&self, agent_id: i64, tool_id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "DELETE FROM agent_tools WHERE agent_id = ?1 AND tool_id = ?2",
            params![agent_id, tool_id],
        )?;
        Ok(rows > 0)
    }
}
