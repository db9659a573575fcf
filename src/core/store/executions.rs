use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::Store;
use super::types::{ExecutionLogRecord, ExecutionRecord, LogLevel};

fn execution_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    Ok(ExecutionRecord {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        input: row.get(2)?,
        output: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionLogRecord> {
    Ok(ExecutionLogRecord {
        id: row.get(0)?,
        execution_id: row.get(1)?,
        message: row.get(2)?,
        level: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

const EXECUTION_COLUMNS: &str = "id, agent_id, input, output, status, created_at, completed_at";

impl Store {
    pub async fn create_execution(&self, agent_id: i64, input_text: &str) -> Result<ExecutionRecord> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO executions (agent_id, input, status) VALUES (?1, ?2, 'pending')",
            params![agent_id, input_text],
        )?;
        let id = db.last_insert_rowid();
        let execution = db.query_row(
            &format!("SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = ?1"),
            params![id],
            execution_from_row,
        )?;
        Ok(execution)
    }

    /// Unscoped fetch for the completion unit, which carries only the id.
    pub(crate) async fn execution_by_id(&self, execution_id: i64) -> Result<Option<ExecutionRecord>> {
        let db = self.db.lock().await;
        let execution = db
            .query_row(
                &format!("SELECT {EXECUTION_COLUMNS} FROM executions WHERE id = ?1"),
                params![execution_id],
                execution_from_row,
            )
            .optional()?;
        Ok(execution)
    }

    /// Ownership guard for executions: resolves through the parent agent.
    pub async fn owned_execution(
        &self,
        owner_id: i64,
        execution_id: i64,
    ) -> Result<Option<ExecutionRecord>> {
        let db = self.db.lock().await;
        let execution = db
            .query_row(
                "SELECT e.id, e.agent_id, e.input, e.output, e.status, e.created_at, e.completed_at
                 FROM executions e JOIN agents a ON e.agent_id = a.id
                 WHERE e.id = ?1 AND a.owner_id = ?2",
                params![execution_id, owner_id],
                execution_from_row,
            )
            .optional()?;
        Ok(execution)
    }

    /// All executions across the caller's agents, joined and filtered in the
    /// query itself.
    pub async fn list_executions(
        &self,
        owner_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ExecutionRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT e.id, e.agent_id, e.input, e.output, e.status, e.created_at, e.completed_at
             FROM executions e JOIN agents a ON e.agent_id = a.id
             WHERE a.owner_id = ?1 ORDER BY e.id LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![owner_id, limit, skip], execution_from_row)?;
        let mut executions = Vec::new();
        for row in rows {
            executions.push(row?);
        }
        Ok(executions)
    }

    pub async fn delete_execution(&self, owner_id: i64, execution_id: i64) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let owned: Option<i64> = tx
            .query_row(
                "SELECT e.id FROM executions e JOIN agents a ON e.agent_id = a.id
                 WHERE e.id = ?1 AND a.owner_id = ?2",
                params![execution_id, owner_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Ok(false);
        }
        tx.execute(
            "DELETE FROM execution_logs WHERE execution_id = ?1",
            params![execution_id],
        )?;
        tx.execute("DELETE FROM executions WHERE id = ?1", params![execution_id])?;
        tx.commit()?;
        Ok(true)
    }

    /// Terminal transition to `completed`. The status predicate makes a
    /// second attempt a no-op.
    pub async fn complete_execution(&self, execution_id: i64, output: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE executions SET output = ?2, status = 'completed',
             completed_at = datetime('now') WHERE id = ?1 AND status = 'pending'",
            params![execution_id, output],
        )?;
        Ok(rows > 0)
    }

    /// Terminal transition to `failed`, persisting the error description and
    /// the log entry together.
    pub async fn fail_execution(
        &self,
        execution_id: i64,
        output: &str,
        log_message: &str,
    ) -> Result<bool> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let rows = tx.execute(
            "UPDATE executions SET output = ?2, status = 'failed',
             completed_at = datetime('now') WHERE id = ?1 AND status = 'pending'",
            params![execution_id, output],
        )?;
        if rows > 0 {
            tx.execute(
                "INSERT INTO execution_logs (execution_id, message, level) VALUES (?1, ?2, 'error')",
                params![execution_id, log_message],
            )?;
        }
        tx.commit()?;
        Ok(rows > 0)
    }

    pub async fn append_execution_log(
        &self,
        execution_id: i64,
        message: &str,
        level: LogLevel,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO execution_logs (execution_id, message, level) VALUES (?1, ?2, ?3)",
            params![execution_id, message, level.as_str()],
        )?;
        Ok(())
    }

    pub async fn execution_logs(&self, execution_id: i64) -> Result<Vec<ExecutionLogRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, execution_id, message, level, timestamp
             FROM execution_logs WHERE execution_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![execution_id], log_from_row)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::types::ExecutionStatus;

    async fn store_with_agent() -> (Store, i64, i64) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("admin", "admin@evolve.ai", "hash")
            .await
            .unwrap()
            .unwrap();
        let agent = store
            .create_agent(user.id, "A", None, "gpt-3.5-turbo")
            .await
            .unwrap();
        (store, user.id, agent.id)
    }

    #[tokio::test]
    async fn new_execution_is_pending_with_empty_terminal_fields() {
        let (store, _, agent_id) = store_with_agent().await;
        let execution = store.create_execution(agent_id, "ping").await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert!(execution.output.is_none());
        assert!(execution.completed_at.is_none());
    }

    #[tokio::test]
    async fn completion_sets_output_status_and_timestamp() {
        let (store, _, agent_id) = store_with_agent().await;
        let execution = store.create_execution(agent_id, "ping").await.unwrap();
        assert!(store.complete_execution(execution.id, "pong").await.unwrap());

        let execution = store.execution_by_id(execution.id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.output.as_deref(), Some("pong"));
        assert!(execution.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_executions_never_transition_again() {
        let (store, _, agent_id) = store_with_agent().await;
        let execution = store.create_execution(agent_id, "ping").await.unwrap();
        assert!(store.complete_execution(execution.id, "pong").await.unwrap());

        assert!(!store.complete_execution(execution.id, "other").await.unwrap());
        assert!(!store.fail_execution(execution.id, "Error: x", "x").await.unwrap());

        let execution = store.execution_by_id(execution.id).await.unwrap().unwrap();
        assert_eq!(execution.output.as_deref(), Some("pong"));
        assert!(store.execution_logs(execution.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_persists_output_and_log_together() {
        let (store, _, agent_id) = store_with_agent().await;
        let execution = store.create_execution(agent_id, "ping").await.unwrap();
        assert!(
            store
                .fail_execution(execution.id, "Error: timeout", "Error during execution: timeout")
                .await
                .unwrap()
        );

        let execution = store.execution_by_id(execution.id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.completed_at.is_some());

        let logs = store.execution_logs(execution.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert!(logs[0].message.contains("timeout"));
    }

    #[tokio::test]
    async fn listing_and_fetching_are_scoped_through_the_parent_agent() {
        let (store, owner, agent_id) = store_with_agent().await;
        let other = store
            .create_user("intruder", "intruder@evolve.ai", "hash")
            .await
            .unwrap()
            .unwrap();
        let execution = store.create_execution(agent_id, "ping").await.unwrap();

        assert!(
            store
                .owned_execution(owner, execution.id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .owned_execution(other.id, execution.id)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.list_executions(owner, 0, 100).await.unwrap().len(), 1);
        assert!(store.list_executions(other.id, 0, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_execution_and_its_logs() {
        let (store, owner, agent_id) = store_with_agent().await;
        let execution = store.create_execution(agent_id, "ping").await.unwrap();
        store
            .fail_execution(execution.id, "Error: x", "Error during execution: x")
            .await
            .unwrap();

        assert!(store.delete_execution(owner, execution.id).await.unwrap());
        assert!(store.execution_by_id(execution.id).await.unwrap().is_none());
        assert!(store.execution_logs(execution.id).await.unwrap().is_empty());
        // Second delete conflates with never-existed.
        assert!(!store.delete_execution(owner, execution.id).await.unwrap());
    }
}
