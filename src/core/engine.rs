use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use super::llm::LlmClient;
use super::store::Store;
use super::store::types::{AgentRecord, ExecutionRecord, LogLevel};

/// Creates executions in the pending state and finalizes them out of band.
/// The submitting request never waits for the LLM; callers poll the
/// execution to observe the terminal state.
#[derive(Clone)]
pub struct ExecutionEngine {
    store: Store,
    llm: Arc<dyn LlmClient>,
}

impl ExecutionEngine {
    pub fn new(store: Store, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, llm }
    }

    /// Persists a pending execution and schedules its completion unit,
    /// which carries only the execution id and the agent's model. Returns
    /// the pending record immediately. Agent ownership must already have
    /// been checked by the caller.
    pub async fn submit(&self, agent: &AgentRecord, input_text: &str) -> Result<ExecutionRecord> {
        let execution = self.store.create_execution(agent.id, input_text).await?;
        info!(
            "Scheduled execution {} for agent {} (model {})",
            execution.id, agent.id, agent.model
        );

        let store = self.store.clone();
        let llm = Arc::clone(&self.llm);
        let model = agent.model.clone();
        let execution_id = execution.id;
        tokio::spawn(async move {
            run_completion(store, llm, execution_id, model).await;
        });

        Ok(execution)
    }
}

/// The deferred completion unit. Owns an independent store handle and never
/// lets an error escape this boundary; nothing awaits its result, so errors
/// terminate by being written into domain state.
pub(crate) async fn run_completion(
    store: Store,
    llm: Arc<dyn LlmClient>,
    execution_id: i64,
    model: String,
) {
    if let Err(e) = complete(&store, llm.as_ref(), execution_id, &model).await {
        error!("Unexpected error completing execution {execution_id}: {e:#}");
        // Best effort using the bare id; its own failure is swallowed.
        if store
            .append_execution_log(
                execution_id,
                &format!("Unexpected error: {e}"),
                LogLevel::Error,
            )
            .await
            .is_err()
        {
            error!("Could not record completion error for execution {execution_id}");
        }
    }
}

async fn complete(store: &Store, llm: &dyn LlmClient, execution_id: i64, model: &str) -> Result<()> {
    let Some(execution) = store.execution_by_id(execution_id).await? else {
        // Deleted between submit and completion.
        return Ok(());
    };
    if execution.status.is_terminal() {
        return Ok(());
    }

    match llm.generate(&execution.input, model).await {
        Ok(output) => {
            store.complete_execution(execution_id, &output).await?;
            info!("Execution {execution_id} completed");
        }
        Err(e) => {
            store
                .fail_execution(
                    execution_id,
                    &format!("Error: {e}"),
                    &format!("Error during execution: {e}"),
                )
                .await?;
            error!("Execution {execution_id} failed: {e:#}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::testing::MockLlm;
    use crate::core::store::types::ExecutionStatus;
    use std::time::Duration;

    async fn engine_with_agent(llm: MockLlm) -> (ExecutionEngine, Store, AgentRecord) {
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
        let engine = ExecutionEngine::new(store.clone(), Arc::new(llm));
        (engine, store, agent)
    }

    async fn wait_terminal(store: &Store, execution_id: i64) -> ExecutionRecord {
        for _ in 0..200 {
            let execution = store
                .execution_by_id(execution_id)
                .await
                .unwrap()
                .expect("execution should exist");
            if execution.status.is_terminal() {
                return execution;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("execution {execution_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn submit_returns_a_pending_record_immediately() {
        let (engine, _, agent) = engine_with_agent(MockLlm::Respond("pong".into())).await;
        let execution = engine.submit(&agent, "ping").await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Pending);
        assert!(execution.output.is_none());
        assert!(execution.completed_at.is_none());
    }

    #[tokio::test]
    async fn successful_completion_reaches_completed() {
        let (engine, store, agent) = engine_with_agent(MockLlm::Respond("pong".into())).await;
        let execution = engine.submit(&agent, "ping").await.unwrap();

        let execution = wait_terminal(&store, execution.id).await;
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.output.as_deref(), Some("pong"));
        assert!(execution.completed_at.is_some());
        assert!(store.execution_logs(execution.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn llm_failure_reaches_failed_with_one_error_log() {
        let (engine, store, agent) =
            engine_with_agent(MockLlm::Fail("connection reset".into())).await;
        let execution = engine.submit(&agent, "ping").await.unwrap();

        let execution = wait_terminal(&store, execution.id).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.output.unwrap().contains("connection reset"));
        assert!(execution.completed_at.is_some());

        let logs = store.execution_logs(execution.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert!(logs[0].message.contains("connection reset"));
    }

    #[tokio::test]
    async fn completion_is_idempotent_once_terminal() {
        let (_, store, agent) = engine_with_agent(MockLlm::Respond("pong".into())).await;
        let execution = store.create_execution(agent.id, "ping").await.unwrap();

        let respond: Arc<dyn LlmClient> = Arc::new(MockLlm::Respond("pong".into()));
        run_completion(store.clone(), respond, execution.id, "gpt-3.5-turbo".into()).await;

        // A stray second attempt, even a failing one, must change nothing.
        let fail: Arc<dyn LlmClient> = Arc::new(MockLlm::Fail("boom".into()));
        run_completion(store.clone(), fail, execution.id, "gpt-3.5-turbo".into()).await;

        let execution = store.execution_by_id(execution.id).await.unwrap().unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.output.as_deref(), Some("pong"));
        assert!(store.execution_logs(execution.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_execution_row_is_reported_through_its_log() {
        let (_, store, agent) = engine_with_agent(MockLlm::Respond("pong".into())).await;
        let execution = store.create_execution(agent.id, "ping").await.unwrap();
        // Force a status value the row mapper cannot decode, so the fetch
        // itself errors rather than the LLM call.
        store
            .run_sql(&format!(
                "UPDATE executions SET status = 'bogus' WHERE id = {}",
                execution.id
            ))
            .await
            .unwrap();

        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::Respond("pong".into()));
        run_completion(store.clone(), llm, execution.id, "gpt-3.5-turbo".into()).await;

        let logs = store.execution_logs(execution.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert!(logs[0].message.contains("Unexpected error"));
    }

    #[tokio::test]
    async fn completion_of_a_deleted_execution_is_a_silent_noop() {
        let (_, store, _) = engine_with_agent(MockLlm::Respond("pong".into())).await;
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::Respond("pong".into()));
        run_completion(store.clone(), llm, 9999, "gpt-3.5-turbo".into()).await;
        assert!(store.execution_logs(9999).await.unwrap().is_empty());
    }
}
