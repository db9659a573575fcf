use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub model: String,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Execution lifecycle: `pending` is the only initial state, `completed`
/// and `failed` are terminal. No transition ever leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        self != ExecutionStatus::Pending
    }
}

impl FromSql for ExecutionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(ExecutionStatus::Pending),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(FromSqlError::Other(
                format!("unknown execution status: {other}").into(),
            )),
        }
    }
}

/// Invariants: `output` is set iff the status is terminal, and likewise for
/// `completed_at`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub agent_id: i64,
    pub input: String,
    pub output: Option<String>,
    pub status: ExecutionStatus,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl FromSql for LogLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(FromSqlError::Other(
                format!("unknown log level: {other}").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionLogRecord {
    pub id: i64,
    pub execution_id: i64,
    pub message: String,
    pub level: LogLevel,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub created_at: String,
}

/// Join record granting one agent use of one tool. `config` is an opaque
/// serialized blob the server never interprets.
#[derive(Debug, Clone, Serialize)]
pub struct AgentToolRecord {
    pub id: i64,
    pub agent_id: i64,
    pub tool_id: i64,
    pub config: Option<String>,
}
