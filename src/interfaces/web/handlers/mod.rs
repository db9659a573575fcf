pub mod agents;
pub mod auth;
pub mod executions;
pub mod tools;

use serde::Deserialize;

/// Offset/limit pagination shared by every list endpoint.
#[derive(Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}
