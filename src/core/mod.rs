pub mod auth;
pub mod engine;
pub mod error;
pub mod llm;
pub mod store;
