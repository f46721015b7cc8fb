//! devtasks - task tracking for a project directory
//!
//! Keeps every task of a project in one JSON document under a reserved
//! directory (`.devtasks/tasks.json` by default) and exposes it through
//! a CLI and a line-delimited JSON-RPC tool server.
//!
//! # Core Concepts
//!
//! - **Store**: reads and writes the whole document; no domain logic
//! - **Manager**: id generation, filtering, dotted-id lookup, mutations,
//!   next-task selection and statistics
//! - **Tasks**: numeric string ids, priorities, dependencies, subtasks
//!   addressed as `"<task>.<subtask>"`

pub mod checklist;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod lock;
pub mod manager;
pub mod mcp;
pub mod output;
pub mod store;
pub mod task;

pub use error::{Error, Result};
pub use manager::TaskManager;
pub use store::Store;
