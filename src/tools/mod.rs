//! Tool Execution Subsystem
//!
//! Turns catalog entries into running processes and auditable results.
//!
//! # Architecture
//!
//! The module is organized into:
//! - `template.rs`: `{placeholder}` parsing, substitution and spawn plans
//! - `manager.rs`: Catalog queries and command building
//! - `timeout.rs`: Timeout resolution and enforcement
//! - `executor.rs`: Subprocess execution, evidence artifacts and hashing
//! - `history.rs`: Bounded in-memory log of results
//!
//! # Example
//!
//! ```no_run
//! use anptop_engine::tools::{ExecutorConfig, ToolExecutor, ToolManager, ToolParameters};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let executor = ToolExecutor::new(
//!         ToolManager::builtin()?,
//!         ExecutorConfig::with_evidence_root("/tmp/evidence"),
//!     );
//!
//!     let mut params = ToolParameters::new();
//!     params.insert("target".to_string(), "10.0.0.1".to_string());
//!
//!     let result = executor.execute_tool("nmap", &params, Some(60), true).await;
//!     println!("Return code: {}", result.return_code);
//!     println!("Stdout: {}", result.stdout);
//!
//!     Ok(())
//! }
//! ```

mod executor;
mod history;
mod manager;
mod template;
mod timeout;

pub use executor::{
    hash_file, sha256_hex, ExecutionError, ExecutionErrorKind, ExecutionRequest, ExecutionStatus,
    ExecutorConfig, ToolExecutionResult, ToolExecutor, DEFAULT_EVIDENCE_ROOT,
    DEFAULT_MAX_OUTPUT_BYTES, NO_RETURN_CODE,
};
pub use history::{ExecutionHistory, StatusCounts, DEFAULT_HISTORY_CAPACITY};
pub use manager::{ToolInfo, ToolManager, ToolSummary};
pub use template::{shell_quote, CommandPlan, CommandTemplate, PreparedCommand, ToolParameters};
pub use timeout::ExecutionTimeout;
