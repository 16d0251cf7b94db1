//! Audit Hand-off
//!
//! Converts execution results into audit events and passes them to a sink.
//! Persisting the audit trail is the sink's business; the engine only
//! guarantees that every field an auditor needs is on the event.

use crate::catalog::SecurityTool;
use crate::policy::Role;
use crate::tools::{ExecutionStatus, ToolExecutionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Audit action name for tool runs
pub const TOOL_EXECUTE_ACTION: &str = "tool:execute";

/// One audited tool run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub execution_id: Uuid,
    pub tool_name: String,
    pub command: String,
    pub status: ExecutionStatus,
    pub return_code: i32,
    pub risk_level: Option<u8>,
    pub role: Option<Role>,
    pub output_file: Option<PathBuf>,
    pub hash_sha256: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Build the event for a finished run
    ///
    /// `tool` is `None` when the key did not resolve to a catalog entry.
    pub fn from_result(
        result: &ToolExecutionResult,
        tool: Option<&SecurityTool>,
        role: Option<Role>,
    ) -> Self {
        Self {
            action: TOOL_EXECUTE_ACTION.to_string(),
            execution_id: result.execution_id,
            tool_name: result.tool_name.clone(),
            command: result.command.clone(),
            status: result.status,
            return_code: result.return_code,
            risk_level: tool.map(|t| t.risk_level),
            role,
            output_file: result.output_file.clone(),
            hash_sha256: result.hash_sha256.clone(),
            timestamp: result.timestamp,
        }
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits audit events as structured `tracing` records on the `audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        tracing::info!(
            target: "audit",
            action = %event.action,
            execution_id = %event.execution_id,
            tool = %event.tool_name,
            command = %event.command,
            status = %event.status,
            return_code = event.return_code,
            risk_level = event.risk_level,
            role = event.role.map(|r| r.as_str()),
            hash_sha256 = event.hash_sha256.as_deref(),
            "Tool execution audited"
        );
    }
}

/// Keeps audit events in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Export events as JSON string (for auditing)
    pub fn export_audit_log(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.events())?)
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
