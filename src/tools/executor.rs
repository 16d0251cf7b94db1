//! Tool Executor
//!
//! Runs one catalog tool to completion (or timeout) and produces an
//! auditable [`ToolExecutionResult`].
//!
//! Each invocation moves through
//! `START → COMMAND_BUILT → RUNNING → {COMPLETED | TIMED_OUT | SPAWN_ERROR} → RESULT_RECORDED`:
//!
//! 1. Resolve the tool; unknown keys end in a `failed` result.
//! 2. Build the command plan; a missing template ends in a `failed` result.
//! 3. Create a fresh UUID-named scratch directory under the evidence root.
//! 4. Resolve the effective timeout (caller override, else the tool's own).
//! 5. Spawn the command with the scratch directory as working directory,
//!    capturing at most `max_output_bytes` per stream.
//! 6. Wait for exit, or kill the process group when the deadline passes.
//! 7. Write the output artifact and hash it with SHA-256.
//! 8. Classify the status and append the result to the history.
//!
//! The public entry points never return an error: every failure is folded
//! into the result's `status` and `stderr`.

use super::history::ExecutionHistory;
use super::manager::{ToolInfo, ToolManager, ToolSummary};
use super::template::{CommandPlan, PreparedCommand, ToolParameters};
use super::timeout::ExecutionTimeout;
use crate::catalog::SecurityTool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default evidence storage root
pub const DEFAULT_EVIDENCE_ROOT: &str = "/data/evidence";

/// Maximum captured bytes per output stream (10 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Return code reported when no real exit code exists
pub const NO_RETURN_CODE: i32 = -1;

const TIMEOUT_STDOUT: &str = "Command timed out";
const TIMEOUT_STDERR: &str = "Process killed due to timeout";
const READ_CHUNK: usize = 8192;

/// Outcome class of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Process exited with code 0
    Success,
    /// Tool missing, command unbuildable, timeout or non-zero exit
    Failed,
    /// Spawn or I/O failure inside the pipeline
    Error,
}

impl ExecutionStatus {
    /// `Success` iff the return code is exactly 0
    pub fn from_return_code(code: i32) -> Self {
        if code == 0 {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an execution did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    ToolNotFound,
    CommandUnbuildable,
    ExecutionTimeout,
    NonZeroExit,
    SpawnOrIo,
}

/// Internal pipeline failures, reported as `status = error`
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Failed to create scratch directory {path}: {source}")]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command plan is empty")]
    EmptyCommand,

    #[error("Failed to spawn process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Failed to capture process output: {0}")]
    Capture(String),

    #[error("Failed to write output file {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one tool execution
///
/// Constructed once at the end of an attempt and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    /// Identifier naming the scratch directory
    pub execution_id: Uuid,

    /// Tool key as supplied by the caller
    pub tool_name: String,

    /// Command line that was run (empty if none was built)
    pub command: String,

    /// Process exit code, or -1 when there is none
    pub return_code: i32,

    /// Captured standard output (lossy UTF-8)
    pub stdout: String,

    /// Captured standard error (lossy UTF-8)
    pub stderr: String,

    /// Wall-clock duration of the run
    pub duration_seconds: f64,

    /// Outcome class
    pub status: ExecutionStatus,

    /// Failure classification, `None` on success
    pub error_kind: Option<ExecutionErrorKind>,

    /// Whether the run was killed at its deadline
    pub timed_out: bool,

    /// Whether either stream hit the output ceiling
    pub output_truncated: bool,

    /// Path of the written output artifact
    pub output_file: Option<PathBuf>,

    /// Hex SHA-256 of the output artifact bytes
    pub hash_sha256: Option<String>,

    /// When the run started (UTC)
    pub timestamp: DateTime<Utc>,
}

impl ToolExecutionResult {
    /// A `failed` result for a run that never started
    pub(crate) fn rejected(
        tool_name: impl Into<String>,
        kind: ExecutionErrorKind,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            command: String::new(),
            return_code: NO_RETURN_CODE,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_seconds: 0.0,
            status: ExecutionStatus::Failed,
            error_kind: Some(kind),
            timed_out: false,
            output_truncated: false,
            output_file: None,
            hash_sha256: None,
            timestamp: Utc::now(),
        }
    }

    /// Whether the tool exited with code 0
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        if self.timed_out {
            format!(
                "{}: timeout after {:.2}s",
                self.tool_name, self.duration_seconds
            )
        } else {
            format!(
                "{}: {} (return code: {}, {:.2}s, {} bytes output)",
                self.tool_name,
                self.status,
                self.return_code,
                self.duration_seconds,
                self.stdout.len() + self.stderr.len()
            )
        }
    }
}

/// Configuration for tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Root under which one scratch directory per execution is created
    pub evidence_root: PathBuf,

    /// Maximum captured bytes per stream (default: 10 MiB)
    pub max_output_bytes: usize,

    /// Bound applied to runs that would otherwise have no timeout; 0 keeps them unbounded
    pub daemon_timeout_cap_secs: u64,

    /// Fill unsupplied placeholders from the tool's declared defaults
    pub merge_default_parameters: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            evidence_root: PathBuf::from(DEFAULT_EVIDENCE_ROOT),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            daemon_timeout_cap_secs: 0,
            merge_default_parameters: false,
        }
    }
}

impl ExecutorConfig {
    /// Create a config writing evidence under `root`
    pub fn with_evidence_root(root: impl Into<PathBuf>) -> Self {
        Self {
            evidence_root: root.into(),
            ..Default::default()
        }
    }

    /// Set the per-stream output ceiling
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Cap runs that have no timeout
    pub fn daemon_timeout_cap(mut self, secs: u64) -> Self {
        self.daemon_timeout_cap_secs = secs;
        self
    }

    /// Merge declared parameter defaults before substitution
    pub fn merge_defaults(mut self, merge: bool) -> Self {
        self.merge_default_parameters = merge;
        self
    }
}

/// One execution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub tool_name: String,
    pub parameters: ToolParameters,
    pub timeout_secs: Option<u64>,
    pub capture_output: bool,
}

impl ExecutionRequest {
    /// Request for `tool_name` with no parameters, the tool's timeout and output capture
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: ToolParameters::new(),
            timeout_secs: None,
            capture_output: true,
        }
    }

    /// Add one parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replace all parameters
    pub fn params(mut self, parameters: ToolParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Override the tool's timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Enable or disable output capture
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

#[derive(Debug, Default)]
struct CapturedStream {
    bytes: Vec<u8>,
    truncated: bool,
}

struct RunOutcome {
    return_code: i32,
    stdout: String,
    stderr: String,
    timed_out: bool,
    truncated: bool,
    duration_seconds: f64,
    output_file: Option<PathBuf>,
    hash_sha256: Option<String>,
}

/// Executes catalog tools and keeps a history of results
///
/// The executor performs no authorization: callers must check
/// `requires_approval` and `risk_level` before calling it.
///
/// # Example
///
/// ```no_run
/// use anptop_engine::tools::{ExecutionRequest, ExecutorConfig, ToolExecutor, ToolManager};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let manager = ToolManager::builtin()?;
///     let executor = ToolExecutor::new(manager, ExecutorConfig::with_evidence_root("/tmp/evidence"));
///
///     let result = executor
///         .execute(ExecutionRequest::new("nmap").param("target", "10.0.0.1"))
///         .await;
///     println!("{}", result.summary());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    manager: ToolManager,
    config: ExecutorConfig,
    history: Arc<ExecutionHistory>,
}

impl ToolExecutor {
    /// Create an executor with a default-sized history
    pub fn new(manager: ToolManager, config: ExecutorConfig) -> Self {
        Self::with_history(manager, config, Arc::new(ExecutionHistory::default()))
    }

    /// Create an executor appending to a shared history
    pub fn with_history(
        manager: ToolManager,
        config: ExecutorConfig,
        history: Arc<ExecutionHistory>,
    ) -> Self {
        Self {
            manager,
            config,
            history,
        }
    }

    /// Execute a tool
    ///
    /// # Arguments
    ///
    /// * `tool_name` - Catalog key (case-insensitive)
    /// * `parameters` - Placeholder values
    /// * `timeout` - Optional override of the tool's timeout in seconds; 0 disables it
    /// * `capture_output` - Whether to pipe stdout/stderr and write the artifact
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &ToolParameters,
        timeout: Option<u64>,
        capture_output: bool,
    ) -> ToolExecutionResult {
        let request = ExecutionRequest {
            tool_name: tool_name.to_string(),
            parameters: parameters.clone(),
            timeout_secs: timeout,
            capture_output,
        };
        self.execute(request).await
    }

    /// Execute a request
    pub async fn execute(&self, request: ExecutionRequest) -> ToolExecutionResult {
        self.execute_with_id(Uuid::new_v4(), request).await
    }

    /// Schedule an execution on the runtime
    ///
    /// Returns the execution id (which names the scratch directory) and a
    /// handle resolving to the result.
    pub fn spawn_execution(
        self: &Arc<Self>,
        request: ExecutionRequest,
    ) -> (Uuid, JoinHandle<ToolExecutionResult>) {
        let execution_id = Uuid::new_v4();
        let executor = Arc::clone(self);
        let handle =
            tokio::spawn(async move { executor.execute_with_id(execution_id, request).await });
        (execution_id, handle)
    }

    async fn execute_with_id(
        &self,
        execution_id: Uuid,
        request: ExecutionRequest,
    ) -> ToolExecutionResult {
        let result = self.run(execution_id, &request).await;
        self.history.record(result.clone());
        result
    }

    async fn run(&self, execution_id: Uuid, request: &ExecutionRequest) -> ToolExecutionResult {
        let tool_name = request.tool_name.as_str();

        let Some(tool) = self.manager.get_tool(tool_name) else {
            warn!(tool = tool_name, "Tool not found");
            return ToolExecutionResult {
                execution_id,
                ..ToolExecutionResult::rejected(
                    tool_name,
                    ExecutionErrorKind::ToolNotFound,
                    format!("Tool '{}' not found", tool_name),
                )
            };
        };

        let Some(PreparedCommand { command, plan }) = self.manager.plan_command(
            tool_name,
            &request.parameters,
            self.config.merge_default_parameters,
        ) else {
            warn!(tool = tool_name, "Tool has no command template");
            return ToolExecutionResult {
                execution_id,
                ..ToolExecutionResult::rejected(
                    tool_name,
                    ExecutionErrorKind::CommandUnbuildable,
                    format!("Cannot build command for tool '{}'", tool_name),
                )
            };
        };

        let timeout = ExecutionTimeout::resolve(
            request.timeout_secs,
            tool.timeout_seconds,
            self.config.daemon_timeout_cap_secs,
        );

        info!(
            tool = tool_name,
            %execution_id,
            risk_level = tool.risk_level,
            timeout_secs = timeout.duration().map(|d| d.as_secs()),
            "Executing tool"
        );
        debug!(tool = tool_name, shell = plan.uses_shell(), "Spawning: {}", plan);

        let started_at = Utc::now();
        let start = Instant::now();

        let outcome = self
            .run_plan(
                execution_id,
                tool_name,
                &plan,
                &command,
                timeout,
                request.capture_output,
                started_at,
                start,
            )
            .await;

        let result = match outcome {
            Ok(outcome) => {
                let status = ExecutionStatus::from_return_code(outcome.return_code);
                let error_kind = if outcome.timed_out {
                    Some(ExecutionErrorKind::ExecutionTimeout)
                } else if status == ExecutionStatus::Failed {
                    Some(ExecutionErrorKind::NonZeroExit)
                } else {
                    None
                };

                ToolExecutionResult {
                    execution_id,
                    tool_name: tool_name.to_string(),
                    command,
                    return_code: outcome.return_code,
                    stdout: outcome.stdout,
                    stderr: outcome.stderr,
                    duration_seconds: outcome.duration_seconds,
                    status,
                    error_kind,
                    timed_out: outcome.timed_out,
                    output_truncated: outcome.truncated,
                    output_file: outcome.output_file,
                    hash_sha256: outcome.hash_sha256,
                    timestamp: started_at,
                }
            }
            Err(e) => {
                error!(tool = tool_name, %execution_id, "Tool execution failed: {}", e);
                ToolExecutionResult {
                    execution_id,
                    tool_name: tool_name.to_string(),
                    command,
                    return_code: NO_RETURN_CODE,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    duration_seconds: start.elapsed().as_secs_f64(),
                    status: ExecutionStatus::Error,
                    error_kind: Some(ExecutionErrorKind::SpawnOrIo),
                    timed_out: false,
                    output_truncated: false,
                    output_file: None,
                    hash_sha256: None,
                    timestamp: started_at,
                }
            }
        };

        info!(
            tool = tool_name,
            %execution_id,
            status = %result.status,
            duration_secs = result.duration_seconds,
            return_code = result.return_code,
            "Tool completed"
        );
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_plan(
        &self,
        execution_id: Uuid,
        tool_name: &str,
        plan: &CommandPlan,
        command: &str,
        timeout: ExecutionTimeout,
        capture_output: bool,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> Result<RunOutcome, ExecutionError> {
        let scratch = self.config.evidence_root.join(execution_id.to_string());
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|source| ExecutionError::ScratchDir {
                path: scratch.clone(),
                source,
            })?;

        let (program, mut process) = build_process(plan)?;
        process.current_dir(&scratch);
        process.stdin(Stdio::null());
        process.kill_on_drop(true);
        if capture_output {
            process.stdout(Stdio::piped());
            process.stderr(Stdio::piped());
        } else {
            process.stdout(Stdio::null());
            process.stderr(Stdio::null());
        }
        #[cfg(unix)]
        process.process_group(0);

        let mut child = process
            .spawn()
            .map_err(|source| ExecutionError::Spawn { program, source })?;
        // Saved now: once the leader is reaped `child.id()` is gone
        let pgid = child.id();

        let limit = self.config.max_output_bytes;
        let stdout_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(read_capped(s, limit)));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(read_capped(s, limit)));
        let readers: Vec<_> = stdout_task
            .iter()
            .chain(stderr_task.iter())
            .map(|t| t.abort_handle())
            .collect();

        let completion = async {
            let status = child.wait().await.map_err(ExecutionError::Wait)?;
            // Background children would otherwise keep the pipes open
            if kill_process_group(pgid) {
                debug!(tool = tool_name, "Killed processes left behind by the command");
            }
            let stdout = join_capture(stdout_task).await?;
            let stderr = join_capture(stderr_task).await?;
            Ok::<_, ExecutionError>((status, stdout, stderr))
        };

        let (return_code, stdout, stderr, timed_out, truncated) = match timeout.run(completion).await
        {
            Ok(finished) => {
                let (status, stdout, stderr) = finished?;
                (
                    exit_code(status),
                    String::from_utf8_lossy(&stdout.bytes).into_owned(),
                    String::from_utf8_lossy(&stderr.bytes).into_owned(),
                    false,
                    stdout.truncated || stderr.truncated,
                )
            }
            Err(_) => {
                warn!(
                    tool = tool_name,
                    timeout_secs = timeout.duration().map(|d| d.as_secs()),
                    "Tool timed out, killing process"
                );
                for reader in readers {
                    reader.abort();
                }
                terminate(&mut child, pgid).await;
                (
                    NO_RETURN_CODE,
                    TIMEOUT_STDOUT.to_string(),
                    TIMEOUT_STDERR.to_string(),
                    true,
                    false,
                )
            }
        };
        let duration_seconds = start.elapsed().as_secs_f64();

        let mut output_file = None;
        let mut hash_sha256 = None;
        if capture_output && (!stdout.is_empty() || !stderr.is_empty()) {
            let content = render_artifact(
                command,
                return_code,
                duration_seconds,
                started_at,
                &stdout,
                &stderr,
            );
            let path = scratch.join(artifact_file_name(tool_name));
            tokio::fs::write(&path, content.as_bytes())
                .await
                .map_err(|source| ExecutionError::Artifact {
                    path: path.clone(),
                    source,
                })?;
            hash_sha256 = Some(sha256_hex(content.as_bytes()));
            output_file = Some(path);
        }

        Ok(RunOutcome {
            return_code,
            stdout,
            stderr,
            timed_out,
            truncated,
            duration_seconds,
            output_file,
            hash_sha256,
        })
    }

    /// Look up a tool
    pub fn get_tool(&self, tool_name: &str) -> Option<&SecurityTool> {
        self.manager.get_tool(tool_name)
    }

    /// Catalog summary
    pub fn tools_summary(&self) -> ToolSummary {
        self.manager.get_tool_summary()
    }

    /// Listing rows for every tool
    pub fn list_available_tools(&self) -> Vec<ToolInfo> {
        self.manager.list_tool_infos()
    }

    /// Tools with risk level 4 or higher
    pub fn high_risk_tools(&self) -> BTreeMap<String, &SecurityTool> {
        self.manager.get_high_risk_tools()
    }

    /// Tools that need sign-off before running
    pub fn approval_required_tools(&self) -> BTreeMap<String, &SecurityTool> {
        self.manager.get_approval_required_tools()
    }

    /// The tool manager
    pub fn manager(&self) -> &ToolManager {
        &self.manager
    }

    /// The executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// The execution history
    pub fn history(&self) -> &Arc<ExecutionHistory> {
        &self.history
    }
}

fn build_process(plan: &CommandPlan) -> Result<(String, Command), ExecutionError> {
    match plan {
        CommandPlan::Argv(argv) => {
            let (program, args) = argv.split_first().ok_or(ExecutionError::EmptyCommand)?;
            let mut process = Command::new(program);
            process.args(args);
            Ok((program.clone(), process))
        }
        CommandPlan::Shell(script) => {
            let (shell, flag) = shell_invocation();
            let mut process = Command::new(shell);
            process.arg(flag).arg(script);
            Ok((shell.to_string(), process))
        }
    }
}

#[cfg(unix)]
fn shell_invocation() -> (&'static str, &'static str) {
    ("sh", "-c")
}

#[cfg(not(unix))]
fn shell_invocation() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

/// Read a stream to EOF, keeping at most `limit` bytes
///
/// Bytes past the limit are read and discarded so the child never blocks on
/// a full pipe.
async fn read_capped<R>(mut reader: R, limit: usize) -> std::io::Result<CapturedStream>
where
    R: AsyncRead + Unpin,
{
    let mut captured = CapturedStream::default();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(captured.bytes.len());
        if room > 0 {
            captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
        }
        if n > room {
            captured.truncated = true;
        }
    }
    Ok(captured)
}

async fn join_capture(
    task: Option<JoinHandle<std::io::Result<CapturedStream>>>,
) -> Result<CapturedStream, ExecutionError> {
    match task {
        None => Ok(CapturedStream::default()),
        Some(task) => task
            .await
            .map_err(|e| ExecutionError::Capture(e.to_string()))?
            .map_err(|e| ExecutionError::Capture(e.to_string())),
    }
}

/// SIGKILL whatever is left in the run's process group
///
/// Returns whether any process was signalled. The child leads its own group,
/// so the group id is its pid and reaches shell children even after the
/// leader is reaped.
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid else {
        return false;
    };
    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(e) => {
            debug!(pgid, "Failed to kill process group: {}", e);
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) -> bool {
    false
}

async fn terminate(child: &mut Child, pgid: Option<u32>) {
    kill_process_group(pgid);

    if let Err(e) = child.kill().await {
        debug!("Failed to kill timed out process: {}", e);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    NO_RETURN_CODE
}

/// Artifact file name for a tool key
fn artifact_file_name(tool_name: &str) -> String {
    let stem: String = tool_name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_output.txt", stem)
}

/// Render the evidence artifact for one run
fn render_artifact(
    command: &str,
    return_code: i32,
    duration_seconds: f64,
    started_at: DateTime<Utc>,
    stdout: &str,
    stderr: &str,
) -> String {
    format!(
        "# Command: {}\n# Return Code: {}\n# Duration: {:.2}s\n# Timestamp: {}\n# STDOUT:\n{}\n# STDERR:\n{}\n",
        command,
        return_code,
        duration_seconds,
        started_at.to_rfc3339(),
        stdout,
        stderr
    )
}

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Recompute the hash of an artifact on disk
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(sha256_hex(&bytes))
}
