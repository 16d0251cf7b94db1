//! Execution History
//!
//! Bounded, thread-safe append log of execution results. Records are
//! immutable once appended; when the log is full the oldest record is
//! evicted. Ordering is completion order.

use super::executor::{ExecutionStatus, ToolExecutionResult};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Default number of results kept in memory
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Result counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub success: usize,
    pub failed: usize,
    pub error: usize,
}

#[derive(Debug)]
struct HistoryInner {
    records: VecDeque<ToolExecutionResult>,
    evicted: u64,
}

/// Ring buffer of recent execution results
#[derive(Debug)]
pub struct ExecutionHistory {
    capacity: usize,
    inner: Mutex<HistoryInner>,
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ExecutionHistory {
    /// Create a history that keeps at most `capacity` results (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(HistoryInner {
                records: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
                evicted: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        // A panic while holding the lock cannot leave a half-written record
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a result, evicting the oldest when full
    pub fn record(&self, result: ToolExecutionResult) {
        let mut inner = self.lock();
        if inner.records.len() == self.capacity {
            inner.records.pop_front();
            inner.evicted += 1;
        }
        inner.records.push_back(result);
    }

    /// Most recent results, newest first
    pub fn recent(&self, limit: Option<usize>) -> Vec<ToolExecutionResult> {
        let inner = self.lock();
        let take = limit.unwrap_or(inner.records.len());
        inner.records.iter().rev().take(take).cloned().collect()
    }

    /// All retained results in completion order
    pub fn snapshot(&self) -> Vec<ToolExecutionResult> {
        self.lock().records.iter().cloned().collect()
    }

    /// Find a retained result by execution id
    pub fn find(&self, execution_id: Uuid) -> Option<ToolExecutionResult> {
        self.lock()
            .records
            .iter()
            .find(|r| r.execution_id == execution_id)
            .cloned()
    }

    /// Number of retained results
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether nothing has been retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained results
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many results have been dropped to make room
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }

    /// Count retained results by status
    pub fn count_by_status(&self) -> StatusCounts {
        let inner = self.lock();
        let mut counts = StatusCounts::default();
        for record in &inner.records {
            match record.status {
                ExecutionStatus::Success => counts.success += 1,
                ExecutionStatus::Failed => counts.failed += 1,
                ExecutionStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Export retained results as pretty JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        let records = self.snapshot();
        serde_json::to_string_pretty(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::executor::ExecutionErrorKind;

    fn result(name: &str, status: ExecutionStatus) -> ToolExecutionResult {
        let mut r = ToolExecutionResult::rejected(
            name,
            ExecutionErrorKind::ToolNotFound,
            format!("Tool '{}' not found", name),
        );
        r.status = status;
        r
    }

    #[test]
    fn test_empty_history() {
        let history = ExecutionHistory::new(10);
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 10);
        assert!(history.recent(None).is_empty());
    }

    #[test]
    fn test_record_and_recent_order() {
        let history = ExecutionHistory::new(10);
        history.record(result("a", ExecutionStatus::Success));
        history.record(result("b", ExecutionStatus::Failed));
        history.record(result("c", ExecutionStatus::Error));

        let recent: Vec<_> = history.recent(Some(2)).into_iter().map(|r| r.tool_name).collect();
        assert_eq!(recent, vec!["c", "b"]);

        let all: Vec<_> = history.snapshot().into_iter().map(|r| r.tool_name).collect();
        assert_eq!(all, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let history = ExecutionHistory::new(2);
        history.record(result("a", ExecutionStatus::Success));
        history.record(result("b", ExecutionStatus::Success));
        history.record(result("c", ExecutionStatus::Success));

        assert_eq!(history.len(), 2);
        assert_eq!(history.evicted(), 1);
        let all: Vec<_> = history.snapshot().into_iter().map(|r| r.tool_name).collect();
        assert_eq!(all, vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let history = ExecutionHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.record(result("a", ExecutionStatus::Success));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_count_by_status() {
        let history = ExecutionHistory::new(10);
        history.record(result("a", ExecutionStatus::Success));
        history.record(result("b", ExecutionStatus::Failed));
        history.record(result("c", ExecutionStatus::Failed));
        history.record(result("d", ExecutionStatus::Error));

        assert_eq!(
            history.count_by_status(),
            StatusCounts {
                success: 1,
                failed: 2,
                error: 1
            }
        );
    }

    #[test]
    fn test_find_by_execution_id() {
        let history = ExecutionHistory::new(10);
        let r = result("a", ExecutionStatus::Success);
        let id = r.execution_id;
        history.record(r);
        history.record(result("b", ExecutionStatus::Success));

        assert_eq!(history.find(id).unwrap().tool_name, "a");
        assert!(history.find(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_export_json() {
        let history = ExecutionHistory::new(10);
        history.record(result("a", ExecutionStatus::Failed));

        let json = history.export_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["tool_name"], "a");
        assert_eq!(parsed[0]["status"], "failed");
    }

    #[test]
    fn test_concurrent_records() {
        let history = std::sync::Arc::new(ExecutionHistory::new(100));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let history = history.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        history.record(result(&format!("t{}", i), ExecutionStatus::Success));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.len(), 80);
    }
}
