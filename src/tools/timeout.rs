//! Execution Timeout Management
//!
//! Resolves the deadline for one tool run and applies it to a future.

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, error::Elapsed};

/// Deadline for a single execution
///
/// `None` means the run is not bounded. Granularity is whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionTimeout {
    duration: Option<Duration>,
}

impl Default for ExecutionTimeout {
    fn default() -> Self {
        Self::from_secs(300)
    }
}

impl ExecutionTimeout {
    /// Create a bounded timeout
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
        }
    }

    /// A timeout that never fires
    pub fn unbounded() -> Self {
        Self { duration: None }
    }

    /// Create a timeout from seconds; 0 means unbounded
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Self::unbounded()
        } else {
            Self::new(Duration::from_secs(secs))
        }
    }

    /// Pick the effective timeout for a run
    ///
    /// # Arguments
    ///
    /// * `override_secs` - Caller-supplied timeout, takes precedence
    /// * `tool_secs` - The tool's configured `timeout_seconds`
    /// * `daemon_cap_secs` - When non-zero, replaces "no timeout" with this bound
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use anptop_engine::tools::ExecutionTimeout;
    ///
    /// assert_eq!(ExecutionTimeout::resolve(Some(5), 600, 0).duration(), Some(Duration::from_secs(5)));
    /// assert_eq!(ExecutionTimeout::resolve(None, 0, 0).duration(), None);
    /// assert_eq!(ExecutionTimeout::resolve(None, 0, 3600).duration(), Some(Duration::from_secs(3600)));
    /// ```
    pub fn resolve(override_secs: Option<u64>, tool_secs: u64, daemon_cap_secs: u64) -> Self {
        let secs = override_secs.unwrap_or(tool_secs);
        if secs == 0 {
            Self::from_secs(daemon_cap_secs)
        } else {
            Self::from_secs(secs)
        }
    }

    /// The timeout duration, if bounded
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Whether the timeout will never fire
    pub fn is_unbounded(&self) -> bool {
        self.duration.is_none()
    }

    /// Run a future under this timeout
    ///
    /// Returns `Err(Elapsed)` if the deadline passes first; the future is
    /// dropped at that point.
    pub async fn run<F, T>(&self, future: F) -> Result<T, Elapsed>
    where
        F: Future<Output = T>,
    {
        match self.duration {
            Some(duration) => time::timeout(duration, future).await,
            None => Ok(future.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_default() {
        let timeout = ExecutionTimeout::default();
        assert_eq!(timeout.duration(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_timeout_from_secs_zero_is_unbounded() {
        assert!(ExecutionTimeout::from_secs(0).is_unbounded());
        assert_eq!(
            ExecutionTimeout::from_secs(45).duration(),
            Some(Duration::from_secs(45))
        );
    }

    #[test]
    fn test_resolve_prefers_override() {
        let timeout = ExecutionTimeout::resolve(Some(10), 600, 0);
        assert_eq!(timeout.duration(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_resolve_falls_back_to_tool() {
        let timeout = ExecutionTimeout::resolve(None, 600, 0);
        assert_eq!(timeout.duration(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_resolve_zero_override_disables_timeout() {
        let timeout = ExecutionTimeout::resolve(Some(0), 600, 0);
        assert!(timeout.is_unbounded());
    }

    #[test]
    fn test_resolve_daemon_cap() {
        let capped = ExecutionTimeout::resolve(None, 0, 120);
        assert_eq!(capped.duration(), Some(Duration::from_secs(120)));

        // The cap only applies to unbounded runs
        let bounded = ExecutionTimeout::resolve(None, 600, 120);
        assert_eq!(bounded.duration(), Some(Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn test_timeout_run_success() {
        let timeout = ExecutionTimeout::from_secs(10);
        let result = timeout.run(async { "test value" }).await;
        assert_eq!(result.unwrap(), "test value");
    }

    #[tokio::test]
    async fn test_timeout_run_timeout() {
        let timeout = ExecutionTimeout::from_secs(1);

        let result = timeout
            .run(async {
                tokio::time::sleep(Duration::from_secs(2)).await;
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_timeout_run_unbounded() {
        let timeout = ExecutionTimeout::unbounded();

        let result = timeout
            .run(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                7
            })
            .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_timeout_run_just_in_time() {
        let timeout = ExecutionTimeout::from_secs(1);

        let result = timeout
            .run(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
            })
            .await;

        assert!(result.is_ok());
    }
}
