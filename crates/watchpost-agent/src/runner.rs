// ============================================
// File: crates/watchpost-agent/src/runner.rs
// ============================================
//! # Command Runner
//!
//! ## Creation Reason
//! Executes a service's command and captures its standard output. The
//! trait lets schedulers be tested without spawning processes.
//!
//! ## Main Functionality
//! - `CommandRunner`: async trait, one call per service cycle
//! - `ProcessRunner`: `tokio::process::Command` implementation
//!
//! ## ⚠️ Important Note for Next Developer
//! - Standard input is closed; commands must not wait for input
//! - A non-zero exit status is a failure even if stdout has data
//!
//! ## Last Modified
//! v0.1.0 - Initial runner implementation

use std::process::Stdio;

use async_trait::async_trait;
use tracing::trace;

use crate::error::CommandError;

/// Maximum characters of stderr kept in a failure.
const STDERR_EXCERPT_CHARS: usize = 200;

// ============================================
// CommandRunner Trait
// ============================================

/// Runs one service command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `exec` with `args` and returns its standard output.
    ///
    /// # Errors
    /// `CommandError` if the process cannot start or exits unsuccessfully.
    async fn run(&self, exec: &str, args: &[String]) -> Result<Vec<u8>, CommandError>;
}

// ============================================
// ProcessRunner
// ============================================

/// Runs commands as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, exec: &str, args: &[String]) -> Result<Vec<u8>, CommandError> {
        let output = tokio::process::Command::new(exec)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                exec: exec.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CommandError::failed(
                exec,
                output.status.to_string(),
                stderr_excerpt(&output.stderr),
            ));
        }

        trace!(exec, bytes = output.stdout.len(), "Command finished");
        Ok(output.stdout)
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

// ============================================
// MockRunner
// ============================================

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;

    /// Scripted runner: plays back outcomes in order, then repeats the
    /// last one.
    pub(crate) struct MockRunner {
        outcomes: Mutex<VecDeque<Result<Vec<u8>, String>>>,
        calls: Mutex<usize>,
        /// `(started, release)` when calls block until released.
        hold: Option<(Notify, Notify)>,
    }

    impl MockRunner {
        pub(crate) fn scripted(outcomes: Vec<Result<Vec<u8>, String>>) -> Self {
            assert!(!outcomes.is_empty(), "MockRunner needs at least one outcome");
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
                hold: None,
            }
        }

        /// Succeeds with `output`, but each call waits for [`Self::release`].
        pub(crate) fn held(output: &[u8]) -> Self {
            Self {
                hold: Some((Notify::new(), Notify::new())),
                ..Self::always_ok(output)
            }
        }

        /// Resolves once a held call has started.
        pub(crate) async fn wait_started(&self) {
            if let Some((started, _)) = &self.hold {
                started.notified().await;
            }
        }

        /// Lets one held call finish.
        pub(crate) fn release(&self) {
            if let Some((_, release)) = &self.hold {
                release.notify_one();
            }
        }

        pub(crate) fn always_ok(output: &[u8]) -> Self {
            Self::scripted(vec![Ok(output.to_vec())])
        }

        pub(crate) fn always_fail() -> Self {
            Self::scripted(vec![Err("mock failure".into())])
        }

        pub(crate) fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, exec: &str, _args: &[String]) -> Result<Vec<u8>, CommandError> {
            *self.calls.lock() += 1;
            if let Some((started, release)) = &self.hold {
                started.notify_one();
                release.notified().await;
            }
            let outcome = {
                let mut outcomes = self.outcomes.lock();
                if outcomes.len() > 1 {
                    outcomes.pop_front()
                } else {
                    outcomes.front().cloned()
                }
            };
            match outcome {
                Some(Ok(output)) => Ok(output),
                Some(Err(stderr)) => Err(CommandError::failed(exec, "exit status: 1", stderr)),
                None => unreachable!("outcomes never empty"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_excerpt_truncates() {
        let long = "e".repeat(500);
        let excerpt = stderr_excerpt(long.as_bytes());
        assert_eq!(excerpt.len(), STDERR_EXCERPT_CHARS + 3);
        assert!(excerpt.ends_with("..."));

        assert_eq!(stderr_excerpt(b"  short\n"), "short");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_stdout() {
        let runner = ProcessRunner::new();
        let output = runner
            .run("echo", &["cpu".to_string(), "ok".to_string()])
            .await
            .unwrap();
        assert_eq!(output, b"cpu ok\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_non_zero_exit() {
        let runner = ProcessRunner::new();
        let args = vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()];
        let err = runner.run("sh", &args).await.unwrap_err();
        match err {
            CommandError::Failed { stderr, status, .. } => {
                assert_eq!(stderr, "broken");
                assert!(status.contains('3'));
            }
            CommandError::Spawn { .. } => panic!("expected exit failure"),
        }
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let runner = ProcessRunner::new();
        let err = runner
            .run("/nonexistent/watchpost-test-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_mock_runner_script() {
        let runner = mock::MockRunner::scripted(vec![Ok(b"a".to_vec()), Err("bad".into())]);
        assert_eq!(runner.run("x", &[]).await.unwrap(), b"a");
        assert!(runner.run("x", &[]).await.is_err());
        assert!(runner.run("x", &[]).await.is_err());
        assert_eq!(runner.calls(), 3);
    }
}
