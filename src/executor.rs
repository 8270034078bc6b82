// src/executor.rs
//! Bounded-attempt wrapper around one external side-effecting command.
//!
//! `Idle -> Attempting -> {Success | Retryable -> Attempting | Fatal}`.
//! Flat delay between attempts (no backoff). The delay is a
//! `tokio::time::sleep`, so it only suspends the calling task.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Program + arguments + extra environment for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn env(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.envs.push((k.into(), v.into()));
        self
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// Why one attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecFailure {
    #[error("executable not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("exited with status {code:?}")]
    NonZeroExit { code: Option<i32> },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("spawn failed: {0}")]
    Spawn(String),
}

impl ExecFailure {
    /// Retrying cannot fix a missing or unrunnable executable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PermissionDenied(_))
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<(), ExecFailure>;
}

/// Runs the command as a child process; the child is killed if the timeout fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<(), ExecFailure> {
        let mut command = tokio::process::Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(cmd.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => return Err(ExecFailure::Timeout(timeout)),
            Ok(Err(e)) => {
                return Err(match e.kind() {
                    io::ErrorKind::NotFound => ExecFailure::NotFound(cmd.program.clone()),
                    io::ErrorKind::PermissionDenied => {
                        ExecFailure::PermissionDenied(cmd.program.clone())
                    }
                    _ => ExecFailure::Spawn(e.to_string()),
                })
            }
            Ok(Ok(out)) => out,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.success() {
            if !stdout.trim().is_empty() {
                debug!(stdout = %stdout.trim(), "command output");
            }
            Ok(())
        } else {
            if !stderr.trim().is_empty() {
                warn!(stderr = %stderr.trim(), "command stderr");
            }
            Err(ExecFailure::NonZeroExit {
                code: output.status.code(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 20,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// What the caller gets back. `success` is the contract; the rest is diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub success: bool,
    pub attempts: u32,
    pub last_failure: Option<ExecFailure>,
}

impl ExecutionReport {
    pub fn fatal(&self) -> bool {
        self.last_failure.as_ref().is_some_and(ExecFailure::is_fatal)
    }
}

pub struct RetryingExecutor<R: CommandRunner = ProcessRunner> {
    runner: R,
    max_attempts: u32,
    delay: Duration,
}

impl RetryingExecutor<ProcessRunner> {
    pub fn from_policy(policy: &RetryPolicy) -> Self {
        Self::new(ProcessRunner, policy.max_attempts, policy.delay())
    }
}

impl<R: CommandRunner> RetryingExecutor<R> {
    pub fn new(runner: R, max_attempts: u32, delay: Duration) -> Self {
        Self {
            runner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn execute(&self, cmd: &CommandSpec, timeout: Duration) -> ExecutionReport {
        let mut attempts = 0u32;
        let mut last_failure = None;

        while attempts < self.max_attempts {
            attempts += 1;
            counter!("digest_exec_attempts_total").increment(1);
            info!(attempt = attempts, max = self.max_attempts, command = %cmd, "executing");

            match self.runner.run(cmd, timeout).await {
                Ok(()) => {
                    info!(attempt = attempts, command = %cmd, "command succeeded");
                    return ExecutionReport {
                        success: true,
                        attempts,
                        last_failure: None,
                    };
                }
                Err(f) if f.is_fatal() => {
                    error!(command = %cmd, failure = %f, "fatal failure, not retrying");
                    return ExecutionReport {
                        success: false,
                        attempts,
                        last_failure: Some(f),
                    };
                }
                Err(f) => {
                    warn!(attempt = attempts, command = %cmd, failure = %f, "attempt failed");
                    last_failure = Some(f);
                    if attempts < self.max_attempts && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        error!(attempts, command = %cmd, "attempt budget exhausted");
        ExecutionReport {
            success: false,
            attempts,
            last_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_args() {
        let c = CommandSpec::new("wrangler").arg("pages").arg("deploy");
        assert_eq!(c.to_string(), "wrangler pages deploy");
    }

    #[test]
    fn only_missing_or_denied_is_fatal() {
        assert!(ExecFailure::NotFound("x".into()).is_fatal());
        assert!(ExecFailure::PermissionDenied("x".into()).is_fatal());
        assert!(!ExecFailure::NonZeroExit { code: Some(1) }.is_fatal());
        assert!(!ExecFailure::Timeout(Duration::from_secs(1)).is_fatal());
    }
}
