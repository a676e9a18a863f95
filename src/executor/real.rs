//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which executes commands
//! using `std::process::Command`, capturing stdout and streaming stderr
//! to the log.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use which::which;

use super::pipe::{panic_message, read_pipe_to_log, read_pipe_to_string};
use super::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::RsmachineError;

/// Kills a child process, waits for it, and joins the given reader threads.
///
/// Called from error paths in [`RealCommandExecutor::execute()`] so a failed
/// spawn of a reader thread or a failed wait never leaks the process.
fn cleanup_child_process<T, I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = JoinHandle<T>>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("reader thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

/// Command executor that runs actual local commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let cmd = which(&spec.command).map_err(|_| RsmachineError::CommandNotFound {
            command: spec.command.clone(),
        })?;
        tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());

        let mut command = Command::new(cmd);
        command.args(&spec.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn command `{}`", spec.display()))?;

        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_handle = match thread::Builder::new()
            .name("stdout-reader".to_string())
            .spawn(move || read_pipe_to_string(stdout_pipe))
        {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process::<String, _>(&mut child, []);
                return Err(RsmachineError::Execution {
                    command: spec.display(),
                    status: format!("failed to spawn stdout reader thread: {}", e),
                }
                .into());
            }
        };

        let stderr_handle = match thread::Builder::new()
            .name("stderr-reader".to_string())
            .spawn(move || read_pipe_to_log(stderr_pipe))
        {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle]);
                return Err(RsmachineError::Execution {
                    command: spec.display(),
                    status: format!("failed to spawn stderr reader thread: {}", e),
                }
                .into());
            }
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                cleanup_child_process::<(), _>(&mut child, [stderr_handle]);
                if let Err(panic) = stdout_handle.join() {
                    tracing::warn!("stdout reader panicked during cleanup: {}", panic_message(&*panic));
                }
                return Err(RsmachineError::Execution {
                    command: spec.display(),
                    status: format!("failed to wait for command: {}", e),
                }
                .into());
            }
        };

        let mut panicked_streams = Vec::new();
        let stdout = match stdout_handle.join() {
            Ok(captured) => captured,
            Err(e) => {
                let msg = panic_message(&*e).to_string();
                tracing::error!(stream = "stdout", panic = %msg, "reader thread panicked");
                panicked_streams.push(format!("stdout: {}", msg));
                String::new()
            }
        };
        if let Err(e) = stderr_handle.join() {
            let msg = panic_message(&*e).to_string();
            tracing::error!(stream = "stderr", panic = %msg, "reader thread panicked");
            panicked_streams.push(format!("stderr: {}", msg));
        }

        if !panicked_streams.is_empty() {
            return Err(RsmachineError::Execution {
                command: spec.display(),
                status: format!(
                    "reader thread(s) panicked during command execution: {}",
                    panicked_streams.join(", ")
                ),
            }
            .into());
        }

        tracing::trace!("executed command: {}: success={}", spec.command, status.success());

        Ok(ExecutionResult {
            status: Some(status),
            stdout,
        })
    }
}
