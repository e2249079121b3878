// src/process.rs

//! External tool invocation
//!
//! All external collaborators (virtualenv, pip, fpm) run through
//! [`run_tool`]: synchronous, stdin nullified to prevent hangs, output
//! captured and surfaced verbatim for diagnostics. A timeout is optional;
//! by default a hang in the underlying tool hangs the pipeline, which is
//! the caller's signal to investigate rather than something to paper over
//! with retries.

use crate::error::{Error, Result};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Captured result of one external tool run
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit code; -1 if the process was terminated by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout and stderr concatenated, for error reporting
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Run an external tool to completion and capture its output
///
/// Non-zero exit is not an error here; callers map it onto their own
/// stage failure variant so the taxonomy stays per-stage.
pub fn run_tool(program: &str, args: &[String], timeout: Option<Duration>) -> Result<ToolOutput> {
    debug!("running: {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null()) // prevent stdin hangs
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::ToolSpawn {
            tool: program.to_string(),
            source: e,
        })?;

    if let Some(timeout) = timeout {
        match child.wait_timeout(timeout)? {
            Some(_) => {}
            None => {
                child.kill().ok();
                child.wait().ok();
                return Err(Error::ToolTimeout {
                    tool: program.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
        }
    }

    let output = child.wait_with_output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    for line in stdout.lines() {
        debug!("[{}] {}", program, line);
    }
    for line in stderr.lines() {
        warn!("[{}] {}", program, line);
    }

    Ok(ToolOutput {
        code: output.status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}
