//! External tool execution
//!
//! Runs `cargo`, `podman`/`docker` and `git` as child processes and turns
//! their stderr into the publish error taxonomy.

use shipwright_core::PublishError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stderr, or stdout when stderr is empty, trimmed
    pub fn diagnostic(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        text.trim().to_string()
    }
}

/// Runs a command to completion and captures its output
pub async fn run(command: &mut Command, what: &str) -> Result<ToolOutput, PublishError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = command
        .output()
        .await
        .map_err(|e| PublishError::Tool(format!("failed to execute {}: {}", what, e)))?;

    Ok(capture(what, output))
}

/// Runs a command, feeding `input` on stdin
///
/// Used to hand secrets to tools (`login --password-stdin`) without putting
/// them on the command line.
pub async fn run_with_stdin(
    command: &mut Command,
    what: &str,
    input: &str,
) -> Result<ToolOutput, PublishError> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| PublishError::Tool(format!("failed to execute {}: {}", what, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| PublishError::Tool(format!("failed to write stdin of {}: {}", what, e)))?;
        // dropping stdin closes the pipe so the tool stops reading
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| PublishError::Tool(format!("failed to wait for {}: {}", what, e)))?;

    Ok(capture(what, output))
}

fn capture(what: &str, output: std::process::Output) -> ToolOutput {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", what, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", what, stderr.trim());
    }

    ToolOutput {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout,
        stderr,
    }
}

const CREDENTIAL_MARKERS: &[&str] = &[
    "unauthorized",
    "authentication required",
    "authentication failed",
    "access denied",
    "denied: ",
    "forbidden",
    "invalid token",
    "invalid credentials",
    "status 401",
    "status 403",
    "401 unauthorized",
    "403 forbidden",
];

const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "connection reset",
    "connection refused",
    "temporary failure",
    "network is unreachable",
    "tls handshake",
    "unexpected eof",
    "spurious network error",
    "too many requests",
    "rate limit",
    "status 502",
    "status 503",
    "status 504",
    "502 bad gateway",
    "503 service unavailable",
    "504 gateway timeout",
];

/// Maps the diagnostic of a failed registry interaction to an error kind
///
/// Credential markers win over transient ones: an auth failure behind a
/// flaky proxy is still an auth failure. HTTP status codes only count next to
/// `status` or their reason phrase, so rustc error codes such as `E0502` in a
/// verification build never match.
pub fn classify_registry_failure(diagnostic: &str) -> PublishError {
    let lower = diagnostic.to_ascii_lowercase();

    if CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        PublishError::Credential(diagnostic.to_string())
    } else if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        PublishError::TransientNetwork(diagnostic.to_string())
    } else {
        PublishError::Rejected(diagnostic.to_string())
    }
}
