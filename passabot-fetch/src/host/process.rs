//! Driver process discovery and lifetime.
//!
//! passabot talks to the browser through a WebDriver server. When no
//! external server is configured, [`DriverProcess`] starts one locally and
//! keeps it alive for as long as the handle exists.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::ProcessError;

/// Interval between readiness probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Process Runner
// ============================================================================

/// Locates executables on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Check if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Find the path to a command.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Driver Process
// ============================================================================

/// A locally spawned WebDriver server.
///
/// The child is killed when the handle is dropped.
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    /// Spawns `binary --port=<port>` and waits until it accepts connections.
    #[instrument(skip(ready_timeout), fields(binary = %binary, port = port))]
    pub async fn spawn(
        binary: &str,
        port: u16,
        ready_timeout: Duration,
    ) -> Result<Self, ProcessError> {
        let path = ProcessRunner::new().which(binary).ok_or_else(|| {
            warn!(binary = %binary, "Driver binary not found");
            ProcessError::NotFound(binary.to_string())
        })?;

        debug!(path = %path.display(), "Starting driver");
        let mut child = Command::new(&path)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let deadline = Instant::now() + ready_timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Err(ProcessError::ExitedEarly(status.code()));
            }
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(ProcessError::Timeout(ready_timeout));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        info!(port = port, "Driver ready");
        Ok(Self { child, port })
    }

    /// Base URL of the WebDriver server.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Kills the driver and waits for it to exit.
    pub async fn shutdown(mut self) -> Result<(), ProcessError> {
        self.child.kill().await?;
        debug!(port = self.port, "Driver stopped");
        Ok(())
    }
}
