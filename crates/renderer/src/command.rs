//! Drawer that delegates to an external plotting program.
//!
//! The program receives one JSON job on stdin:
//!
//! ```json
//! {"dataset_path": "/data/plt00100", "dataset_name": "plt00100", "params": {...}}
//! ```
//!
//! and must write the finished PNG to stdout and exit 0.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use viz_common::{Artifact, DatasetHandle, DrawError, Drawer, PlotParameters};

/// Longest stderr excerpt carried in a backend error.
const STDERR_EXCERPT: usize = 2048;

#[derive(Debug, Serialize)]
struct DrawJob<'a> {
    dataset_path: &'a Path,
    dataset_name: &'a str,
    params: &'a PlotParameters,
}

/// Runs `program args...` once per draw.
#[derive(Debug, Clone)]
pub struct CommandDrawer {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandDrawer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, job: Vec<u8>) -> Result<Vec<u8>, DrawError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DrawError::Backend(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that exits without reading its job is judged by its
            // exit status, not by the broken pipe.
            if let Err(e) = stdin.write_all(&job).await {
                debug!(error = %e, "Draw command closed stdin early");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DrawError::Backend(format!("draw command failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(DrawError::Backend(if excerpt.is_empty() {
                format!("draw command exited with {}", output.status)
            } else {
                excerpt
            }));
        }
        if output.stdout.is_empty() {
            return Err(DrawError::Backend("draw command produced no output".to_string()));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Drawer for CommandDrawer {
    async fn draw(&self, dataset: &DatasetHandle, params: &PlotParameters) -> Result<Artifact, DrawError> {
        let start = Instant::now();
        let job = serde_json::to_vec(&DrawJob {
            dataset_path: dataset.path(),
            dataset_name: dataset.name(),
            params,
        })
        .map_err(|e| DrawError::Backend(format!("failed to encode draw job: {}", e)))?;

        // Dropping the run future kills the child.
        let png = match tokio::time::timeout(self.timeout, self.run(job)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    program = %self.program.display(),
                    dataset = %dataset.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Draw command timed out"
                );
                return Err(DrawError::Timeout(self.timeout));
            }
        };

        debug!(
            program = %self.program.display(),
            dataset = %dataset.name(),
            field = %params.field,
            bytes = png.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Draw command finished"
        );
        Ok(Artifact::png(png))
    }
}
