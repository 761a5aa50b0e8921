//! Folder mirroring to S3 via the `aws` command-line client.

use crate::error::StageError;
use crate::stage::FolderSync;
use std::path::Path;
use std::process::{Command, Stdio};

/// Remote URL for a run's artifact directory.
pub fn artifact_remote_url(bucket: &str, timestamp: &str) -> String {
    format!("s3://{bucket}/artifact/{timestamp}")
}

/// Remote URL for a run's published model directory.
pub fn model_remote_url(bucket: &str, timestamp: &str) -> String {
    format!("s3://{bucket}/final_model/{timestamp}")
}

/// Shells out to `aws s3 sync <local> <remote>`.
#[derive(Debug, Clone)]
pub struct AwsCliSync {
    program: String,
}

impl AwsCliSync {
    pub fn new() -> Self {
        Self::with_program("aws")
    }

    /// Use a different executable (a wrapper script, or a stub in tests).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for AwsCliSync {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderSync for AwsCliSync {
    fn sync_folder_to_s3(&self, local_folder: &Path, remote_url: &str) -> Result<(), StageError> {
        let failure = |reason: String| StageError::Sync {
            local: local_folder.to_path_buf(),
            remote: remote_url.to_string(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(["s3", "sync"])
            .arg(local_folder)
            .arg(remote_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| failure(format!("failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
