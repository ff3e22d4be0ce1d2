//! Seam between the lifecycle logic and the operating system
//!
//! The core never spawns processes itself; it goes through a [`ProcessRunner`]
//! so the binary can plug in a real implementation and tests a scripted one.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Captured output of an external command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunOutput {
    pub fn from_stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Standard output followed by standard error
    pub fn combined(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        out.extend_from_slice(&self.stdout);
        out.extend_from_slice(&self.stderr);
        out
    }

    /// Combined output as lossy UTF-8, trimmed for logging
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.combined()).trim().to_string()
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {}", ExitCode(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        output: RunOutput,
    },
}

impl RunError {
    /// Output captured before the failure, if the program got to run
    pub fn output(&self) -> Option<&RunOutput> {
        match self {
            RunError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

struct ExitCode<'a>(&'a Option<i32>);

impl fmt::Display for ExitCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            Some(code) => write!(f, "status {}", code),
            None => f.write_str("a signal"),
        }
    }
}

/// Runs an external program to completion.
///
/// Implementations must scope the working directory to the single invocation
/// (never change the process-wide cwd) and report a non-zero exit as
/// [`RunError::Failed`] carrying whatever the program printed.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, dir: &Path, argv: &[String]) -> Result<RunOutput, RunError>;
}
