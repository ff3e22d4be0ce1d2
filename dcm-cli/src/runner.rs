use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use dcm_core::runner::{ProcessRunner, RunError, RunOutput};

/// Runs commands as real child processes.
///
/// The working directory is set on each child only. Output is piped back
/// to this process, so callers must keep the runtime alive until the child
/// exits; `main` waits for in-flight operations after the UI closes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, dir: &Path, argv: &[String]) -> Result<RunOutput, RunError> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.current_dir(dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(false);

        let output = cmd.output().await.map_err(|source| RunError::Launch {
            program: program.clone(),
            source,
        })?;

        let captured = RunOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        };
        if output.status.success() {
            Ok(captured)
        } else {
            Err(RunError::Failed {
                program: program.clone(),
                code: output.status.code(),
                output: captured,
            })
        }
    }
}
