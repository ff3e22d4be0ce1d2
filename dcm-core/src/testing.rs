//! Scripted runner for unit tests

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::runner::{ProcessRunner, RunError, RunOutput};

#[derive(Clone, Debug)]
pub enum Reply {
    Stdout(&'static str),
    Fail { code: i32, output: &'static str },
    NotFound,
}

struct Rule {
    dir: PathBuf,
    verb: String,
    reply: Reply,
    delay: Option<Duration>,
}

/// Answers by working directory and the first argument after the program
/// name (`top`, `up`, `down`, ...). Unmatched calls succeed with no output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, dir: &str, verb: &str, reply: Reply) -> Self {
        self.rules.push(Rule {
            dir: PathBuf::from(dir),
            verb: verb.to_string(),
            reply,
            delay: None,
        });
        self
    }

    pub fn on_delayed(mut self, dir: &str, verb: &str, reply: Reply, delay: Duration) -> Self {
        self.rules.push(Rule {
            dir: PathBuf::from(dir),
            verb: verb.to_string(),
            reply,
            delay: Some(delay),
        });
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_with(&self, verb: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(_, argv)| argv.get(1).map(String::as_str) == Some(verb))
            .count()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, dir: &Path, argv: &[String]) -> Result<RunOutput, RunError> {
        self.calls
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), argv.to_vec()));

        let program = argv.first().cloned().ok_or(RunError::EmptyCommand)?;
        let verb = argv.get(1).map(String::as_str).unwrap_or_default();
        let rule = self
            .rules
            .iter()
            .find(|r| r.dir == dir && r.verb == verb);

        let Some(rule) = rule else {
            return Ok(RunOutput::default());
        };
        if let Some(delay) = rule.delay {
            tokio::time::sleep(delay).await;
        }

        match rule.reply.clone() {
            Reply::Stdout(s) => Ok(RunOutput::from_stdout(s)),
            Reply::Fail { code, output } => Err(RunError::Failed {
                program,
                code: Some(code),
                output: RunOutput {
                    stdout: Vec::new(),
                    stderr: output.as_bytes().to_vec(),
                },
            }),
            Reply::NotFound => Err(RunError::Launch {
                program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
        }
    }
}
