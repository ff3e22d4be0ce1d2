use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::command::{self, DEFAULT_START, DEFAULT_STOP};

/// Stable position of a project in the registry
pub type ProjectIndex = usize;

/// A configured compose project. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    /// Working directory for every command issued against the project
    pub path: PathBuf,
    /// Custom start command string (overrides `docker-compose up -d`)
    pub start: Option<String>,
    /// Custom stop command string (overrides `docker-compose down`)
    pub stop: Option<String>,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            start: None,
            stop: None,
        }
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    /// Argument vector used to bring the project up
    pub fn start_argv(&self) -> Vec<String> {
        command::resolve(self.start.as_deref(), DEFAULT_START)
    }

    /// Argument vector used to bring the project down
    pub fn stop_argv(&self) -> Vec<String> {
        command::resolve(self.stop.as_deref(), DEFAULT_STOP)
    }
}

/// The settled status a transition is heading towards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Running,
    Stopped,
}

impl Target {
    pub fn label(self) -> &'static str {
        match self {
            Target::Running => "running",
            Target::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProjectStatus {
    #[default]
    Unknown,
    Stopped,
    Running,
    Transitioning {
        target: Target,
    },
    Error {
        message: String,
    },
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Unknown => "unknown",
            ProjectStatus::Stopped => "stopped",
            ProjectStatus::Running => "running",
            ProjectStatus::Transitioning {
                target: Target::Running,
            } => "starting",
            ProjectStatus::Transitioning {
                target: Target::Stopped,
            } => "stopping",
            ProjectStatus::Error { .. } => "error",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProjectStatus::Running)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, ProjectStatus::Transitioning { .. })
    }

    /// Where an activation from this status would go.
    ///
    /// Anything that is not known to be running is brought up; `None` while a
    /// transition is already in flight.
    pub fn next_target(&self) -> Option<Target> {
        match self {
            ProjectStatus::Stopped | ProjectStatus::Unknown | ProjectStatus::Error { .. } => {
                Some(Target::Running)
            }
            ProjectStatus::Running => Some(Target::Stopped),
            ProjectStatus::Transitioning { .. } => None,
        }
    }
}

impl From<Target> for ProjectStatus {
    fn from(target: Target) -> Self {
        match target {
            Target::Running => ProjectStatus::Running,
            Target::Stopped => ProjectStatus::Stopped,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Believed state of one project.
///
/// Status is only writable from inside the crate: the registry sets the
/// initial status check and the orchestrator drives every later change.
///
/// `generation` is bumped whenever background work is launched for the
/// project; a completion carrying an older generation is stale.
#[derive(Clone, Debug)]
pub struct ProjectState {
    index: ProjectIndex,
    descriptor: Arc<ProjectDescriptor>,
    status: ProjectStatus,
    generation: u64,
    checking: bool,
}

impl ProjectState {
    pub(crate) fn new(index: ProjectIndex, descriptor: Arc<ProjectDescriptor>) -> Self {
        Self {
            index,
            descriptor,
            status: ProjectStatus::Stopped,
            generation: 0,
            checking: false,
        }
    }

    pub fn index(&self) -> ProjectIndex {
        self.index
    }

    pub fn descriptor(&self) -> &Arc<ProjectDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn status(&self) -> &ProjectStatus {
        &self.status
    }

    /// Status being transitioned toward, if a transition is in flight
    pub fn pending_target(&self) -> Option<Target> {
        match self.status {
            ProjectStatus::Transitioning { target } => Some(target),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A background status check has been launched and not yet reported back
    pub fn is_checking(&self) -> bool {
        self.checking
    }

    pub(crate) fn set_status(&mut self, status: ProjectStatus) {
        self.status = status;
    }

    pub(crate) fn set_checking(&mut self, checking: bool) {
        self.checking = checking;
    }

    /// Invalidate whatever is in flight and return the new generation
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
