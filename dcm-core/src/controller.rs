//! Interactive list state
//!
//! Owns the registry, the selection cursor and the busy gate. The terminal
//! front end translates key presses into [`Input`]s, feeds completions from
//! the orchestrator's channel into [`InteractiveController::handle_completion`]
//! and renders [`InteractiveController::rows`] and
//! [`InteractiveController::view_mode`]. Everything here runs on the event-loop
//! thread; no locks are involved.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::model::{ProjectIndex, ProjectState, ProjectStatus, Target};
use crate::orchestrator::{Activation, Applied, Completion, LifecycleOrchestrator};
use crate::registry::ProjectRegistry;

/// Operator intent, already decoupled from concrete key bindings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Home,
    End,
    /// Toggle the highlighted project
    Confirm,
    /// Re-check the status of the highlighted project
    Refresh,
    /// Leave the busy view; the operation keeps running
    Dismiss,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    List,
    /// Spinner bound to the project whose operation is in flight
    Busy { index: ProjectIndex, target: Target },
}

/// One row of the list widget
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectRow {
    pub index: ProjectIndex,
    pub label: String,
    pub status: ProjectStatus,
}

impl ProjectRow {
    fn from_state(state: &ProjectState) -> Self {
        Self {
            index: state.index(),
            label: format!("{}. {} ({})", state.index() + 1, state.name(), state.status()),
            status: state.status().clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

/// Status line shown under the list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl StatusMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

pub struct InteractiveController {
    registry: ProjectRegistry,
    orchestrator: LifecycleOrchestrator,
    rows: Vec<ProjectRow>,
    selected: usize,
    /// Operation-in-progress gate, bound to the project shown in the spinner
    busy: Option<ProjectIndex>,
    message: Option<StatusMessage>,
}

impl InteractiveController {
    pub fn new(registry: ProjectRegistry, orchestrator: LifecycleOrchestrator) -> Self {
        let rows = registry.iter().map(ProjectRow::from_state).collect();
        Self {
            registry,
            orchestrator,
            rows,
            selected: 0,
            busy: None,
            message: None,
        }
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn rows(&self) -> &[ProjectRow] {
        &self.rows
    }

    pub fn selected(&self) -> Option<usize> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn selected_project(&self) -> Option<&ProjectState> {
        self.selected().and_then(|i| self.registry.get(i))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.busy
            .and_then(|index| {
                let target = self.registry.get(index)?.pending_target()?;
                Some(ViewMode::Busy { index, target })
            })
            .unwrap_or(ViewMode::List)
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub fn handle_input(&mut self, input: Input) -> Flow {
        if input == Input::Quit {
            if let Some(state) = self.busy.and_then(|i| self.registry.get(i)) {
                // Cannot be cancelled; the external command finishes on its own.
                warn!(project = %state.name(), "quitting with an operation still running");
            }
            return Flow::Quit;
        }

        if self.busy.is_some() {
            if input == Input::Dismiss {
                self.busy = None;
            }
            return Flow::Continue;
        }

        let last = self.rows.len().saturating_sub(1);
        match input {
            Input::Up => self.selected = self.selected.saturating_sub(1),
            Input::Down => self.selected = (self.selected + 1).min(last),
            Input::Home => self.selected = 0,
            Input::End => self.selected = last,
            Input::Confirm => self.confirm(),
            Input::Refresh => self.refresh(),
            Input::Dismiss => self.message = None,
            Input::Quit => {}
        }
        Flow::Continue
    }

    fn confirm(&mut self) {
        let Some(state) = self.registry.get_mut(self.selected) else {
            return;
        };

        match self.orchestrator.activate(state) {
            Activation::Launched { index, target } => {
                info!(project = %state.name(), target = %target, "activation launched");
                self.busy = Some(index);
                self.message = None;
                self.sync_row(index);
            }
            Activation::AlreadyTransitioning { .. } => {
                self.message = Some(StatusMessage::info(format!(
                    "{} is already {}",
                    state.name(),
                    state.status()
                )));
            }
        }
    }

    fn refresh(&mut self) {
        let Some(state) = self.registry.get_mut(self.selected) else {
            return;
        };
        let text = if self.orchestrator.refresh(state) {
            format!("Checking {} ...", state.name())
        } else if state.is_checking() {
            format!("Still checking {} ...", state.name())
        } else {
            format!("{} is {}, try again when it settles", state.name(), state.status())
        };
        self.message = Some(StatusMessage::info(text));
    }

    /// Merge a finished background operation into the registry and the rows
    pub fn handle_completion(&mut self, completion: Completion) -> Applied {
        let applied = LifecycleOrchestrator::apply(&mut self.registry, completion);
        let index = applied.index();
        let name = self
            .registry
            .get(index)
            .map(|s| s.name().to_string())
            .unwrap_or_default();

        match &applied {
            Applied::Committed { status, .. } => {
                self.message = Some(StatusMessage::info(format!("{} is {}", name, status)));
            }
            Applied::Failed {
                message, output, ..
            } => {
                let last_line = output.lines().last().unwrap_or_default();
                let text = if last_line.is_empty() {
                    format!("{}: {}", name, message)
                } else {
                    format!("{}: {} ({})", name, message, last_line)
                };
                self.message = Some(StatusMessage::error(text));
            }
            Applied::Refreshed { status, .. } => {
                self.message = Some(StatusMessage::info(format!("{} is {}", name, status)));
            }
            Applied::Stale { .. } => {}
        }

        self.sync_row(index);
        if self.busy == Some(index) && !matches!(applied, Applied::Stale { .. }) {
            self.busy = None;
        }
        applied
    }

    /// Projects whose start or stop has not reported back yet
    pub fn pending(&self) -> impl Iterator<Item = &ProjectState> {
        self.registry.iter().filter(|p| p.status().is_transitioning())
    }

    /// Apply completions until no start or stop is left in flight.
    ///
    /// Used on the way out: the process exiting would take the external
    /// commands' output pipes with it. Outstanding status checks are applied
    /// if they arrive first but are not waited for.
    pub async fn finish_pending(
        &mut self,
        completions: &mut mpsc::UnboundedReceiver<Completion>,
    ) -> Vec<Applied> {
        let mut applied = Vec::new();
        while self.pending().next().is_some() {
            let Some(completion) = completions.recv().await else {
                break;
            };
            applied.push(self.handle_completion(completion));
        }
        applied
    }

    fn sync_row(&mut self, index: ProjectIndex) {
        if let (Some(state), Some(row)) = (self.registry.get(index), self.rows.get_mut(index)) {
            *row = ProjectRow::from_state(state);
        }
    }
}
