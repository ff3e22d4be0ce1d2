//! Per-project lifecycle state machine
//!
//! ```text
//!   Stopped | Unknown | Error --activate--> Transitioning{Running}
//!   Running                   --activate--> Transitioning{Stopped}
//!   Transitioning{t} --ok--> t
//!   Transitioning{t} --err--> Error
//! ```
//!
//! `activate` only flips the project into `Transitioning` and hands the
//! external command to a background task. The settled status is committed by
//! [`LifecycleOrchestrator::apply`] when the task's [`Completion`] comes back
//! through the channel, on the thread that owns the registry.
//!
//! Every launch bumps the project's generation and the completion carries the
//! generation it was launched under. `apply` drops anything older, so a late
//! status check can never overwrite a transition that settled after it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::command::render_argv;
use crate::model::{ProjectDescriptor, ProjectIndex, ProjectState, ProjectStatus, Target};
use crate::registry::{self, ProjectRegistry};
use crate::runner::{ProcessRunner, RunError, RunOutput};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
}

impl Operation {
    pub fn towards(target: Target) -> Self {
        match target {
            Target::Running => Operation::Start,
            Target::Stopped => Operation::Stop,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
        }
    }

    pub fn argv(self, descriptor: &ProjectDescriptor) -> Vec<String> {
        match self {
            Operation::Start => descriptor.start_argv(),
            Operation::Stop => descriptor.stop_argv(),
        }
    }
}

/// What a background task reports back for one project
#[derive(Debug)]
pub enum Outcome {
    /// A start/stop launched by `activate` ran to completion
    Finished {
        target: Target,
        result: Result<RunOutput, RunError>,
    },
    /// A status check launched by `refresh` came back
    Checked { status: ProjectStatus },
}

/// Completion message, always tagged with the project it belongs to
#[derive(Debug)]
pub struct Completion {
    pub index: ProjectIndex,
    pub generation: u64,
    pub outcome: Outcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Launched { index: ProjectIndex, target: Target },
    /// A transition is already in flight; nothing was launched
    AlreadyTransitioning { index: ProjectIndex },
}

/// Result of merging a completion into the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// Transition confirmed, status is now the target
    Committed { index: ProjectIndex, status: ProjectStatus },
    /// Transition failed, status is now `Error`
    Failed {
        index: ProjectIndex,
        message: String,
        output: String,
    },
    /// Status check result stored
    Refreshed { index: ProjectIndex, status: ProjectStatus },
    /// Completion no longer matches the project's state and was dropped
    Stale { index: ProjectIndex },
}

impl Applied {
    pub fn index(&self) -> ProjectIndex {
        match self {
            Applied::Committed { index, .. }
            | Applied::Failed { index, .. }
            | Applied::Refreshed { index, .. }
            | Applied::Stale { index } => *index,
        }
    }
}

/// Issues start/stop operations and reports their completion.
///
/// Launching requires a running tokio runtime. There is no cancellation or
/// timeout: a launched command runs until the external process exits.
pub struct LifecycleOrchestrator {
    runner: Arc<dyn ProcessRunner>,
    completion_tx: mpsc::UnboundedSender<Completion>,
}

impl LifecycleOrchestrator {
    /// Returns the orchestrator and the receiving end of its completion
    /// channel. Messages arrive in the order the operations finished.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        (
            Self {
                runner,
                completion_tx,
            },
            completion_rx,
        )
    }

    /// Toggle a project. Returns immediately; the outcome arrives later as a
    /// [`Completion`].
    pub fn activate(&self, state: &mut ProjectState) -> Activation {
        let index = state.index();
        let Some(target) = state.status().next_target() else {
            debug!(project = %state.name(), "activation ignored, transition in flight");
            return Activation::AlreadyTransitioning { index };
        };

        state.set_status(ProjectStatus::Transitioning { target });
        let generation = state.next_generation();

        let runner = Arc::clone(&self.runner);
        let descriptor = Arc::clone(state.descriptor());
        let tx = self.completion_tx.clone();
        let op = Operation::towards(target);
        tokio::spawn(async move {
            let result = execute(runner.as_ref(), &descriptor, op).await;
            // Receiver gone means the UI quit; the result has nowhere to go.
            let _ = tx.send(Completion {
                index,
                generation,
                outcome: Outcome::Finished { target, result },
            });
        });

        Activation::Launched { index, target }
    }

    /// Re-check a project's status in the background. Returns false while the
    /// project is transitioning or an earlier check is still outstanding.
    pub fn refresh(&self, state: &mut ProjectState) -> bool {
        if state.status().is_transitioning() || state.is_checking() {
            debug!(project = %state.name(), "refresh ignored, project busy");
            return false;
        }

        state.set_checking(true);
        let generation = state.next_generation();
        let index = state.index();
        let runner = Arc::clone(&self.runner);
        let descriptor = Arc::clone(state.descriptor());
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let status = registry::check_status(runner.as_ref(), &descriptor).await;
            let _ = tx.send(Completion {
                index,
                generation,
                outcome: Outcome::Checked { status },
            });
        });
        true
    }

    /// Bring a project up and wait for it
    pub async fn start(&self, descriptor: &ProjectDescriptor) -> Result<RunOutput, RunError> {
        execute(self.runner.as_ref(), descriptor, Operation::Start).await
    }

    /// Bring a project down and wait for it
    pub async fn stop(&self, descriptor: &ProjectDescriptor) -> Result<RunOutput, RunError> {
        execute(self.runner.as_ref(), descriptor, Operation::Stop).await
    }

    /// Merge a completion into the registry. Must be called from the thread
    /// that owns `registry`; workers never touch it.
    pub fn apply(registry: &mut ProjectRegistry, completion: Completion) -> Applied {
        let index = completion.index;
        let Some(state) = registry.get_mut(index) else {
            return Applied::Stale { index };
        };

        // At most one status check is outstanding per project, so any check
        // result ends it, current or not.
        if matches!(completion.outcome, Outcome::Checked { .. }) {
            state.set_checking(false);
        }
        if completion.generation != state.generation() {
            debug!(
                project = %state.name(),
                generation = completion.generation,
                current = state.generation(),
                "dropping superseded completion"
            );
            return Applied::Stale { index };
        }

        match completion.outcome {
            Outcome::Finished { target, result } => {
                if state.pending_target() != Some(target) {
                    debug!(project = %state.name(), "dropping completion for a transition no longer pending");
                    return Applied::Stale { index };
                }
                match result {
                    Ok(_) => {
                        let status = ProjectStatus::from(target);
                        state.set_status(status.clone());
                        Applied::Committed { index, status }
                    }
                    Err(err) => {
                        let message = err.to_string();
                        let output = err.output().map(|o| o.text()).unwrap_or_default();
                        state.set_status(ProjectStatus::Error {
                            message: message.clone(),
                        });
                        Applied::Failed {
                            index,
                            message,
                            output,
                        }
                    }
                }
            }
            Outcome::Checked { status } => {
                state.set_status(status.clone());
                Applied::Refreshed { index, status }
            }
        }
    }
}

/// Run the start or stop command for a project in its directory
pub async fn execute(
    runner: &dyn ProcessRunner,
    descriptor: &ProjectDescriptor,
    op: Operation,
) -> Result<RunOutput, RunError> {
    let argv = op.argv(descriptor);
    info!(
        project = %descriptor.name,
        dir = %descriptor.path.display(),
        argv = %render_argv(&argv),
        "{} project",
        op.verb()
    );

    match runner.run(&descriptor.path, &argv).await {
        Ok(output) => {
            debug!(project = %descriptor.name, output = %output.text(), "{} finished", op.verb());
            Ok(output)
        }
        Err(err) => {
            let output = err.output().map(|o| o.text()).unwrap_or_default();
            error!(
                project = %descriptor.name,
                error = %err,
                output = %output,
                "failed to {} project",
                op.verb()
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::command::owned;
    use crate::testing::{FakeRunner, Reply};

    async fn setup(
        runner: FakeRunner,
        projects: Vec<ProjectDescriptor>,
    ) -> (
        Arc<FakeRunner>,
        ProjectRegistry,
        LifecycleOrchestrator,
        mpsc::UnboundedReceiver<Completion>,
    ) {
        let runner = Arc::new(runner);
        let registry = ProjectRegistry::load(
            projects.into_iter().map(Arc::new).collect(),
            runner.as_ref(),
        )
        .await;
        let (orchestrator, rx) = LifecycleOrchestrator::new(runner.clone());
        (runner, registry, orchestrator, rx)
    }

    #[tokio::test]
    async fn test_activate_stopped_runs_default_up_and_commits_running() {
        let (runner, mut registry, orch, mut rx) =
            setup(FakeRunner::new(), vec![ProjectDescriptor::new("web", "/srv/web")]).await;
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Stopped);

        let activation = orch.activate(registry.get_mut(0).unwrap());
        assert_eq!(
            activation,
            Activation::Launched {
                index: 0,
                target: Target::Running
            }
        );
        assert_eq!(
            registry.get(0).unwrap().status(),
            &ProjectStatus::Transitioning {
                target: Target::Running
            }
        );

        let completion = rx.recv().await.unwrap();
        let applied = LifecycleOrchestrator::apply(&mut registry, completion);
        assert_eq!(
            applied,
            Applied::Committed {
                index: 0,
                status: ProjectStatus::Running
            }
        );
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Running);

        let (dir, argv) = runner.calls().last().cloned().unwrap();
        assert_eq!(dir, PathBuf::from("/srv/web"));
        assert_eq!(argv, owned(&["docker-compose", "up", "-d"]));
    }

    #[tokio::test]
    async fn test_activate_running_stops_with_custom_command() {
        let runner = FakeRunner::new().on("/srv/db", "top", Reply::Stdout("postgres"));
        let (runner, mut registry, orch, mut rx) = setup(
            runner,
            vec![ProjectDescriptor::new("db", "/srv/db").with_stop("my-tool stop --force")],
        )
        .await;
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Running);

        orch.activate(registry.get_mut(0).unwrap());
        let applied = LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());

        assert_eq!(
            applied,
            Applied::Committed {
                index: 0,
                status: ProjectStatus::Stopped
            }
        );
        let (dir, argv) = runner.calls().last().cloned().unwrap();
        assert_eq!(dir, PathBuf::from("/srv/db"));
        assert_eq!(argv, ["my-tool", "stop", "--force"]);
    }

    #[tokio::test]
    async fn test_activate_twice_launches_once() {
        let (runner, mut registry, orch, mut rx) =
            setup(FakeRunner::new(), vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        let first = orch.activate(registry.get_mut(0).unwrap());
        let second = orch.activate(registry.get_mut(0).unwrap());
        assert!(matches!(first, Activation::Launched { .. }));
        assert_eq!(second, Activation::AlreadyTransitioning { index: 0 });

        LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert_eq!(runner.calls_with("up"), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_operation_sets_error_and_surfaces_output() {
        let runner = FakeRunner::new().on(
            "/srv/web",
            "up",
            Reply::Fail {
                code: 1,
                output: "port is already allocated",
            },
        );
        let (_runner, mut registry, orch, mut rx) =
            setup(runner, vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        orch.activate(registry.get_mut(0).unwrap());
        let applied = LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());

        match applied {
            Applied::Failed {
                index,
                message,
                output,
            } => {
                assert_eq!(index, 0);
                assert_eq!(message, "docker-compose exited with status 1");
                assert_eq!(output, "port is already allocated");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(matches!(
            registry.get(0).unwrap().status(),
            ProjectStatus::Error { .. }
        ));
    }

    #[tokio::test]
    async fn test_error_status_activates_towards_running() {
        let runner = FakeRunner::new().on("/srv/web", "up", Reply::NotFound);
        let (runner, mut registry, orch, mut rx) =
            setup(runner, vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        orch.activate(registry.get_mut(0).unwrap());
        LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert!(matches!(
            registry.get(0).unwrap().status(),
            ProjectStatus::Error { .. }
        ));

        // No automatic retry: only a fresh activation runs `up` again
        assert_eq!(runner.calls_with("up"), 1);
        let again = orch.activate(registry.get_mut(0).unwrap());
        assert_eq!(
            again,
            Activation::Launched {
                index: 0,
                target: Target::Running
            }
        );
        rx.recv().await.unwrap();
        assert_eq!(runner.calls_with("up"), 2);
    }

    #[tokio::test]
    async fn test_completions_arrive_in_finish_order_and_name_their_project() {
        let runner = FakeRunner::new().on_delayed(
            "/srv/slow",
            "up",
            Reply::Stdout(""),
            Duration::from_millis(50),
        );
        let (_runner, mut registry, orch, mut rx) = setup(
            runner,
            vec![
                ProjectDescriptor::new("slow", "/srv/slow"),
                ProjectDescriptor::new("fast", "/srv/fast"),
            ],
        )
        .await;

        orch.activate(registry.get_mut(0).unwrap());
        orch.activate(registry.get_mut(1).unwrap());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.index, 1);
        LifecycleOrchestrator::apply(&mut registry, first);
        assert_eq!(registry.get(1).unwrap().status(), &ProjectStatus::Running);
        assert!(registry.get(0).unwrap().status().is_transitioning());

        let second = rx.recv().await.unwrap();
        assert_eq!(second.index, 0);
        LifecycleOrchestrator::apply(&mut registry, second);
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Running);
    }

    #[tokio::test]
    async fn test_refresh_updates_status() {
        let (_runner, mut registry, orch, mut rx) =
            setup(FakeRunner::new(), vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        assert!(orch.refresh(registry.get_mut(0).unwrap()));
        assert!(registry.get(0).unwrap().is_checking());
        let applied = LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert_eq!(
            applied,
            Applied::Refreshed {
                index: 0,
                status: ProjectStatus::Stopped
            }
        );
        assert!(!registry.get(0).unwrap().is_checking());
    }

    #[tokio::test]
    async fn test_refresh_refused_while_transitioning() {
        let (_runner, mut registry, orch, _rx) =
            setup(FakeRunner::new(), vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        orch.activate(registry.get_mut(0).unwrap());
        assert!(!orch.refresh(registry.get_mut(0).unwrap()));
    }

    #[tokio::test]
    async fn test_refresh_refused_while_previous_check_outstanding() {
        let runner = FakeRunner::new();
        let (runner, mut registry, orch, mut rx) =
            setup(runner, vec![ProjectDescriptor::new("web", "/srv/web")]).await;
        assert_eq!(runner.calls_with("top"), 1);

        assert!(orch.refresh(registry.get_mut(0).unwrap()));
        assert!(!orch.refresh(registry.get_mut(0).unwrap()));
        assert!(!orch.refresh(registry.get_mut(0).unwrap()));

        LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert_eq!(runner.calls_with("top"), 2);
        assert!(rx.try_recv().is_err());

        // Once the check has reported back a new one may start
        assert!(orch.refresh(registry.get_mut(0).unwrap()));
        LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert_eq!(runner.calls_with("top"), 3);
    }

    #[tokio::test]
    async fn test_status_check_finishing_after_transition_is_dropped() {
        // The check is slower than `up`: it reports the pre-start state after
        // the start has already been committed.
        let runner = FakeRunner::new().on_delayed(
            "/srv/web",
            "top",
            Reply::Stdout(""),
            Duration::from_millis(50),
        );
        let (_runner, mut registry, orch, mut rx) =
            setup(runner, vec![ProjectDescriptor::new("web", "/srv/web")]).await;
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Stopped);

        assert!(orch.refresh(registry.get_mut(0).unwrap()));
        orch.activate(registry.get_mut(0).unwrap());

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.outcome, Outcome::Finished { .. }));
        assert_eq!(
            LifecycleOrchestrator::apply(&mut registry, first),
            Applied::Committed {
                index: 0,
                status: ProjectStatus::Running
            }
        );

        let late = rx.recv().await.unwrap();
        assert!(matches!(late.outcome, Outcome::Checked { .. }));
        assert_eq!(
            LifecycleOrchestrator::apply(&mut registry, late),
            Applied::Stale { index: 0 }
        );
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Running);
        assert!(!registry.get(0).unwrap().is_checking());
    }

    #[tokio::test]
    async fn test_status_check_finishing_during_transition_is_dropped() {
        let runner = FakeRunner::new().on_delayed(
            "/srv/web",
            "up",
            Reply::Stdout(""),
            Duration::from_millis(50),
        );
        let (_runner, mut registry, orch, mut rx) =
            setup(runner, vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        assert!(orch.refresh(registry.get_mut(0).unwrap()));
        orch.activate(registry.get_mut(0).unwrap());

        let check = rx.recv().await.unwrap();
        assert!(matches!(check.outcome, Outcome::Checked { .. }));
        assert_eq!(
            LifecycleOrchestrator::apply(&mut registry, check),
            Applied::Stale { index: 0 }
        );
        assert!(registry.get(0).unwrap().status().is_transitioning());

        LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Running);
    }

    #[tokio::test]
    async fn test_completion_from_older_generation_is_stale() {
        let (_runner, mut registry, orch, mut rx) =
            setup(FakeRunner::new(), vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        orch.activate(registry.get_mut(0).unwrap());
        let current = registry.get(0).unwrap().generation();
        let superseded = Completion {
            index: 0,
            generation: current - 1,
            outcome: Outcome::Finished {
                target: Target::Running,
                result: Ok(RunOutput::default()),
            },
        };
        assert_eq!(
            LifecycleOrchestrator::apply(&mut registry, superseded),
            Applied::Stale { index: 0 }
        );
        assert!(registry.get(0).unwrap().status().is_transitioning());

        LifecycleOrchestrator::apply(&mut registry, rx.recv().await.unwrap());
        assert_eq!(registry.get(0).unwrap().status(), &ProjectStatus::Running);
    }

    #[tokio::test]
    async fn test_completion_for_unknown_index_is_stale() {
        let (_runner, mut registry, _orch, _rx) =
            setup(FakeRunner::new(), vec![ProjectDescriptor::new("web", "/srv/web")]).await;

        let completion = Completion {
            index: 7,
            generation: 1,
            outcome: Outcome::Finished {
                target: Target::Running,
                result: Ok(RunOutput::default()),
            },
        };
        assert_eq!(
            LifecycleOrchestrator::apply(&mut registry, completion),
            Applied::Stale { index: 7 }
        );
    }

    #[tokio::test]
    async fn test_direct_start_and_stop() {
        let runner = Arc::new(FakeRunner::new());
        let (orch, _rx) = LifecycleOrchestrator::new(runner.clone());
        let descriptor = ProjectDescriptor::new("web", "/srv/web").with_start("make up");

        orch.start(&descriptor).await.unwrap();
        orch.stop(&descriptor).await.unwrap();

        let argvs: Vec<Vec<String>> = runner.calls().into_iter().map(|(_, a)| a).collect();
        assert_eq!(
            argvs,
            vec![owned(&["make", "up"]), owned(&["docker-compose", "down"])]
        );
    }
}
