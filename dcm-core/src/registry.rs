use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::{self, DEFAULT_STATUS};
use crate::model::{ProjectDescriptor, ProjectIndex, ProjectState, ProjectStatus};
use crate::runner::ProcessRunner;

/// Ordered collection of every configured project
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: Vec<ProjectState>,
}

impl ProjectRegistry {
    /// Build the registry and check each project's status once, in order.
    ///
    /// A project whose status check fails is loaded as `Unknown`; it never stops
    /// the rest from loading.
    pub async fn load(descriptors: Vec<Arc<ProjectDescriptor>>, runner: &dyn ProcessRunner) -> Self {
        let mut projects: Vec<ProjectState> = descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| ProjectState::new(index, descriptor))
            .collect();

        for project in &mut projects {
            let status = check_status(runner, project.descriptor()).await;
            project.set_status(status);
        }

        Self { projects }
    }

    pub fn get(&self, index: ProjectIndex) -> Option<&ProjectState> {
        self.projects.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: ProjectIndex) -> Option<&mut ProjectState> {
        self.projects.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectState> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// (running, total) for the list header
    pub fn counts(&self) -> (usize, usize) {
        let running = self
            .projects
            .iter()
            .filter(|p| p.status().is_running())
            .count();
        (running, self.projects.len())
    }
}

/// Ask the compose tool whether anything is up for `descriptor`.
///
/// Only standard output is considered: compose prints warnings on stderr
/// even when nothing is running.
pub async fn check_status(runner: &dyn ProcessRunner, descriptor: &ProjectDescriptor) -> ProjectStatus {
    let argv = command::owned(DEFAULT_STATUS);
    match runner.run(&descriptor.path, &argv).await {
        Ok(output) => {
            let status = if output.stdout.is_empty() {
                ProjectStatus::Stopped
            } else {
                ProjectStatus::Running
            };
            debug!(project = %descriptor.name, status = %status, "checked project status");
            status
        }
        Err(err) => {
            let output = err.output().map(|o| o.text()).unwrap_or_default();
            warn!(
                project = %descriptor.name,
                dir = %descriptor.path.display(),
                error = %err,
                output = %output,
                "failed to get project status"
            );
            ProjectStatus::Unknown
        }
    }
}
