use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::command;
use crate::model::ProjectDescriptor;

/// Optional per-project command overrides
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommandOverrides {
    /// Replaces `docker-compose up -d`
    #[serde(default)]
    pub start: Option<String>,

    /// Replaces `docker-compose down`
    #[serde(default)]
    pub stop: Option<String>,
}

/// Project definition in the config file
#[derive(Clone, Debug, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    /// Directory holding the compose file. Relative paths are resolved
    /// against the config file's directory when loaded from disk.
    pub path: PathBuf,

    #[serde(default)]
    pub commands: CommandOverrides,
}

/// Root configuration file structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DcmConfig {
    /// Projects in display order
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no projects configured")]
    NoProjects,
    #[error("project #{position} has an empty '{field}'")]
    EmptyField { position: usize, field: &'static str },
    #[error("project name '{name}' is used more than once")]
    DuplicateName { name: String },
    #[error("project '{project}' has a {which} command with no arguments")]
    EmptyCommand { project: String, which: &'static str },
}

impl DcmConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: DcmConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Load configuration from a string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: DcmConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Make relative project paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for project in &mut self.projects {
            if project.path.is_relative() {
                project.path = base.join(&project.path);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.projects.is_empty() {
            return Err(ConfigError::NoProjects);
        }

        let mut seen = BTreeSet::new();
        for (i, project) in self.projects.iter().enumerate() {
            let position = i + 1;
            if project.name.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    position,
                    field: "name",
                });
            }
            if project.path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyField {
                    position,
                    field: "path",
                });
            }
            if !seen.insert(project.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    name: project.name.clone(),
                });
            }

            let overrides = [
                ("start", project.commands.start.as_deref()),
                ("stop", project.commands.stop.as_deref()),
            ];
            for (which, custom) in overrides {
                // A blank string means "not configured", but `""` or `"  "`
                // in quotes would run nothing at all.
                if let Some(s) = custom {
                    if !s.trim().is_empty() && command::tokenize(s).is_empty() {
                        return Err(ConfigError::EmptyCommand {
                            project: project.name.clone(),
                            which,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Convert to project descriptors, preserving file order
    pub fn descriptors(&self) -> Vec<Arc<ProjectDescriptor>> {
        fn configured(s: &Option<String>) -> Option<String> {
            s.as_ref()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        self.projects
            .iter()
            .map(|p| {
                Arc::new(ProjectDescriptor {
                    name: p.name.clone(),
                    path: p.path.clone(),
                    start: configured(&p.commands.start),
                    stop: configured(&p.commands.stop),
                })
            })
            .collect()
    }
}
