//! Fixture and seed descriptors.
//!
//! A descriptor couples a task's registration metadata (name, dependencies
//! and, for fixtures, applicable environments) with the async action that
//! performs the work.

use super::{DeploymentEnvironment, TaskExecutionDomainError, TaskName, TaskType, render_error_chain};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type returned by fixture and seed actions.
pub type TaskActionResult = Result<(), TaskActionError>;

/// Registration-time metadata shared by fixtures and seeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetadata {
    name: String,
    dependencies: Vec<String>,
}

impl TaskMetadata {
    /// Creates metadata for a task with no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Adds a dependency on another task of the same type.
    ///
    /// Repeated calls accumulate; declaring the same dependency twice has no
    /// further effect.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let dependency = name.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// Returns the declared task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns declared dependency names.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Idempotent, environment-scoped bootstrap action.
#[async_trait]
pub trait Fixture: Send + Sync {
    /// Returns the fixture name and dependencies.
    fn metadata(&self) -> TaskMetadata;

    /// Returns the deployment environments the fixture applies to.
    fn environments(&self) -> Vec<DeploymentEnvironment>;

    /// Applies the fixture.
    ///
    /// # Errors
    ///
    /// Returns [`TaskActionError`] when the fixture could not be applied. The
    /// failure is recorded and the fixture is retried on the next run.
    async fn apply(&self) -> TaskActionResult;
}

/// Environment-agnostic data seeding action.
#[async_trait]
pub trait Seed: Send + Sync {
    /// Returns the seed name and dependencies.
    fn metadata(&self) -> TaskMetadata;

    /// Seeds data.
    ///
    /// # Errors
    ///
    /// Returns [`TaskActionError`] when seeding failed. The failure is
    /// recorded and the seed is retried on the next run.
    async fn seed(&self) -> TaskActionResult;
}

#[derive(Clone)]
enum DescriptorKind {
    Fixture {
        environments: Vec<DeploymentEnvironment>,
        action: Arc<dyn Fixture>,
    },
    Seed(Arc<dyn Seed>),
}

/// A registered fixture or seed with validated metadata.
#[derive(Clone)]
pub struct TaskDescriptor {
    name: TaskName,
    dependencies: Vec<TaskName>,
    kind: DescriptorKind,
}

impl TaskDescriptor {
    /// Builds a descriptor from a fixture implementation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionDomainError`] when the fixture name or one of
    /// its dependency names is invalid.
    pub fn fixture(action: Arc<dyn Fixture>) -> Result<Self, TaskExecutionDomainError> {
        let (name, dependencies) = validate_metadata(&action.metadata())?;
        let environments = action.environments();
        Ok(Self {
            name,
            dependencies,
            kind: DescriptorKind::Fixture {
                environments,
                action,
            },
        })
    }

    /// Builds a descriptor from a seed implementation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionDomainError`] when the seed name or one of its
    /// dependency names is invalid.
    pub fn seed(action: Arc<dyn Seed>) -> Result<Self, TaskExecutionDomainError> {
        let (name, dependencies) = validate_metadata(&action.metadata())?;
        Ok(Self {
            name,
            dependencies,
            kind: DescriptorKind::Seed(action),
        })
    }

    /// Returns the descriptor name.
    #[must_use]
    pub const fn name(&self) -> &TaskName {
        &self.name
    }

    /// Returns the names this descriptor depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    /// Returns whether this is a fixture or a seed.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        match self.kind {
            DescriptorKind::Fixture { .. } => TaskType::Fixture,
            DescriptorKind::Seed(_) => TaskType::Seed,
        }
    }

    /// Returns applicable environments; `None` for seeds.
    #[must_use]
    pub fn environments(&self) -> Option<&[DeploymentEnvironment]> {
        match &self.kind {
            DescriptorKind::Fixture { environments, .. } => Some(environments),
            DescriptorKind::Seed(_) => None,
        }
    }

    /// Returns whether the descriptor should run in `environment`.
    ///
    /// Seeds apply everywhere; fixtures only where listed.
    #[must_use]
    pub fn applies_to(&self, environment: &DeploymentEnvironment) -> bool {
        self.environments()
            .is_none_or(|environments| environments.contains(environment))
    }

    /// Runs the underlying action.
    ///
    /// # Errors
    ///
    /// Propagates the action's [`TaskActionError`].
    pub async fn execute(&self) -> TaskActionResult {
        match &self.kind {
            DescriptorKind::Fixture { action, .. } => action.apply().await,
            DescriptorKind::Seed(action) => action.seed().await,
        }
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("task_type", &self.task_type())
            .field("dependencies", &self.dependencies)
            .field("environments", &self.environments())
            .finish_non_exhaustive()
    }
}

fn validate_metadata(
    metadata: &TaskMetadata,
) -> Result<(TaskName, Vec<TaskName>), TaskExecutionDomainError> {
    let name = TaskName::new(metadata.name())?;
    let mut dependencies: Vec<TaskName> = Vec::with_capacity(metadata.dependencies().len());
    for raw in metadata.dependencies() {
        let dependency = TaskName::new(raw.as_str())?;
        if !dependencies.contains(&dependency) {
            dependencies.push(dependency);
        }
    }
    Ok((name, dependencies))
}

/// Failure reported by a fixture or seed action.
#[derive(Debug, Clone, Error)]
pub enum TaskActionError {
    /// Plain failure message.
    #[error("{0}")]
    Message(String),

    /// Failure with context wrapping an underlying error.
    #[error("{context}")]
    Context {
        /// Description of what the action was doing.
        context: String,
        /// Underlying failure.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Underlying failure without additional context.
    #[error(transparent)]
    Failed(Arc<dyn std::error::Error + Send + Sync>),

    /// The action panicked.
    #[error("task action panicked: {0}")]
    Panicked(String),

    /// The action's task was cancelled before it finished.
    #[error("task action was aborted before completion")]
    Aborted,
}

impl TaskActionError {
    /// Creates a failure from a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps an underlying error.
    #[must_use]
    pub fn failed(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Failed(Arc::new(err))
    }

    /// Wraps an underlying error with a description of the failed step.
    #[must_use]
    pub fn with_context(
        context: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Context {
            context: context.into(),
            source: Arc::new(err),
        }
    }

    /// Renders the full diagnostic text, including every underlying cause.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        render_error_chain(self)
    }
}
