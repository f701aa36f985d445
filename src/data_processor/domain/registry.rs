//! Registration of fixtures and seeds.

use super::{Fixture, Seed, TaskDescriptor, TaskExecutionDomainError, TaskName, TaskType};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while registering descriptors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskRegistryError {
    /// The descriptor metadata failed validation.
    #[error(transparent)]
    InvalidName(#[from] TaskExecutionDomainError),

    /// A descriptor with the same name and type is already registered.
    #[error("{task_type} '{name}' is already registered")]
    DuplicateDescriptor {
        /// Task type of the rejected descriptor.
        task_type: TaskType,
        /// Conflicting name.
        name: TaskName,
    },
}

/// The set of fixtures and seeds known to the process.
///
/// Registration order is significant: it is the tie-break used when ordering
/// descriptors with no dependency relation between them.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    fixtures: Vec<TaskDescriptor>,
    seeds: Vec<TaskDescriptor>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fixture.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError`] when the fixture metadata is invalid or a
    /// fixture with the same name is already registered.
    pub fn register_fixture(
        &mut self,
        fixture: impl Fixture + 'static,
    ) -> Result<&mut Self, TaskRegistryError> {
        let descriptor = TaskDescriptor::fixture(Arc::new(fixture))?;
        Self::push_unique(&mut self.fixtures, descriptor)?;
        Ok(self)
    }

    /// Registers a seed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRegistryError`] when the seed metadata is invalid or a
    /// seed with the same name is already registered.
    pub fn register_seed(
        &mut self,
        seed: impl Seed + 'static,
    ) -> Result<&mut Self, TaskRegistryError> {
        let descriptor = TaskDescriptor::seed(Arc::new(seed))?;
        Self::push_unique(&mut self.seeds, descriptor)?;
        Ok(self)
    }

    /// Returns registered descriptors of `task_type` in registration order.
    #[must_use]
    pub fn descriptors(&self, task_type: TaskType) -> &[TaskDescriptor] {
        match task_type {
            TaskType::Fixture => &self.fixtures,
            TaskType::Seed => &self.seeds,
        }
    }

    /// Returns whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty() && self.seeds.is_empty()
    }

    fn push_unique(
        target: &mut Vec<TaskDescriptor>,
        descriptor: TaskDescriptor,
    ) -> Result<(), TaskRegistryError> {
        if target.iter().any(|existing| existing.name() == descriptor.name()) {
            return Err(TaskRegistryError::DuplicateDescriptor {
                task_type: descriptor.task_type(),
                name: descriptor.name().clone(),
            });
        }
        target.push(descriptor);
        Ok(())
    }
}
