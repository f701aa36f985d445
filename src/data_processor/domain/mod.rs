//! Domain model for fixture and seed execution.
//!
//! The domain covers task descriptors, their dependency ordering and the
//! execution records that make every task run at most once successfully.
//! Persistence and scheduling stay outside the domain boundary.

mod dependency;
mod descriptor;
mod error;
mod execution;
mod ids;
mod registry;

pub use dependency::{
    BlockedTask, DependencyNode, DependencyResolutionError, order_by_dependencies,
};
pub use descriptor::{Fixture, Seed, TaskActionError, TaskActionResult, TaskDescriptor, TaskMetadata};
pub use error::{
    ParseTaskExecutionStateError, ParseTaskTypeError, TaskExecutionDomainError,
    render_error_chain,
};
pub use execution::{
    PersistedTaskExecutionData, TaskExecution, TaskExecutionKey, TaskExecutionState, TaskType,
};
pub use ids::{DeploymentEnvironment, RunStartTime, TaskExecutionId, TaskName};
pub use registry::{TaskRegistry, TaskRegistryError};
