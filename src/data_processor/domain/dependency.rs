//! Deterministic dependency ordering for descriptors of one task type.

use super::{TaskDescriptor, TaskName};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// An item that can be ordered by its declared dependencies.
pub trait DependencyNode {
    /// Returns the unique name other nodes refer to.
    fn node_name(&self) -> &TaskName;

    /// Returns the names this node must run after.
    fn node_dependencies(&self) -> &[TaskName];
}

impl DependencyNode for TaskDescriptor {
    fn node_name(&self) -> &TaskName {
        self.name()
    }

    fn node_dependencies(&self) -> &[TaskName] {
        self.dependencies()
    }
}

/// A node that could not be ordered, with the dependencies still unmet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    /// Name of the blocked node.
    pub name: TaskName,
    /// Dependencies that were never satisfied.
    pub unmet: Vec<TaskName>,
}

impl fmt::Display for BlockedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unmet: Vec<&str> = self.unmet.iter().map(TaskName::as_str).collect();
        write!(f, "{} (waiting on {})", self.name, unmet.join(", "))
    }
}

/// Errors returned while ordering descriptors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DependencyResolutionError {
    /// Two nodes share a name.
    #[error("duplicate task name in dependency graph: {0}")]
    DuplicateName(TaskName),

    /// Some nodes can never be ordered.
    #[error(
        "cannot resolve dependency order, check for circular dependencies or dependencies \
         excluded by environment: {}",
        format_blocked(.blocked)
    )]
    Unresolvable {
        /// Every node left over when ordering stalled, in input order.
        blocked: Vec<BlockedTask>,
    },
}

fn format_blocked(blocked: &[BlockedTask]) -> String {
    blocked
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Orders `items` so every node appears after all of its dependencies.
///
/// Ordering proceeds in passes. Each pass selects, in input order, every
/// remaining node whose dependencies were already ordered when the pass
/// began. Nodes selected in the same pass therefore never depend on each
/// other, and the output is stable for a given input.
///
/// # Errors
///
/// Returns [`DependencyResolutionError::DuplicateName`] when two nodes share a
/// name, and [`DependencyResolutionError::Unresolvable`] when a pass selects
/// nothing. Cycles, self-dependencies and dependencies on names absent from
/// `items` all end up in the latter case.
pub fn order_by_dependencies<T: DependencyNode>(
    items: &[T],
) -> Result<Vec<&T>, DependencyResolutionError> {
    let mut seen: HashSet<&TaskName> = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.node_name()) {
            return Err(DependencyResolutionError::DuplicateName(
                item.node_name().clone(),
            ));
        }
    }

    let mut ordered: Vec<&T> = Vec::with_capacity(items.len());
    let mut resolved: HashSet<&TaskName> = HashSet::with_capacity(items.len());
    let mut remaining: Vec<&T> = items.iter().collect();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&T>, Vec<&T>) = remaining.into_iter().partition(|item| {
            item.node_dependencies()
                .iter()
                .all(|dependency| resolved.contains(dependency))
        });

        if ready.is_empty() {
            return Err(DependencyResolutionError::Unresolvable {
                blocked: blocked
                    .iter()
                    .map(|item| BlockedTask {
                        name: item.node_name().clone(),
                        unmet: item
                            .node_dependencies()
                            .iter()
                            .filter(|dependency| !resolved.contains(dependency))
                            .cloned()
                            .collect(),
                    })
                    .collect(),
            });
        }

        resolved.extend(ready.iter().map(|item| item.node_name()));
        ordered.extend(ready);
        remaining = blocked;
    }

    Ok(ordered)
}
