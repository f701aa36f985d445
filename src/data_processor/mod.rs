//! Dependency-ordered, run-once execution of fixtures and seeds.
//!
//! On process start the [`services::DataProcessorJob`] opens one run, applies
//! every fixture registered for the current environment and then every seed,
//! each in dependency order. A task whose execution has succeeded once is
//! never run again; a failed task is retried on the next run. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//! - Ready-made fixtures in [`fixtures`]

pub mod adapters;
pub mod domain;
pub mod fixtures;
pub mod ports;
pub mod services;
pub mod settings;
