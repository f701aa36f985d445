//! Groundwork: bootstrap data for PostgreSQL-backed services.
//!
//! This crate applies idempotent fixtures and seeds to a database when a
//! service starts. Tasks run in dependency order and each one is recorded in
//! a task execution table, so a task that succeeded once is never run again.
//!
//! # Architecture
//!
//! Groundwork follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, in-memory)
//!
//! # Modules
//!
//! - [`data_processor`]: Task descriptors, ordering, execution records and
//!   the job that runs them
//! - [`telemetry`]: Tracing subscriber setup for the host binary

pub mod data_processor;
pub mod telemetry;
