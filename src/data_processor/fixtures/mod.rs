//! Ready-made fixture implementations.

mod sql;

pub use sql::{SqlFixture, SqlFixtureError};
