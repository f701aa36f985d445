//! Step definitions for data processor behaviour tests.

pub mod given;
pub mod then;
