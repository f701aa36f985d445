//! Application services for recording, running and orchestrating tasks.

mod job;
mod record_store;
mod runner;

pub use job::{DataProcessorJob, JobError, JobPhase, JobReport, RunnerOutcome};
pub use record_store::{TaskRecordError, TaskRecordResult, TaskRecordStore};
pub use runner::{RunContext, RunReport, TaskRunner, TaskRunnerError, TaskRunnerResult};
