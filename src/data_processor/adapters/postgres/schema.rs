//! Diesel schema for task execution persistence.

diesel::table! {
    /// One row per attempt at running a fixture or seed.
    data_processor.task_executions (id) {
        /// Execution identifier.
        id -> Uuid,
        /// `fixture` or `seed`.
        #[max_length = 256]
        task_type -> Varchar,
        /// Descriptor name.
        #[max_length = 256]
        name -> Varchar,
        /// Start of the job run the attempt belongs to.
        run_start_time -> Timestamptz,
        /// When the action started.
        started_at -> Timestamptz,
        /// When the action finished.
        ended_at -> Nullable<Timestamptz>,
        /// Lifecycle state.
        #[max_length = 256]
        state -> Varchar,
        /// Failure diagnostics.
        error -> Nullable<Text>,
    }
}
