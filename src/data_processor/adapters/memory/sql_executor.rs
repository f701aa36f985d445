//! In-memory SQL executor that records scripts instead of running them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::data_processor::ports::{SqlExecutor, SqlExecutorError, SqlExecutorResult};

/// SQL executor double for tests and dry runs.
///
/// Executed scripts are recorded in order. Probe results are configured per
/// query text and default to `false`. Scripts containing a configured failure
/// marker are rejected.
#[derive(Debug, Clone, Default)]
pub struct InMemorySqlExecutor {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    executed: Vec<String>,
    flags: HashMap<String, bool>,
    failure_marker: Option<String>,
}

impl InMemorySqlExecutor {
    /// Creates an executor with no recorded scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result returned for `probe`.
    ///
    /// # Errors
    ///
    /// Returns [`SqlExecutorError::Connection`] when the lock is poisoned.
    pub fn set_flag(&self, probe: impl Into<String>, value: bool) -> SqlExecutorResult<()> {
        self.lock()?.flags.insert(probe.into(), value);
        Ok(())
    }

    /// Makes every script containing `marker` fail.
    ///
    /// # Errors
    ///
    /// Returns [`SqlExecutorError::Connection`] when the lock is poisoned.
    pub fn fail_scripts_containing(&self, marker: impl Into<String>) -> SqlExecutorResult<()> {
        self.lock()?.failure_marker = Some(marker.into());
        Ok(())
    }

    /// Returns every script executed so far, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SqlExecutorError::Connection`] when the lock is poisoned.
    pub fn executed_scripts(&self) -> SqlExecutorResult<Vec<String>> {
        Ok(self.lock()?.executed.clone())
    }

    fn lock(&self) -> SqlExecutorResult<MutexGuard<'_, RecordingState>> {
        self.state
            .lock()
            .map_err(|err| SqlExecutorError::connection(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl SqlExecutor for InMemorySqlExecutor {
    async fn execute_script(&self, script: &str) -> SqlExecutorResult<()> {
        let mut state = self.lock()?;
        let rejected_by = state
            .failure_marker
            .as_deref()
            .filter(|marker| script.contains(marker));
        if let Some(marker) = rejected_by {
            return Err(SqlExecutorError::statement(std::io::Error::other(format!(
                "script rejected: contains '{marker}'"
            ))));
        }
        state.executed.push(script.to_owned());
        Ok(())
    }

    async fn query_flag(&self, probe: &str) -> SqlExecutorResult<bool> {
        let state = self.lock()?;
        Ok(state.flags.get(probe).copied().unwrap_or(false))
    }
}
