//! Fixtures that apply a SQL script from the fixture root directory.
//!
//! By default the script is found by searching the fixture root recursively
//! for `<name>.sql`. An explicit path relative to the root can be given
//! instead. A fixture may also carry a probe query; when the probe returns
//! true the script is not run and the fixture counts as applied.

use crate::data_processor::{
    domain::{DeploymentEnvironment, Fixture, TaskActionError, TaskActionResult, TaskMetadata},
    ports::{SqlExecutor, SqlExecutorError},
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned while locating or applying a SQL fixture script.
#[derive(Debug, Error)]
pub enum SqlFixtureError {
    /// No fixture root directory was configured.
    #[error("fixture '{name}' needs a fixture root directory but none is configured")]
    MissingFixtureRoot {
        /// Fixture name.
        name: String,
    },

    /// No script matched the fixture.
    #[error("no script named '{file_name}' found under {root}")]
    ScriptNotFound {
        /// Expected file name.
        file_name: String,
        /// Directory searched.
        root: Utf8PathBuf,
    },

    /// More than one script matched the fixture.
    #[error("multiple scripts named '{file_name}' found under {root}: {}", join_paths(.matches))]
    AmbiguousScript {
        /// Expected file name.
        file_name: String,
        /// Directory searched.
        root: Utf8PathBuf,
        /// Matching paths relative to `root`.
        matches: Vec<Utf8PathBuf>,
    },

    /// The fixture root or script could not be read.
    #[error("failed to read {path}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The database rejected the script or probe.
    #[error(transparent)]
    Executor(#[from] SqlExecutorError),
}

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A fixture backed by a SQL script file.
pub struct SqlFixture<E: SqlExecutor> {
    metadata: TaskMetadata,
    executor: Arc<E>,
    fixture_root: Option<Utf8PathBuf>,
    environments: Vec<DeploymentEnvironment>,
    script_path: Option<Utf8PathBuf>,
    applied_probe: Option<String>,
}

impl<E: SqlExecutor> SqlFixture<E> {
    /// Creates a fixture named `name` that targets every non-production
    /// environment.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        executor: Arc<E>,
        fixture_root: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            metadata: TaskMetadata::new(name),
            executor,
            fixture_root,
            environments: DeploymentEnvironment::non_production(),
            script_path: None,
            applied_probe: None,
        }
    }

    /// Replaces the environments the fixture applies to.
    #[must_use]
    pub fn for_environments(
        mut self,
        environments: impl IntoIterator<Item = DeploymentEnvironment>,
    ) -> Self {
        self.environments = environments.into_iter().collect();
        self
    }

    /// Declares a dependency on another fixture.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.metadata = self.metadata.depends_on(name);
        self
    }

    /// Uses the script at `path`, relative to the fixture root, instead of
    /// searching for `<name>.sql`.
    #[must_use]
    pub fn with_script_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Skips the script when `probe` evaluates to true.
    #[must_use]
    pub fn skip_when(mut self, probe: impl Into<String>) -> Self {
        self.applied_probe = Some(probe.into());
        self
    }

    /// Returns the expected script file name.
    #[must_use]
    pub fn script_file_name(&self) -> String {
        format!("{}.sql", self.metadata.name())
    }

    /// Reads the script this fixture would run.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFixtureError`] when no fixture root is configured, or
    /// when the script is missing, ambiguous or unreadable.
    pub async fn load_script(&self) -> Result<String, SqlFixtureError> {
        let root = self
            .fixture_root
            .clone()
            .ok_or_else(|| SqlFixtureError::MissingFixtureRoot {
                name: self.metadata.name().to_owned(),
            })?;
        let explicit = self.script_path.clone();
        let file_name = self.script_file_name();

        tokio::task::spawn_blocking(move || read_script(&root, explicit.as_deref(), &file_name))
            .await
            .map_err(|err| SqlFixtureError::Io {
                path: Utf8PathBuf::new(),
                source: io::Error::other(err),
            })?
    }

    async fn apply_script(&self) -> Result<(), SqlFixtureError> {
        if let Some(probe) = self.applied_probe.as_deref() {
            if self.executor.query_flag(probe).await? {
                info!(fixture = self.metadata.name(), "fixture already applied, skipping script");
                return Ok(());
            }
        }

        let script = self.load_script().await?;
        debug!(fixture = self.metadata.name(), bytes = script.len(), "executing fixture script");
        self.executor.execute_script(&script).await?;
        Ok(())
    }
}

#[async_trait]
impl<E: SqlExecutor + 'static> Fixture for SqlFixture<E> {
    fn metadata(&self) -> TaskMetadata {
        self.metadata.clone()
    }

    fn environments(&self) -> Vec<DeploymentEnvironment> {
        self.environments.clone()
    }

    async fn apply(&self) -> TaskActionResult {
        self.apply_script().await.map_err(TaskActionError::failed)
    }
}

fn read_script(
    root: &Utf8Path,
    explicit: Option<&Utf8Path>,
    file_name: &str,
) -> Result<String, SqlFixtureError> {
    let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(|source| {
        SqlFixtureError::Io {
            path: root.to_owned(),
            source,
        }
    })?;

    let relative = match explicit {
        Some(path) => path.to_owned(),
        None => locate_unique(&dir, root, file_name)?,
    };

    dir.read_to_string(&relative)
        .map_err(|source| SqlFixtureError::Io {
            path: root.join(&relative),
            source,
        })
}

fn locate_unique(dir: &Dir, root: &Utf8Path, file_name: &str) -> Result<Utf8PathBuf, SqlFixtureError> {
    let mut matches = Vec::new();
    collect_matches(dir, Utf8Path::new(""), file_name, &mut matches).map_err(|source| {
        SqlFixtureError::Io {
            path: root.to_owned(),
            source,
        }
    })?;
    matches.sort();

    let mut found = matches.into_iter();
    match (found.next(), found.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(SqlFixtureError::ScriptNotFound {
            file_name: file_name.to_owned(),
            root: root.to_owned(),
        }),
        (Some(first), Some(second)) => Err(SqlFixtureError::AmbiguousScript {
            file_name: file_name.to_owned(),
            root: root.to_owned(),
            matches: [first, second].into_iter().chain(found).collect(),
        }),
    }
}

fn collect_matches(
    dir: &Dir,
    prefix: &Utf8Path,
    file_name: &str,
    matches: &mut Vec<Utf8PathBuf>,
) -> io::Result<()> {
    for item in dir.entries()? {
        let entry = item?;
        let entry_name = entry.file_name()?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let child = entry.open_dir()?;
            collect_matches(&child, &prefix.join(&entry_name), file_name, matches)?;
        } else if file_type.is_file() && entry_name == file_name {
            matches.push(prefix.join(entry_name));
        }
    }
    Ok(())
}
