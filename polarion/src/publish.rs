//! Uploading an xUnit results file into a freshly created test run.

use crate::api::{PolarionApi, PolarionError, PolarionResult};
use crate::params::BuildEnv;
use crate::types::NewTestRun;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Files matched by a results pattern, in lexical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultFiles {
    NoFilesMatched,
    Single(PathBuf),
    /// Only `used` is uploaded.
    MultipleMatchesFirstUsed {
        used: PathBuf,
        ignored: Vec<PathBuf>,
    },
}

impl ResultFiles {
    pub fn selected(&self) -> Option<&Path> {
        match self {
            ResultFiles::NoFilesMatched => None,
            ResultFiles::Single(path) => Some(path),
            ResultFiles::MultipleMatchesFirstUsed { used, .. } => Some(used),
        }
    }

    pub fn ignored(&self) -> &[PathBuf] {
        match self {
            ResultFiles::MultipleMatchesFirstUsed { ignored, .. } => ignored,
            _ => &[],
        }
    }
}

/// Resolves a comma-separated list of glob includes against `workspace`.
///
/// Relative includes are anchored at the workspace root; only regular files
/// count as matches.
pub fn resolve_results(workspace: &Path, pattern: &str) -> PolarionResult<ResultFiles> {
    let root = glob::Pattern::escape(&workspace.to_string_lossy());
    let mut matches = BTreeSet::new();

    for include in pattern.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let full = if Path::new(include).is_absolute() {
            include.to_string()
        } else {
            format!("{}/{}", root.trim_end_matches('/'), include)
        };

        let entries = glob::glob(&full).map_err(|e| PolarionError::InvalidPattern {
            pattern: include.to_string(),
            message: e.to_string(),
        })?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    matches.insert(path);
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {}", e.path().display(), e.error()),
            }
        }
    }

    let mut matches = matches.into_iter();
    Ok(match matches.next() {
        None => ResultFiles::NoFilesMatched,
        Some(used) => {
            let ignored: Vec<PathBuf> = matches.collect();
            if ignored.is_empty() {
                ResultFiles::Single(used)
            } else {
                ResultFiles::MultipleMatchesFirstUsed { used, ignored }
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The pattern matched nothing; no request was sent.
    NoFilesMatched,
    Published(PublishedRun),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRun {
    pub project_id: String,
    /// Server id including the `project/` prefix.
    pub test_run_id: String,
    pub job_id: String,
    pub file: PathBuf,
    pub ignored_files: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl PublishedRun {
    /// `"{test_run_id}###{job_id}"`
    pub fn composite_id(&self) -> String {
        format!("{}###{}", self.test_run_id, self.job_id)
    }

    pub fn short_test_run_id(&self) -> &str {
        strip_project(&self.project_id, &self.test_run_id)
    }

    pub fn job_report_url(&self, server_url: &str) -> String {
        format!(
            "{}/job-report?jobId={}",
            server_url.trim_end_matches('/'),
            self.job_id
        )
    }

    pub fn test_run_url(&self, server_url: &str) -> String {
        format!(
            "{}/redirect/project/{}/testrun?id={}",
            server_url.trim_end_matches('/'),
            self.project_id,
            self.short_test_run_id()
        )
    }
}

fn strip_project<'a>(project_id: &str, test_run_id: &'a str) -> &'a str {
    test_run_id
        .strip_prefix(project_id)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(test_run_id)
}

/// Creates a test run and imports the first matching results file into it.
#[derive(Debug, Clone)]
pub struct ResultsPublisher {
    pub project_id: String,
    pub test_run: NewTestRun,
    pub results_pattern: String,
}

impl ResultsPublisher {
    pub fn new(
        project_id: impl Into<String>,
        test_run: NewTestRun,
        results_pattern: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            test_run,
            results_pattern: results_pattern.into(),
        }
    }

    /// Expands variables in the results pattern, then creates the test run
    /// and uploads one file.
    ///
    /// A failed upload leaves the created test run on the server.
    pub async fn publish(
        &self,
        api: &dyn PolarionApi,
        workspace: &Path,
        env: &BuildEnv,
    ) -> PolarionResult<PublishOutcome> {
        let start = Instant::now();
        info!(
            "Starting test results upload to Polarion project - {}",
            self.project_id
        );

        let pattern = env.expand(&self.results_pattern);
        let (file, ignored_files) = match resolve_results(workspace, &pattern)? {
            ResultFiles::NoFilesMatched => {
                warn!("No test results matched '{}' in {}", pattern, workspace.display());
                return Ok(PublishOutcome::NoFilesMatched);
            }
            ResultFiles::Single(file) => (file, Vec::new()),
            ResultFiles::MultipleMatchesFirstUsed { used, ignored } => {
                warn!(
                    "'{}' matched {} files; uploading {} only",
                    pattern,
                    ignored.len() + 1,
                    used.display()
                );
                (used, ignored)
            }
        };

        let test_run_id = api
            .create_test_run(&self.project_id, &self.test_run)
            .await?;
        info!(
            "TestResults are being uploaded to testRun with ID {}.",
            test_run_id
        );

        let job_id = api
            .publish_results(
                &file,
                &self.project_id,
                strip_project(&self.project_id, &test_run_id),
            )
            .await?;

        let elapsed = start.elapsed();
        info!(
            "TestResults upload job submitted with JobID {}. Took {}ms",
            job_id,
            elapsed.as_millis()
        );

        Ok(PublishOutcome::Published(PublishedRun {
            project_id: self.project_id.clone(),
            test_run_id,
            job_id,
            file,
            ignored_files,
            elapsed,
        }))
    }
}
