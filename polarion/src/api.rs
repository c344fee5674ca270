use crate::types::NewTestRun;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolarionError {
    #[error("<- {status} ({elapsed_ms}ms)\n<- {body}")]
    Api {
        status: u16,
        elapsed_ms: u128,
        body: String,
    },

    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed response: missing {field}")]
    MissingField { field: &'static str },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid identifier '{value}': must be a non-empty path segment other than '.' or '..'")]
    InvalidIdentifier { value: String },

    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Parameter '{name}' is not set")]
    UnresolvedParameter { name: String },

    #[error("Interrupted")]
    Cancelled,
}

impl PolarionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PolarionError::Cancelled)
    }

    /// Status code of a rejected response, if this is an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            PolarionError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type PolarionResult<T> = Result<T, PolarionError>;

/// The REST operations the reporter invokes against a Polarion server.
///
/// Every operation accepts exactly one status code as success.
#[async_trait]
pub trait PolarionApi: Send + Sync {
    /// `GET /projects`, expecting 200.
    async fn verify_connection(&self) -> PolarionResult<()>;

    /// `GET /projects/{project}`, expecting 200.
    async fn check_project(&self, project_id: &str) -> PolarionResult<()>;

    /// `GET /projects/{project}/workitems/{item}`, expecting 200.
    async fn check_work_item(&self, project_id: &str, work_item_id: &str) -> PolarionResult<()>;

    /// Project ids in the order the server lists them.
    async fn list_projects(&self) -> PolarionResult<Vec<String>>;

    /// Creates an open test run and returns the server id (`project/run`).
    async fn create_test_run(
        &self,
        project_id: &str,
        test_run: &NewTestRun,
    ) -> PolarionResult<String>;

    /// Submits an xUnit import job for `file` and returns the job id.
    async fn publish_results(
        &self,
        file: &Path,
        project_id: &str,
        test_run_id: &str,
    ) -> PolarionResult<String>;

    /// Triggers `workflow_action` on the work item, expecting 204.
    async fn update_work_item_workflow(
        &self,
        project_id: &str,
        work_item_id: &str,
        workflow_action: &str,
    ) -> PolarionResult<()>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and answers from canned values.
    #[derive(Default)]
    pub struct RecordingApi {
        pub calls: Mutex<Vec<String>>,
        pub test_run_id: String,
        pub job_id: String,
        pub fail_upload: bool,
        pub fail_workflow_status: Option<u16>,
    }

    impl RecordingApi {
        pub fn new(test_run_id: &str, job_id: &str) -> Self {
            Self {
                test_run_id: test_run_id.to_string(),
                job_id: job_id.to_string(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl PolarionApi for RecordingApi {
        async fn verify_connection(&self) -> PolarionResult<()> {
            self.record("verify_connection".to_string());
            Ok(())
        }

        async fn check_project(&self, project_id: &str) -> PolarionResult<()> {
            self.record(format!("check_project {project_id}"));
            Ok(())
        }

        async fn check_work_item(&self, project_id: &str, work_item_id: &str) -> PolarionResult<()> {
            self.record(format!("check_work_item {project_id} {work_item_id}"));
            Ok(())
        }

        async fn list_projects(&self) -> PolarionResult<Vec<String>> {
            self.record("list_projects".to_string());
            Ok(vec![])
        }

        async fn create_test_run(
            &self,
            project_id: &str,
            test_run: &NewTestRun,
        ) -> PolarionResult<String> {
            self.record(format!("create_test_run {project_id} {}", test_run.title));
            Ok(self.test_run_id.clone())
        }

        async fn publish_results(
            &self,
            file: &Path,
            project_id: &str,
            test_run_id: &str,
        ) -> PolarionResult<String> {
            let name = file.file_name().unwrap().to_string_lossy().to_string();
            self.record(format!("publish_results {name} {project_id} {test_run_id}"));
            if self.fail_upload {
                return Err(PolarionError::Api {
                    status: 500,
                    elapsed_ms: 1,
                    body: "import failed".to_string(),
                });
            }
            Ok(self.job_id.clone())
        }

        async fn update_work_item_workflow(
            &self,
            project_id: &str,
            work_item_id: &str,
            workflow_action: &str,
        ) -> PolarionResult<()> {
            self.record(format!(
                "update_work_item_workflow {project_id} {work_item_id} {workflow_action}"
            ));
            match self.fail_workflow_status {
                Some(status) => Err(PolarionError::Api {
                    status,
                    elapsed_ms: 1,
                    body: "{\"error\":\"invalid action\"}".to_string(),
                }),
                None => Ok(()),
            }
        }
    }
}
