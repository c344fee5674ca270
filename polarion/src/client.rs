use crate::api::{PolarionApi, PolarionError, PolarionResult};
use crate::config::PolarionConfig;
use crate::types::{NewTestRun, ResourceList, SingleResource, WorkflowActionRequest};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const XUNIT_IMPORT_ACTION: &str = "importXUnitTestResults";

/// REST client for a single Polarion server and token.
///
/// The REST base and the `Authorization` header are derived once in
/// [`PolarionClient::new`] and never change afterwards.
pub struct PolarionClient {
    client: reqwest::Client,
    config: PolarionConfig,
    rest_base: Url,
    authorization: String,
}

impl PolarionClient {
    pub fn new(config: PolarionConfig) -> PolarionResult<Self> {
        config
            .validate()
            .map_err(|message| PolarionError::InvalidConfig { message })?;

        let rest_base =
            Url::parse(&config.rest_base_url()).map_err(|e| PolarionError::InvalidConfig {
                message: format!("Invalid base URL '{}': {}", config.base_url, e),
            })?;

        if rest_base.cannot_be_a_base() {
            return Err(PolarionError::InvalidConfig {
                message: format!("Base URL '{}' cannot hold a path", config.base_url),
            });
        }

        if rest_base.query().is_some() || rest_base.fragment().is_some() {
            return Err(PolarionError::InvalidConfig {
                message: format!(
                    "Base URL '{}' must not carry a query or fragment",
                    config.base_url
                ),
            });
        }

        // Only connection establishment is bounded; slow imports may take a while.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| PolarionError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let authorization = config.authorization();

        Ok(Self {
            client,
            config,
            rest_base,
            authorization,
        })
    }

    pub fn config(&self) -> &PolarionConfig {
        &self.config
    }

    pub fn rest_base_url(&self) -> &str {
        self.rest_base.as_str()
    }

    /// Appends `segments` to the REST base, percent-encoding each one.
    /// Empty, `.` and `..` segments are rejected before any request is built.
    fn endpoint(&self, segments: &[&str]) -> PolarionResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(PolarionError::InvalidIdentifier {
                value: bad.to_string(),
            });
        }

        let mut url = self.rest_base.clone();
        url.path_segments_mut()
            .map_err(|_| PolarionError::InvalidConfig {
                message: format!("Base URL '{}' cannot hold a path", self.rest_base),
            })?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("-> {} {}", method, url);
        self.client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.authorization.as_str())
    }

    /// Sends the request and returns the body if the status is exactly `expected`.
    async fn execute(&self, request: RequestBuilder, expected: StatusCode) -> PolarionResult<String> {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let elapsed_ms = start.elapsed().as_millis();

        if status != expected {
            error!(
                "Polarion rejected request: expected {}, got {} ({}ms)",
                expected.as_u16(),
                status.as_u16(),
                elapsed_ms
            );
            return Err(PolarionError::Api {
                status: status.as_u16(),
                elapsed_ms,
                body,
            });
        }

        debug!("<- {} ({}ms)", status.as_u16(), elapsed_ms);
        Ok(body)
    }

    fn parse<T: DeserializeOwned>(body: &str) -> PolarionResult<T> {
        Ok(serde_json::from_str(body)?)
    }
}

#[async_trait]
impl PolarionApi for PolarionClient {
    async fn verify_connection(&self) -> PolarionResult<()> {
        let url = self.endpoint(&["projects"])?;
        self.execute(self.request(Method::GET, url), StatusCode::OK)
            .await?;
        info!("Connection to {} verified", self.rest_base);
        Ok(())
    }

    async fn check_project(&self, project_id: &str) -> PolarionResult<()> {
        let url = self.endpoint(&["projects", project_id])?;
        self.execute(self.request(Method::GET, url), StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn check_work_item(&self, project_id: &str, work_item_id: &str) -> PolarionResult<()> {
        let url = self.endpoint(&["projects", project_id, "workitems", work_item_id])?;
        self.execute(self.request(Method::GET, url), StatusCode::OK)
            .await?;
        Ok(())
    }

    async fn list_projects(&self) -> PolarionResult<Vec<String>> {
        let url = self.endpoint(&["projects"])?;
        let body = self
            .execute(self.request(Method::GET, url), StatusCode::OK)
            .await?;

        let projects: ResourceList = Self::parse(&body)?;
        let ids: Vec<String> = projects.data.into_iter().map(|p| p.id).collect();

        info!("Retrieved {} projects", ids.len());
        Ok(ids)
    }

    async fn create_test_run(
        &self,
        project_id: &str,
        test_run: &NewTestRun,
    ) -> PolarionResult<String> {
        let test_run_id = test_run.generate_test_run_id();
        debug!("Creating test run {} in project {}", test_run_id, project_id);

        let url = self.endpoint(&["projects", project_id, "testruns"])?;
        let request = self
            .request(Method::POST, url)
            .json(&test_run.request_body(&test_run_id));
        let body = self.execute(request, StatusCode::CREATED).await?;

        let created: ResourceList = Self::parse(&body)?;
        created
            .data
            .into_iter()
            .next()
            .map(|run| run.id)
            .ok_or(PolarionError::MissingField {
                field: "data[0].id",
            })
    }

    async fn publish_results(
        &self,
        file: &Path,
        project_id: &str,
        test_run_id: &str,
    ) -> PolarionResult<String> {
        let results = tokio::fs::File::open(file)
            .await
            .map_err(|source| PolarionError::Io {
                path: file.to_path_buf(),
                source,
            })?;

        let url = self.endpoint(&[
            "projects",
            project_id,
            "testruns",
            test_run_id,
            "actions",
            XUNIT_IMPORT_ACTION,
        ])?;
        let request = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(results);
        let body = self.execute(request, StatusCode::ACCEPTED).await?;

        let job: SingleResource = Self::parse(&body)?;
        Ok(job.data.id)
    }

    async fn update_work_item_workflow(
        &self,
        project_id: &str,
        work_item_id: &str,
        workflow_action: &str,
    ) -> PolarionResult<()> {
        let mut url = self.endpoint(&["projects", project_id, "workitems", work_item_id])?;
        url.query_pairs_mut()
            .append_pair("workflowAction", workflow_action);

        let request = self
            .request(Method::PATCH, url)
            .json(&WorkflowActionRequest::new(project_id, work_item_id));
        self.execute(request, StatusCode::NO_CONTENT).await?;
        Ok(())
    }
}

/// Runs `operation` until it finishes or `signal` fires, whichever comes first.
///
/// A fired signal drops the in-flight request and yields [`PolarionError::Cancelled`].
pub async fn cancellable<F, S, T>(operation: F, signal: S) -> PolarionResult<T>
where
    F: Future<Output = PolarionResult<T>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = operation => result,
        _ = signal => {
            warn!("Operation interrupted");
            Err(PolarionError::Cancelled)
        }
    }
}
