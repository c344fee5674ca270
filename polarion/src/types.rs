use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Parameters for a test run the reporter creates before importing results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestRun {
    pub id_prefix: String,
    pub title: String,
    pub run_type: String,
    pub group_id: String,
}

impl NewTestRun {
    pub fn new(
        id_prefix: impl Into<String>,
        title: impl Into<String>,
        run_type: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            title: title.into(),
            run_type: run_type.into(),
            group_id: group_id.into(),
        }
    }

    /// `<prefix>-dd-MM-yyyy-HH-mm-ss-SS`, where `SS` is the millisecond
    /// field padded to at least two digits.
    ///
    /// Two ids generated within the same millisecond collide.
    pub fn test_run_id_at<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!(
            "{}-{}-{:02}",
            self.id_prefix,
            at.format("%d-%m-%Y-%H-%M-%S"),
            at.timestamp_subsec_millis()
        )
    }

    pub fn generate_test_run_id(&self) -> String {
        self.test_run_id_at(&Local::now())
    }

    pub(crate) fn request_body<'a>(&'a self, test_run_id: &'a str) -> TestRunsRequest<'a> {
        TestRunsRequest {
            data: vec![TestRunResource {
                resource_type: "testruns",
                attributes: TestRunAttributes {
                    group_id: &self.group_id,
                    id: test_run_id,
                    is_template: false,
                    keep_in_history: true,
                    status: "open",
                    title: &self.title,
                    run_type: &self.run_type,
                    use_report_from_template: true,
                },
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TestRunsRequest<'a> {
    pub data: Vec<TestRunResource<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestRunResource<'a> {
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub attributes: TestRunAttributes<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestRunAttributes<'a> {
    pub group_id: &'a str,
    pub id: &'a str,
    pub is_template: bool,
    pub keep_in_history: bool,
    pub status: &'static str,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub run_type: &'a str,
    pub use_report_from_template: bool,
}

/// PATCH envelope that carries only the work item identity; the transition
/// itself travels in the `workflowAction` query parameter.
#[derive(Debug, Serialize)]
pub(crate) struct WorkflowActionRequest {
    pub data: WorkItemResource,
}

#[derive(Debug, Serialize)]
pub(crate) struct WorkItemResource {
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub id: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowActionRequest {
    pub fn new(project_id: &str, work_item_id: &str) -> Self {
        Self {
            data: WorkItemResource {
                resource_type: "workitems",
                id: format!("{}/{}", project_id, work_item_id),
                attributes: serde_json::Map::new(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceId {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceList {
    pub data: Vec<ResourceId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SingleResource {
    pub data: ResourceId,
}
