//! Triggering a workflow action on a single work item.

use crate::api::{PolarionApi, PolarionResult};
use crate::params::BuildEnv;
use tracing::info;

pub const WORKFLOW_STEP_NAME: &str = "Polarion WorkItem Status Updater";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowTrigger {
    pub project_id: String,
    /// Literal id, or `$NAME` to read the id from a build variable.
    pub work_item_id: String,
    pub workflow_action: String,
}

impl WorkflowTrigger {
    pub fn new(
        project_id: impl Into<String>,
        work_item_id: impl Into<String>,
        workflow_action: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            work_item_id: work_item_id.into(),
            workflow_action: workflow_action.into(),
        }
    }

    pub fn resolve_work_item_id(&self, env: &BuildEnv) -> PolarionResult<String> {
        env.resolve(&self.work_item_id)
    }

    /// Resolves the work item id and triggers the action. The server decides
    /// whether the transition is valid.
    ///
    /// Returns the resolved work item id.
    pub async fn run(&self, api: &dyn PolarionApi, env: &BuildEnv) -> PolarionResult<String> {
        let work_item_id = self.resolve_work_item_id(env)?;
        info!(
            "{} - attempting to trigger workflow action({}) for workitem - {}",
            WORKFLOW_STEP_NAME, self.workflow_action, work_item_id
        );

        api.update_work_item_workflow(&self.project_id, &work_item_id, &self.workflow_action)
            .await?;

        info!(
            "{} - Trigger workflow action({}) for workitem - {} successful.",
            WORKFLOW_STEP_NAME, self.workflow_action, work_item_id
        );
        Ok(work_item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::RecordingApi;
    use crate::api::PolarionError;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_literal_work_item() {
        let api = RecordingApi::default();
        let trigger = WorkflowTrigger::new("Proj", "WI-123", "start_progress");

        let id = assert_ok!(trigger.run(&api, &BuildEnv::new()).await);
        assert_eq!(id, "WI-123");
        assert_eq!(
            api.calls(),
            vec!["update_work_item_workflow Proj WI-123 start_progress"]
        );
    }

    #[tokio::test]
    async fn test_work_item_from_variable() {
        let api = RecordingApi::default();
        let env = BuildEnv::new().with_var("BUILD_TAG", "WI-777");
        let trigger = WorkflowTrigger::new("Proj", "$BUILD_TAG", "resolve");

        let id = assert_ok!(trigger.run(&api, &env).await);
        assert_eq!(id, "WI-777");
        assert_eq!(api.calls(), vec!["update_work_item_workflow Proj WI-777 resolve"]);
    }

    #[tokio::test]
    async fn test_unset_variable_makes_no_call() {
        let api = RecordingApi::default();
        let trigger = WorkflowTrigger::new("Proj", "$MISSING", "resolve");

        let err = assert_err!(trigger.run(&api, &BuildEnv::new()).await);
        assert!(matches!(err, PolarionError::UnresolvedParameter { .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_transition_surfaces_api_error() {
        let api = RecordingApi {
            fail_workflow_status: Some(400),
            ..RecordingApi::default()
        };
        let trigger = WorkflowTrigger::new("Proj", "WI-1", "bogus");

        let err = assert_err!(trigger.run(&api, &BuildEnv::new()).await);
        match err {
            PolarionError::Api { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "{\"error\":\"invalid action\"}");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
