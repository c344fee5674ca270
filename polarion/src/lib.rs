pub mod api;
pub mod client;
pub mod config;
pub mod params;
pub mod publish;
pub mod types;
pub mod workflow;

pub use api::{PolarionApi, PolarionError, PolarionResult};
pub use client::{cancellable, PolarionClient};
pub use config::{PolarionConfig, DEFAULT_CONNECT_TIMEOUT, REST_API_PATH};
pub use params::BuildEnv;
pub use publish::{resolve_results, PublishOutcome, PublishedRun, ResultFiles, ResultsPublisher};
pub use types::NewTestRun;
pub use workflow::{WorkflowTrigger, WORKFLOW_STEP_NAME};

pub mod prelude {
    pub use crate::api::*;
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::params::*;
    pub use crate::publish::*;
    pub use crate::types::NewTestRun;
    pub use crate::workflow::*;
}
