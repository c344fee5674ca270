pub mod config;
pub mod validation;

pub use config::{ReporterConfig, ReporterError, ReporterResult, DEFAULT_CONFIG_FILE, NO_CONNECTION};
pub use validation::{project_choices, ProjectChoice, Validation, SUCCESSFUL_CONNECTION};
