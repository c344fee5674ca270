//! Read-only checks rendered as human-readable validation messages.

use polarion::{PolarionApi, PolarionError};
use std::fmt;

pub const SUCCESSFUL_CONNECTION: &str = "Successful Connection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ok(Option<String>),
    Error(String),
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok(_))
    }

    fn from_check(result: Result<(), PolarionError>, success: Option<String>) -> Self {
        match result {
            Ok(()) => Validation::Ok(success),
            Err(e) => Validation::Error(format!("Connection error : {}", e)),
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ok(Some(message)) => write!(f, "OK: {}", message),
            Validation::Ok(None) => write!(f, "OK"),
            Validation::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

pub async fn test_connection(api: &dyn PolarionApi) -> Validation {
    Validation::from_check(
        api.verify_connection().await,
        Some(SUCCESSFUL_CONNECTION.to_string()),
    )
}

pub async fn check_project(api: &dyn PolarionApi, project_id: &str) -> Validation {
    Validation::from_check(api.check_project(project_id).await, None)
}

pub async fn check_work_item(
    api: &dyn PolarionApi,
    project_id: &str,
    work_item_id: &str,
) -> Validation {
    Validation::from_check(api.check_work_item(project_id, work_item_id).await, None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectChoice {
    pub id: String,
    pub selected: bool,
}

impl fmt::Display for ProjectChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.selected { '*' } else { ' ' };
        write!(f, "{} {}", marker, self.id)
    }
}

pub fn project_choices(ids: Vec<String>, selected: Option<&str>) -> Vec<ProjectChoice> {
    ids.into_iter()
        .map(|id| ProjectChoice {
            selected: selected == Some(id.as_str()),
            id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_choices_marks_selection() {
        let choices = project_choices(
            vec!["P1".to_string(), "P2".to_string()],
            Some("P2"),
        );
        assert_eq!(
            choices,
            vec![
                ProjectChoice {
                    id: "P1".to_string(),
                    selected: false
                },
                ProjectChoice {
                    id: "P2".to_string(),
                    selected: true
                },
            ]
        );
        assert_eq!(choices[0].to_string(), "  P1");
        assert_eq!(choices[1].to_string(), "* P2");
    }

    #[test]
    fn test_validation_display() {
        assert_eq!(
            Validation::Ok(Some(SUCCESSFUL_CONNECTION.to_string())).to_string(),
            "OK: Successful Connection"
        );
        assert_eq!(Validation::Ok(None).to_string(), "OK");
        assert_eq!(
            Validation::Error("Connection error : boom".to_string()).to_string(),
            "ERROR: Connection error : boom"
        );
    }

    #[test]
    fn test_from_check_formats_api_error() {
        let validation = Validation::from_check(
            Err(PolarionError::Api {
                status: 404,
                elapsed_ms: 3,
                body: "not found".to_string(),
            }),
            None,
        );
        assert_eq!(
            validation,
            Validation::Error("Connection error : <- 404 (3ms)\n<- not found".to_string())
        );
        assert!(!validation.is_ok());
    }
}
