//! Build parameters supplied by the CI context.
//!
//! Values can reference variables as `$NAME` or `${NAME}`; a work item id
//! starting with `$` is looked up as a whole.

use crate::api::{PolarionError, PolarionResult};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

pub const PARAMETER_SENTINEL: char = '$';

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_.]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("VARIABLE_RE regex should compile")
});

/// Snapshot of the variables visible to a build step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    vars: HashMap<String, String>,
}

impl BuildEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Replaces `$NAME` and `${NAME}` with their values. Unknown references stay as written.
    pub fn expand(&self, text: &str) -> String {
        VARIABLE_RE
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.get(name) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Resolves a value that is either literal or `$NAME`.
    pub fn resolve(&self, value: &str) -> PolarionResult<String> {
        match value.strip_prefix(PARAMETER_SENTINEL) {
            Some(name) => self
                .get(name)
                .map(str::to_string)
                .ok_or_else(|| PolarionError::UnresolvedParameter {
                    name: name.to_string(),
                }),
            None => Ok(value.to_string()),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for BuildEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn env() -> BuildEnv {
        BuildEnv::new()
            .with_var("BUILD_TAG", "jenkins-smoke-42")
            .with_var("WORKSPACE", "/var/ci/ws")
    }

    #[test]
    fn test_resolve_literal_passes_through() {
        assert_eq!(env().resolve("WI-123").unwrap(), "WI-123");
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(env().resolve("$BUILD_TAG").unwrap(), "jenkins-smoke-42");
    }

    #[test]
    fn test_resolve_missing_reference() {
        let err = env().resolve("$NOPE").unwrap_err();
        assert!(matches!(err, PolarionError::UnresolvedParameter { name } if name == "NOPE"));
    }

    #[test]
    fn test_expand_both_forms() {
        assert_eq!(
            env().expand("${WORKSPACE}/reports/$BUILD_TAG-*.xml"),
            "/var/ci/ws/reports/jenkins-smoke-42-*.xml"
        );
    }

    #[test]
    fn test_expand_leaves_unknown_references() {
        assert_eq!(env().expand("out/$UNKNOWN/${ALSO}.xml"), "out/$UNKNOWN/${ALSO}.xml");
        assert_eq!(env().expand("**/*.xml"), "**/*.xml");
    }

    #[test]
    #[serial]
    fn test_from_process_sees_environment() {
        std::env::set_var("BUILD_TAG", "process-tag");
        let env = BuildEnv::from_process();
        assert_eq!(env.resolve("$BUILD_TAG").unwrap(), "process-tag");
        std::env::remove_var("BUILD_TAG");
    }
}
