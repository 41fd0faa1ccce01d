//! Configuration enums, defaults and shared validators.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Which container runtime to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Docker if it is really Docker, otherwise Podman.
    #[default]
    Auto,
    Docker,
    Podman,
}

static ENV_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid env name regex"));

/// Whether `name` is a usable environment variable name.
pub fn is_valid_env_name(name: &str) -> bool {
    ENV_NAME.is_match(name)
}

// ============================================================================
// Default value functions
// ============================================================================

pub(crate) fn default_workflow() -> String {
    crate::task::DEFAULT_WORKFLOW.to_string()
}

pub(crate) fn default_command_timeout_seconds() -> u64 {
    300
}

pub(crate) fn default_detect_timeout_seconds() -> u64 {
    20
}

pub(crate) fn default_remote() -> String {
    "origin".to_string()
}
