//! Config struct definitions and defaults.

use super::types::*;
use crate::agent::AgentKind;
use serde::{Deserialize, Serialize};

/// Contents of `.rover/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Agent image for this project (overrides the built-in default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Agent used when `rover task` is not given one.
    pub agent: AgentKind,

    /// Workflow used when `rover task` is not given one.
    #[serde(default = "default_workflow")]
    pub workflow: String,

    /// Extra container variables: `NAME` passes the host value, `NAME=value` sets one.
    pub env: Vec<String>,

    /// Env file, relative to the project root, loaded after `env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,

    /// Script, relative to the project root, run inside the sandbox before the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_script: Option<String>,

    pub sandbox: SandboxConfig,

    pub git: GitConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            image: None,
            agent: AgentKind::default(),
            workflow: default_workflow(),
            env: Vec::new(),
            env_file: None,
            init_script: None,
            sandbox: SandboxConfig::default(),
            git: GitConfig::default(),
        }
    }
}

/// Container runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub backend: BackendPreference,

    /// Upper bound for a single create/start/stop/remove/logs call.
    #[serde(default = "default_command_timeout_seconds")]
    pub command_timeout_seconds: u64,

    /// Upper bound for the backend detection probe.
    #[serde(default = "default_detect_timeout_seconds")]
    pub detect_timeout_seconds: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            command_timeout_seconds: default_command_timeout_seconds(),
            detect_timeout_seconds: default_detect_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Remote that `rover push` pushes task branches to.
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}
