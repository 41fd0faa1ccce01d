//! Config loading and validation.

use super::model::ProjectConfig;
use super::types::is_valid_env_name;
use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use std::path::Path;

impl ProjectConfig {
    /// Load the project's config, falling back to defaults when the file is absent.
    pub fn load_for(ctx: &ProjectContext) -> Result<Self> {
        let path = ctx.config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no project config, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Load config from a YAML file.
    ///
    /// An unreadable or malformed file is a `Load` error; values that parse
    /// but make no sense are a `Validation` error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            RoverError::Load(format!("config file '{}': {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
            .map_err(|e| match e {
                RoverError::Load(msg) => RoverError::Load(format!("'{}': {}", path.display(), msg)),
                other => other,
            })
    }

    /// Parse config from a YAML string. Unknown fields are ignored.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: ProjectConfig = serde_yaml::from_str(yaml)
            .map_err(|e| RoverError::Load(format!("config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| RoverError::Save(format!("config YAML: {}", e)))
    }

    /// Validation rules:
    /// - timeouts must be positive
    /// - `env` entries must be `NAME` or `NAME=value` with a valid name
    /// - `workflow` and `git.remote` must be non-empty
    /// - `image`, when set, must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.sandbox.command_timeout_seconds == 0 {
            return Err(RoverError::Validation(
                "config: sandbox.command_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.sandbox.detect_timeout_seconds == 0 {
            return Err(RoverError::Validation(
                "config: sandbox.detect_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for entry in &self.env {
            let name = entry.split_once('=').map_or(entry.as_str(), |(name, _)| name);
            if !is_valid_env_name(name) {
                return Err(RoverError::Validation(format!(
                    "config: env entry '{}' is not NAME or NAME=value",
                    entry
                )));
            }
        }

        if self.workflow.trim().is_empty() {
            return Err(RoverError::Validation(
                "config: workflow must not be empty".to_string(),
            ));
        }
        if self.git.remote.trim().is_empty() {
            return Err(RoverError::Validation(
                "config: git.remote must not be empty".to_string(),
            ));
        }
        if self.image.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(RoverError::Validation(
                "config: image must not be empty when set".to_string(),
            ));
        }

        Ok(())
    }
}
