//! Container environment layering.
//!
//! Layers, in order: agent defaults, project `env` entries, then the
//! project's env file. Nothing is de-duplicated; the runtime applies the
//! last occurrence of each name, which is what lets later layers override.

use crate::config::is_valid_env_name;
use crate::error::{Result, RoverError};
use crate::sandbox::EnvVar;
use std::path::Path;

/// Concatenate the layers in precedence order.
pub fn layer_env(agent_defaults: Vec<EnvVar>, project: &[String], env_file: Vec<EnvVar>) -> Vec<EnvVar> {
    let mut env = agent_defaults;
    env.extend(project.iter().map(|entry| EnvVar::parse(entry)));
    env.extend(env_file);
    env
}

/// Load an env file, or nothing (with a warning) when it does not exist.
pub fn load_env_file(path: &Path) -> Result<Vec<EnvVar>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("env file '{}' not found, skipping", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(RoverError::Load(format!("env file '{}': {}", path.display(), e)));
        }
    };
    parse_env_file(&content).map_err(|e| match e {
        RoverError::Validation(msg) => {
            RoverError::Validation(format!("env file '{}': {}", path.display(), msg))
        }
        other => other,
    })
}

/// Parse dotenv-style content.
///
/// Supports blank lines, `#` comments, an optional `export ` prefix, and
/// values wrapped in matching single or double quotes. A bare `NAME` passes
/// the host value through.
pub fn parse_env_file(content: &str) -> Result<Vec<EnvVar>> {
    let mut vars = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

        let (name, value) = match line.split_once('=') {
            Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
            None => (line, None),
        };
        if !is_valid_env_name(name) {
            return Err(RoverError::Validation(format!(
                "line {}: '{}' is not a valid variable name",
                index + 1,
                name
            )));
        }

        vars.push(match value {
            Some(value) => EnvVar::set(name, value),
            None => EnvVar::inherit(name),
        });
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
