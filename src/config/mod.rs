//! Project configuration for rover.
//!
//! This module defines `ProjectConfig`, the contents of `.rover/config.yaml`.
//! Parsing is forward compatible (unknown fields are ignored), every field
//! has a default, and values are validated after parsing. A project without
//! a config file runs on defaults.

mod model;
mod operations;
pub mod types;


pub use model::{GitConfig, ProjectConfig, SandboxConfig};
pub use types::{BackendPreference, is_valid_env_name};
