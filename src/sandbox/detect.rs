//! Choosing a container backend.

use super::builder::ImageFileReader;
use super::{DockerSandbox, PodmanSandbox, SandboxManager};
use crate::config::{BackendPreference, SandboxConfig};
use crate::error::{Result, RoverError};
use std::time::Duration;

/// A sandbox manager that can also read files out of images.
pub trait Backend: SandboxManager + ImageFileReader {
    fn manager(&self) -> &dyn SandboxManager;
    fn reader(&self) -> &dyn ImageFileReader;
}

impl<T: SandboxManager + ImageFileReader> Backend for T {
    fn manager(&self) -> &dyn SandboxManager {
        self
    }

    fn reader(&self) -> &dyn ImageFileReader {
        self
    }
}

#[derive(Debug, Clone)]
pub struct DetectOptions {
    pub docker_program: String,
    pub podman_program: String,
    pub command_timeout: Duration,
    pub detect_timeout: Duration,
}

impl DetectOptions {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            docker_program: "docker".to_string(),
            podman_program: "podman".to_string(),
            command_timeout: Duration::from_secs(config.command_timeout_seconds),
            detect_timeout: Duration::from_secs(config.detect_timeout_seconds),
        }
    }

    fn docker(&self) -> DockerSandbox {
        DockerSandbox::new(&self.docker_program, self.command_timeout, self.detect_timeout)
    }

    fn podman(&self) -> PodmanSandbox {
        PodmanSandbox::new(&self.podman_program, self.command_timeout, self.detect_timeout)
    }
}

/// The backend `preference` asks for, verified to be what it claims.
///
/// `auto` tries Docker first, then Podman. A `docker` binary that turns out
/// to be Podman's compatibility shim does not count as Docker.
pub fn detect_backend(preference: BackendPreference, opts: &DetectOptions) -> Result<Box<dyn Backend>> {
    match preference {
        BackendPreference::Docker => {
            let docker = opts.docker();
            if docker.is_backend_available() {
                return Ok(Box::new(docker));
            }
            Err(RoverError::BackendUnavailable(format!(
                "Docker is not available ('{}' is missing, not running, or is another runtime). \
                 Start Docker or set sandbox.backend in .rover/config.yaml",
                opts.docker_program
            )))
        }
        BackendPreference::Podman => {
            let podman = opts.podman();
            if podman.is_backend_available() {
                return Ok(Box::new(podman));
            }
            Err(RoverError::BackendUnavailable(format!(
                "Podman is not available ('{}' is missing or not running). \
                 Start Podman or set sandbox.backend in .rover/config.yaml",
                opts.podman_program
            )))
        }
        BackendPreference::Auto => {
            let docker = opts.docker();
            if docker.is_backend_available() {
                tracing::info!("using docker backend");
                return Ok(Box::new(docker));
            }
            let podman = opts.podman();
            if podman.is_backend_available() {
                tracing::info!("using podman backend");
                return Ok(Box::new(podman));
            }
            Err(RoverError::BackendUnavailable(
                "neither Docker nor Podman is available. Install and start one of them".to_string(),
            ))
        }
    }
}

/// Detect the backend configured for a project.
pub fn open_manager(config: &SandboxConfig) -> Result<Box<dyn Backend>> {
    detect_backend(config.backend, &DetectOptions::from_config(config))
}
