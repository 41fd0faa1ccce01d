//! Backend-neutral container descriptor.
//!
//! `ContainerSpec` says what a sandbox needs (image, identity, mounts,
//! environment, entrypoint arguments) without saying how a runtime spells
//! it. Each backend dialect turns it into its own CLI flags.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountAccess {
    ReadOnly,
    ReadWrite,
}

/// A host path bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
    pub access: MountAccess,
}

impl Mount {
    pub fn ro(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            access: MountAccess::ReadOnly,
        }
    }

    pub fn rw(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            access: MountAccess::ReadWrite,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.access == MountAccess::ReadOnly
    }
}

/// One container environment entry.
///
/// Order matters: runtimes apply the last occurrence of a name, so entries
/// are never de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvVar {
    /// Pass the host's value through (`-e NAME`).
    Inherit(String),
    /// Set an explicit value (`-e NAME=value`).
    Set(String, String),
}

impl EnvVar {
    pub fn inherit(name: &str) -> Self {
        EnvVar::Inherit(name.to_string())
    }

    pub fn set(name: &str, value: &str) -> Self {
        EnvVar::Set(name.to_string(), value.to_string())
    }

    /// Parse a `NAME` or `NAME=value` entry.
    pub fn parse(entry: &str) -> Self {
        match entry.split_once('=') {
            Some((name, value)) => EnvVar::Set(name.to_string(), value.to_string()),
            None => EnvVar::Inherit(entry.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EnvVar::Inherit(name) | EnvVar::Set(name, _) => name,
        }
    }
}

impl fmt::Display for EnvVar {
    /// The `-e` argument form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvVar::Inherit(name) => f.write_str(name),
            EnvVar::Set(name, value) => write!(f, "{}={}", name, value),
        }
    }
}

/// Host UID/GID the container process runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl HostIdentity {
    /// Used when the host has no POSIX identity.
    pub const FALLBACK: HostIdentity = HostIdentity {
        uid: 1000,
        gid: 1000,
    };
}

/// Everything needed to create one sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub user: HostIdentity,
    pub mounts: Vec<Mount>,
    pub env: Vec<EnvVar>,
    pub workdir: String,
    pub entrypoint: String,
    /// Arguments passed to the entrypoint.
    pub args: Vec<String>,
}

impl ContainerSpec {
    /// Host directory mounted at `/workspace`, if any.
    pub fn workspace(&self) -> Option<&Mount> {
        self.mounts.iter().find(|m| m.container == super::WORKSPACE_MOUNT)
    }
}
