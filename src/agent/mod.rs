//! Agent collaborators.
//!
//! Rover does not talk to AI agents itself; the in-container runtime does.
//! What the host needs from each agent is small:
//!
//! - **Credentials**: which files under `$HOME` the agent CLI reads, and
//!   whether the run can proceed without them
//! - **Environment**: variables the agent reads, passed through from the host
//! - **Mounts**: how those credential files reach the container
//!
//! Credential files are mounted under `/.rover/credentials/`, mirroring their
//! path relative to `$HOME`; the runtime copies them into the agent's home.

use crate::error::{Result, RoverError};
use crate::sandbox::{EnvVar, Mount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod credentials;

pub use credentials::{CredentialFile, claude_oauth_token};

/// Container directory credential files are mounted under.
pub const CREDENTIALS_MOUNT_ROOT: &str = "/.rover/credentials";

/// Home directory of the agent user inside the container.
pub const AGENT_HOME: &str = "/home/agent";

/// Supported agent CLIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Claude,
    Codex,
    Gemini,
    Qwen,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Claude,
        AgentKind::Codex,
        AgentKind::Gemini,
        AgentKind::Qwen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Gemini => "gemini",
            AgentKind::Qwen => "qwen",
        }
    }

    /// Credential files the agent CLI reads, relative to `$HOME`.
    pub fn credential_files(&self) -> Vec<CredentialFile> {
        match self {
            AgentKind::Claude => vec![
                CredentialFile::required(".claude.json"),
                CredentialFile::optional(".claude/.credentials.json"),
            ],
            AgentKind::Codex => vec![
                CredentialFile::required(".codex/auth.json"),
                CredentialFile::optional(".codex/config.toml"),
            ],
            AgentKind::Gemini => vec![
                CredentialFile::required(".gemini/oauth_creds.json"),
                CredentialFile::optional(".gemini/settings.json"),
                CredentialFile::optional(".gemini/google_accounts.json"),
            ],
            AgentKind::Qwen => vec![
                CredentialFile::required(".qwen/oauth_creds.json"),
                CredentialFile::optional(".qwen/settings.json"),
            ],
        }
    }

    /// Variables every sandbox for this agent starts with.
    ///
    /// Pass-through entries come first so project configuration, appended
    /// later, can override any of them.
    pub fn default_env(&self) -> Vec<EnvVar> {
        let mut env = vec![EnvVar::set("HOME", AGENT_HOME)];
        let inherited: &[&str] = match self {
            AgentKind::Claude => &["ANTHROPIC_API_KEY", "CLAUDE_CODE_OAUTH_TOKEN"],
            AgentKind::Codex => &["OPENAI_API_KEY"],
            AgentKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY", "GOOGLE_CLOUD_PROJECT"],
            AgentKind::Qwen => &["DASHSCOPE_API_KEY", "OPENAI_API_KEY", "OPENAI_BASE_URL"],
        };
        env.extend(inherited.iter().map(|name| EnvVar::inherit(name)));
        env
    }

    /// Credential mounts for a run whose support files live in `sandbox_dir`.
    ///
    /// Missing required credentials only produce a warning: the agent may
    /// still authenticate through an API key variable.
    pub fn credential_mounts(&self, home: &Path, sandbox_dir: &Path) -> Result<Vec<Mount>> {
        let token = match self {
            AgentKind::Claude => claude_oauth_token(),
            _ => None,
        };
        self.credential_mounts_with(home, sandbox_dir, token)
    }

    /// `credential_mounts` with the Claude OAuth token lookup already done.
    pub fn credential_mounts_with(
        &self,
        home: &Path,
        sandbox_dir: &Path,
        oauth_token: Option<String>,
    ) -> Result<Vec<Mount>> {
        let mut mounts = Vec::new();
        for file in self.credential_files() {
            let host_path = home.join(file.host_rel);
            let container_path = file.container_path();

            if *self == AgentKind::Claude && file.host_rel == ".claude/.credentials.json" {
                if let Some(writable) =
                    credentials::writable_claude_credentials(&host_path, sandbox_dir, oauth_token.as_deref())?
                {
                    mounts.push(Mount::rw(writable, container_path));
                } else {
                    tracing::debug!("no Claude OAuth credentials found; relying on API key");
                }
                continue;
            }

            if host_path.is_file() {
                mounts.push(Mount::ro(host_path, container_path));
            } else if file.required {
                tracing::warn!(
                    agent = %self,
                    "credential file '{}' not found; the agent may fail to authenticate",
                    host_path.display()
                );
            }
        }
        Ok(mounts)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = RoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(AgentKind::Claude),
            "codex" => Ok(AgentKind::Codex),
            "gemini" => Ok(AgentKind::Gemini),
            "qwen" => Ok(AgentKind::Qwen),
            other => Err(RoverError::UserError(format!(
                "unknown agent '{}'. Supported agents: claude, codex, gemini, qwen",
                other
            ))),
        }
    }
}

/// The host user's home directory.
pub fn host_home() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| {
            RoverError::UserError(
                "cannot locate your home directory (HOME is not set)".to_string(),
            )
        })
}
