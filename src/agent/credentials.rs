//! Credential files and the writable Claude credentials file.

use crate::error::{Result, RoverError};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::CREDENTIALS_MOUNT_ROOT;

/// Keychain service Claude stores its OAuth credentials under on macOS.
const CLAUDE_KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

const CLAUDE_CREDENTIALS_FILE: &str = "claude-credentials.json";

/// A credential file an agent CLI reads from `$HOME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialFile {
    /// Path relative to `$HOME`.
    pub host_rel: &'static str,
    pub required: bool,
}

impl CredentialFile {
    pub const fn required(host_rel: &'static str) -> Self {
        Self {
            host_rel,
            required: true,
        }
    }

    pub const fn optional(host_rel: &'static str) -> Self {
        Self {
            host_rel,
            required: false,
        }
    }

    pub fn container_path(&self) -> String {
        format!("{}/{}", CREDENTIALS_MOUNT_ROOT, self.host_rel)
    }
}

/// Claude OAuth credentials from the macOS keychain, then `CLAUDE_CODE_OAUTH_TOKEN`.
///
/// The keychain entry is already a credentials JSON document; the variable
/// is a bare token.
pub fn claude_oauth_token() -> Option<String> {
    if cfg!(target_os = "macos")
        && let Some(json) = keychain_lookup(CLAUDE_KEYCHAIN_SERVICE)
    {
        return Some(json);
    }
    std::env::var("CLAUDE_CODE_OAUTH_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
}

fn keychain_lookup(service: &str) -> Option<String> {
    let output = Command::new("security")
        .args(["find-generic-password", "-s", service, "-w"])
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(service, "keychain entry not found");
        return None;
    }
    let secret = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!secret.is_empty()).then_some(secret)
}

/// Assemble a private, writable copy of Claude's OAuth credentials.
///
/// The agent refreshes tokens in place, so it gets a copy in `sandbox_dir`
/// (mode 0600) rather than the host file. Sources, in order: the host's
/// `~/.claude/.credentials.json`, then `oauth` (keychain JSON or a bare
/// token). Returns `None` when there is nothing to assemble.
pub(super) fn writable_claude_credentials(
    host_file: &Path,
    sandbox_dir: &Path,
    oauth: Option<&str>,
) -> Result<Option<PathBuf>> {
    let content = if host_file.is_file() {
        std::fs::read_to_string(host_file).map_err(|e| {
            RoverError::Load(format!("Claude credentials '{}': {}", host_file.display(), e))
        })?
    } else if let Some(oauth) = oauth {
        if oauth.trim_start().starts_with('{') {
            oauth.to_string()
        } else {
            let doc = serde_json::json!({
                "claudeAiOauth": {
                    "accessToken": oauth.trim(),
                    "scopes": ["user:inference"],
                }
            });
            serde_json::to_string_pretty(&doc).map_err(|e| {
                RoverError::Save(format!("Claude credentials: {}", e))
            })?
        }
    } else {
        return Ok(None);
    };

    let path = sandbox_dir.join(CLAUDE_CREDENTIALS_FILE);
    crate::fs::atomic_write_private(&path, &content)?;
    Ok(Some(path))
}
