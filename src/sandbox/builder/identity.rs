//! Running the container as the host user.
//!
//! Files the agent writes into the bind-mounted worktree must be owned by
//! the host user, so the container runs with the host UID/GID. Many tools
//! break when that UID has no passwd entry, so the image's `/etc/passwd` and
//! `/etc/group` are read, reconciled, and mounted back over the originals.

use crate::error::Result;
use crate::sandbox::{HostIdentity, Mount};
use std::path::Path;

/// Name given to a synthesized user or group.
pub const AGENT_USER: &str = "agent";

/// Reads files out of a container image without starting the agent.
pub trait ImageFileReader {
    fn read_image_file(&self, image: &str, path: &str) -> Result<String>;
}

/// A reconciled passwd or group file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub content: String,
    /// User or group name the identity resolves to.
    pub name: String,
    /// Whether a line was appended.
    pub added: bool,
}

/// UID/GID of the current process, or 1000/1000 where there is none.
pub fn host_identity() -> HostIdentity {
    #[cfg(unix)]
    {
        // SAFETY: getuid/getgid cannot fail and touch no memory.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        HostIdentity { uid, gid }
    }
    #[cfg(not(unix))]
    {
        HostIdentity::FALLBACK
    }
}

/// Ensure `passwd` has an entry for `uid`.
///
/// An existing entry is reused unchanged. Otherwise exactly one line,
/// `agent:x:<uid>:<gid>:agent:/home/agent:/bin/sh`, is appended, or replaces
/// an `agent` entry the image already has under another UID.
pub fn reconcile_passwd(passwd: &str, identity: HostIdentity) -> Reconciled {
    if let Some(name) = find_entry(passwd, identity.uid) {
        return Reconciled {
            content: passwd.to_string(),
            name,
            added: false,
        };
    }
    let line = format!(
        "{user}:x:{}:{}:{user}:/home/{user}:/bin/sh",
        identity.uid,
        identity.gid,
        user = AGENT_USER
    );
    Reconciled {
        content: put_agent_line(passwd, &line),
        name: AGENT_USER.to_string(),
        added: true,
    }
}

/// Ensure `group` has an entry for `gid`, adding `agent:x:<gid>:agent`
/// when missing.
pub fn reconcile_group(group: &str, identity: HostIdentity) -> Reconciled {
    if let Some(name) = find_entry(group, identity.gid) {
        return Reconciled {
            content: group.to_string(),
            name,
            added: false,
        };
    }
    let line = format!("{user}:x:{}:{user}", identity.gid, user = AGENT_USER);
    Reconciled {
        content: put_agent_line(group, &line),
        name: AGENT_USER.to_string(),
        added: true,
    }
}

/// Read the image's passwd/group, reconcile them and write the results into
/// `sandbox_dir`. Returns the read-only mounts over `/etc/passwd` and `/etc/group`.
///
/// If the image cannot be read, a minimal file with `root` plus the agent
/// entry is used instead.
pub fn prepare_identity_files(
    reader: &dyn ImageFileReader,
    image: &str,
    identity: HostIdentity,
    sandbox_dir: &Path,
) -> Result<Vec<Mount>> {
    let passwd = read_or_minimal(reader, image, "/etc/passwd", "root:x:0:0:root:/root:/bin/sh\n");
    let group = read_or_minimal(reader, image, "/etc/group", "root:x:0:\n");

    let passwd = reconcile_passwd(&passwd, identity);
    let group = reconcile_group(&group, identity);
    tracing::debug!(
        uid = identity.uid,
        gid = identity.gid,
        user = %passwd.name,
        group = %group.name,
        "container identity"
    );

    let passwd_path = sandbox_dir.join("passwd");
    let group_path = sandbox_dir.join("group");
    crate::fs::atomic_write_file(&passwd_path, &passwd.content)?;
    crate::fs::atomic_write_file(&group_path, &group.content)?;

    Ok(vec![
        Mount::ro(passwd_path, "/etc/passwd"),
        Mount::ro(group_path, "/etc/group"),
    ])
}

fn read_or_minimal(reader: &dyn ImageFileReader, image: &str, path: &str, minimal: &str) -> String {
    match reader.read_image_file(image, path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("could not read {} from image '{}': {}", path, image, e);
            minimal.to_string()
        }
    }
}

/// Name of the first `name:x:<id>:...` line whose third field is `id`.
fn find_entry(content: &str, id: u32) -> Option<String> {
    let id = id.to_string();
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let _password = fields.next()?;
            (fields.next()? == id).then(|| name.to_string())
        })
}

/// Replace the existing `agent` entry with `line`, or append it.
fn put_agent_line(content: &str, line: &str) -> String {
    let is_agent = |l: &str| l.split(':').next() == Some(AGENT_USER);
    if !content.lines().any(is_agent) {
        return append_line(content, line);
    }
    let mut out = String::with_capacity(content.len() + line.len());
    for existing in content.lines() {
        out.push_str(if is_agent(existing) { line } else { existing });
        out.push('\n');
    }
    out
}

fn append_line(content: &str, line: &str) -> String {
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out
}
