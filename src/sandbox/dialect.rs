//! How Docker and Podman spell a `ContainerSpec`.
//!
//! The two CLIs agree on almost everything. They differ in how a host
//! identity is applied and how bind mounts are labelled, and in what their
//! `info` output looks like.

use super::{BackendKind, ContainerSpec, HostIdentity, Mount, WORKSPACE_MOUNT};

pub trait Dialect {
    const KIND: BackendKind;

    /// Arguments that make the container run as `identity`.
    fn user_args(identity: HostIdentity) -> Vec<String>;

    /// The `-v` value for `mount`.
    fn volume(mount: &Mount) -> String;

    /// Whether `info --format '{{json .}}'` output came from this runtime.
    fn is_genuine(info: &serde_json::Value) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Docker;

#[derive(Debug, Clone, Copy, Default)]
pub struct Podman;

impl Dialect for Docker {
    const KIND: BackendKind = BackendKind::Docker;

    fn user_args(identity: HostIdentity) -> Vec<String> {
        vec![
            "--user".to_string(),
            format!("{}:{}", identity.uid, identity.gid),
        ]
    }

    fn volume(mount: &Mount) -> String {
        let base = format!("{}:{}", mount.host.display(), mount.container);
        if mount.is_read_only() {
            format!("{}:ro", base)
        } else {
            base
        }
    }

    /// Docker reports `ServerVersion` at the top level. Podman's Docker
    /// shim answers with Podman's own layout, which nests under `host`.
    fn is_genuine(info: &serde_json::Value) -> bool {
        info.get("ServerVersion").is_some() && info.get("host").is_none()
    }
}

impl Dialect for Podman {
    const KIND: BackendKind = BackendKind::Podman;

    /// Rootless Podman maps the host user into the container with `keep-id`.
    fn user_args(identity: HostIdentity) -> Vec<String> {
        vec![
            "--userns=keep-id".to_string(),
            "--user".to_string(),
            format!("{}:{}", identity.uid, identity.gid),
        ]
    }

    /// Mounts carry the shared SELinux label `z`.
    fn volume(mount: &Mount) -> String {
        let options = if mount.is_read_only() { "ro,z" } else { "z" };
        format!("{}:{}:{}", mount.host.display(), mount.container, options)
    }

    fn is_genuine(info: &serde_json::Value) -> bool {
        info.get("host").is_some() && info.get("version").is_some()
    }
}

/// Flags shared by `create` and `run`, followed by the image and its arguments.
fn container_args<D: Dialect>(name: &str, spec: &ContainerSpec, args: &[String]) -> Vec<String> {
    let mut out = vec!["--name".to_string(), name.to_string()];
    out.extend(D::user_args(spec.user));
    out.push("-w".to_string());
    out.push(spec.workdir.clone());
    for mount in &spec.mounts {
        out.push("-v".to_string());
        out.push(D::volume(mount));
    }
    for var in &spec.env {
        out.push("-e".to_string());
        out.push(var.to_string());
    }
    out.push("--entrypoint".to_string());
    out.push(spec.entrypoint.clone());
    out.push(spec.image.clone());
    out.extend(args.iter().cloned());
    out
}

pub(super) fn create_args<D: Dialect>(spec: &ContainerSpec) -> Vec<String> {
    let mut out = vec!["create".to_string()];
    out.extend(container_args::<D>(&spec.name, spec, &spec.args));
    out
}

/// `run --rm -it` for an attached run of `spec` under a different name and argv.
pub(super) fn interactive_run_args<D: Dialect>(
    name: &str,
    spec: &ContainerSpec,
    args: &[String],
) -> Vec<String> {
    let mut out = vec!["run".to_string(), "--rm".to_string(), "-it".to_string()];
    out.extend(container_args::<D>(name, spec, args));
    out
}

pub(super) fn shell_args<D: Dialect>(
    name: &str,
    image: &str,
    user: HostIdentity,
    worktree: &std::path::Path,
) -> Vec<String> {
    let mut out = vec![
        "run".to_string(),
        "--rm".to_string(),
        "-it".to_string(),
        "--name".to_string(),
        name.to_string(),
    ];
    out.extend(D::user_args(user));
    out.push("-w".to_string());
    out.push(WORKSPACE_MOUNT.to_string());
    out.push("-v".to_string());
    out.push(D::volume(&Mount::rw(worktree, WORKSPACE_MOUNT)));
    out.push("--entrypoint".to_string());
    out.push("/bin/sh".to_string());
    out.push(image.to_string());
    out
}

pub(super) fn read_file_args(image: &str, path: &str) -> Vec<String> {
    ["run", "--rm", "--entrypoint", "cat", image, path]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub(super) fn info_args() -> Vec<String> {
    vec![
        "info".to_string(),
        "--format".to_string(),
        "{{json .}}".to_string(),
    ]
}

/// Whether a failed stop/remove only means the container is already gone.
pub(super) fn is_absent_container(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such container") || stderr.contains("no container with name or id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::EnvVar;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "rover-task-7-2".to_string(),
            image: "ghcr.io/endorhq/rover/agent:latest".to_string(),
            user: HostIdentity { uid: 501, gid: 20 },
            mounts: vec![
                Mount::rw("/repo/.rover/tasks/7/workspace", "/workspace"),
                Mount::ro("/repo/.rover/tasks/7/description.json", "/task/description.json"),
            ],
            env: vec![EnvVar::inherit("ANTHROPIC_API_KEY"), EnvVar::set("FOO", "bar")],
            workdir: "/workspace".to_string(),
            entrypoint: "/entrypoint.sh".to_string(),
            args: vec!["--task-id".to_string(), "7".to_string()],
        }
    }

    #[test]
    fn test_docker_create_args() {
        assert_eq!(
            create_args::<Docker>(&spec()),
            vec![
                "create",
                "--name",
                "rover-task-7-2",
                "--user",
                "501:20",
                "-w",
                "/workspace",
                "-v",
                "/repo/.rover/tasks/7/workspace:/workspace",
                "-v",
                "/repo/.rover/tasks/7/description.json:/task/description.json:ro",
                "-e",
                "ANTHROPIC_API_KEY",
                "-e",
                "FOO=bar",
                "--entrypoint",
                "/entrypoint.sh",
                "ghcr.io/endorhq/rover/agent:latest",
                "--task-id",
                "7",
            ]
        );
    }

    #[test]
    fn test_podman_flags() {
        let args = create_args::<Podman>(&spec());
        assert_eq!(&args[3..6], &["--userns=keep-id", "--user", "501:20"]);
        assert!(args.contains(&"/repo/.rover/tasks/7/workspace:/workspace:z".to_string()));
        assert!(args.contains(
            &"/repo/.rover/tasks/7/description.json:/task/description.json:ro,z".to_string()
        ));
    }

    #[test]
    fn test_env_order_is_preserved() {
        let mut spec = spec();
        spec.env.push(EnvVar::set("ANTHROPIC_API_KEY", "override"));
        let args = create_args::<Docker>(&spec);
        let env: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-e")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(env, vec!["ANTHROPIC_API_KEY", "FOO=bar", "ANTHROPIC_API_KEY=override"]);
    }

    #[test]
    fn test_interactive_and_shell_args() {
        let args = interactive_run_args::<Docker>("rover-task-7-2-ab12cd", &spec(), &[]);
        assert_eq!(&args[..5], &["run", "--rm", "-it", "--name", "rover-task-7-2-ab12cd"]);
        assert_eq!(args.last().unwrap(), "ghcr.io/endorhq/rover/agent:latest");

        let args = shell_args::<Docker>(
            "rover-shell-7-ab12cd",
            "img",
            HostIdentity::FALLBACK,
            std::path::Path::new("/repo/.rover/tasks/7/workspace"),
        );
        assert!(args.contains(&"/repo/.rover/tasks/7/workspace:/workspace".to_string()));
        assert_eq!(&args[args.len() - 3..], &["--entrypoint", "/bin/sh", "img"]);
    }

    #[test]
    fn test_genuine_backend_detection() {
        let docker = serde_json::json!({"ServerVersion": "27.1.1", "Driver": "overlay2"});
        let podman = serde_json::json!({"host": {"arch": "arm64"}, "version": {"Version": "5.2.0"}});

        assert!(Docker::is_genuine(&docker));
        assert!(!Docker::is_genuine(&podman));
        assert!(Podman::is_genuine(&podman));
        assert!(!Podman::is_genuine(&docker));
    }

    #[test]
    fn test_absent_container_messages() {
        assert!(is_absent_container("Error response from daemon: No such container: x"));
        assert!(is_absent_container("Error: no container with name or ID \"x\" found"));
        assert!(!is_absent_container("permission denied"));
    }
}
