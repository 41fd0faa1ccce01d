//! Turning a task iteration into a `ContainerSpec`.
//!
//! The builder is where everything the sandbox needs is decided: which image,
//! which host identity, which files get mounted where, which variables are
//! set, and what the entrypoint is told. Backends only translate the result
//! into CLI flags.
//!
//! Mount order is fixed, and pre-context flags follow their mounts:
//!
//! 1. worktree (rw) at `/workspace`
//! 2. iteration directory (rw) at `/output`
//! 3. agent credentials
//! 4. `/entrypoint.sh`, `/workflow.yml`, `/inputs.json`, `/task/description.json` (ro)
//! 5. `/init-script.sh` (ro), when configured and present
//! 6. reconciled `/etc/passwd` and `/etc/group` (ro)
//! 7. `/__pre_context_<i>__.json` (ro), one per earlier iteration

mod entrypoint;
mod env;
mod identity;
mod image;

pub use entrypoint::{BUILTIN_SWE_WORKFLOW, ENTRYPOINT_SCRIPT, RunInputs, check_workflow};
pub use env::{layer_env, load_env_file, parse_env_file};
pub use identity::{
    AGENT_USER, ImageFileReader, Reconciled, host_identity, prepare_identity_files,
    reconcile_group, reconcile_passwd,
};
pub use image::{
    DEFAULT_IMAGE, IMAGE_ENV_VAR, ImageChoice, ImageSource, image_override_from_env, resolve_image,
};

use super::{
    ContainerSpec, EnvVar, HostIdentity, Mount, OUTPUT_MOUNT, STATUS_FILE_PATH, WORKSPACE_MOUNT,
    sandbox_name,
};
use crate::agent::{self, AgentKind};
use crate::config::ProjectConfig;
use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use crate::git_worktree::ensure_within_project_root;
use crate::iteration::{Iteration, IterationStore};
use crate::task::Task;
use std::path::{Path, PathBuf};

/// Host-side directory (inside the iteration directory) for generated files.
pub const SANDBOX_DIR_NAME: &str = "sandbox";

const ENTRYPOINT_PATH: &str = "/entrypoint.sh";
const WORKFLOW_PATH: &str = "/workflow.yml";
const INPUTS_PATH: &str = "/inputs.json";
const TASK_DESCRIPTION_PATH: &str = "/task/description.json";
const INIT_SCRIPT_PATH: &str = "/init-script.sh";

/// Container path of the `index`th pre-context file.
pub fn pre_context_path(index: usize) -> String {
    format!("/__pre_context_{}__.json", index)
}

/// How the Claude OAuth token is obtained.
#[derive(Debug, Clone)]
enum OauthSource {
    Host,
    Fixed(Option<String>),
}

/// Builds the `ContainerSpec` for one task iteration.
pub struct ContainerSpecBuilder<'a> {
    ctx: &'a ProjectContext,
    config: &'a ProjectConfig,
    reader: &'a dyn ImageFileReader,
    identity: HostIdentity,
    home: PathBuf,
    image_override: Option<String>,
    oauth: OauthSource,
    verbose: bool,
}

impl<'a> ContainerSpecBuilder<'a> {
    /// A builder using the host's identity, home directory and image override.
    pub fn new(
        ctx: &'a ProjectContext,
        config: &'a ProjectConfig,
        reader: &'a dyn ImageFileReader,
    ) -> Result<Self> {
        Ok(Self {
            ctx,
            config,
            reader,
            identity: host_identity(),
            home: agent::host_home()?,
            image_override: image_override_from_env(),
            oauth: OauthSource::Host,
            verbose: false,
        })
    }

    /// A builder that ignores the host environment: credentials come from
    /// `home` only and no image override applies.
    pub fn with_home(
        ctx: &'a ProjectContext,
        config: &'a ProjectConfig,
        reader: &'a dyn ImageFileReader,
        home: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ctx,
            config,
            reader,
            identity: host_identity(),
            home: home.into(),
            image_override: None,
            oauth: OauthSource::Fixed(None),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn identity(mut self, identity: HostIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn image_override(mut self, image: Option<String>) -> Self {
        self.image_override = image;
        self
    }

    /// Use `token` instead of looking up Claude OAuth credentials on the host.
    pub fn oauth_token(mut self, token: Option<String>) -> Self {
        self.oauth = OauthSource::Fixed(token);
        self
    }

    /// The image this task would run, with a warning for non-default images.
    pub fn resolve_image(&self, task: &Task) -> ImageChoice {
        let choice = resolve_image(
            self.image_override.as_deref(),
            task.record.agent_image.as_deref(),
            self.config.image.as_deref(),
        );
        if !choice.is_default() {
            tracing::warn!(
                "using custom agent image '{}' ({:?}); it must be compatible with {}",
                choice.image,
                choice.source,
                DEFAULT_IMAGE
            );
        }
        choice
    }

    /// Build the spec for `iteration` of `task`, writing the generated
    /// support files under the iteration's `sandbox/` directory.
    pub fn build(&self, task: &Task, iteration: &Iteration) -> Result<ContainerSpec> {
        let worktree = task.worktree().ok_or_else(|| {
            RoverError::UserError(format!("task {} has no workspace", task.id()))
        })?;
        let worktree = ensure_within_project_root(&self.ctx.project_root, worktree)?;
        if !worktree.is_dir() {
            return Err(RoverError::Worktree(format!(
                "workspace '{}' for task {} does not exist",
                worktree.display(),
                task.id()
            )));
        }

        let agent = task.record.agent.unwrap_or(self.config.agent);
        let image = self.resolve_image(task);

        let iteration_dir = self.ctx.iteration_dir(task.id(), iteration.number);
        let sandbox_dir = iteration_dir.join(SANDBOX_DIR_NAME);
        std::fs::create_dir_all(&sandbox_dir).map_err(|e| {
            RoverError::Save(format!(
                "failed to create sandbox directory '{}': {}",
                sandbox_dir.display(),
                e
            ))
        })?;

        let mut mounts = vec![
            Mount::rw(worktree, WORKSPACE_MOUNT),
            Mount::rw(iteration_dir, OUTPUT_MOUNT),
        ];
        mounts.extend(self.credential_mounts(agent, &sandbox_dir)?);

        mounts.push(Mount::ro(entrypoint::write_entrypoint(&sandbox_dir)?, ENTRYPOINT_PATH));
        let workflow =
            entrypoint::resolve_workflow(self.ctx, &task.record.workflow_name, &sandbox_dir)?;
        mounts.push(Mount::ro(workflow, WORKFLOW_PATH));
        let inputs = entrypoint::write_inputs(&sandbox_dir, &RunInputs::new(task, iteration))?;
        mounts.push(Mount::ro(inputs, INPUTS_PATH));
        mounts.push(Mount::ro(task.path(), TASK_DESCRIPTION_PATH));

        if let Some(script) = self.init_script() {
            mounts.push(Mount::ro(script, INIT_SCRIPT_PATH));
        }

        mounts.extend(prepare_identity_files(
            self.reader,
            &image.image,
            self.identity,
            &sandbox_dir,
        )?);

        let pre_context_mounts = self.pre_context_mounts(task.id(), iteration.number, &sandbox_dir)?;
        let pre_context_paths: Vec<String> =
            pre_context_mounts.iter().map(|m| m.container.clone()).collect();
        mounts.extend(pre_context_mounts);

        let env = self.environment(agent)?;
        let args = self.entrypoint_args(agent, task.id(), &pre_context_paths);

        Ok(ContainerSpec {
            name: sandbox_name(task.id(), iteration.number),
            image: image.image,
            user: self.identity,
            mounts,
            env,
            workdir: WORKSPACE_MOUNT.to_string(),
            entrypoint: ENTRYPOINT_PATH.to_string(),
            args,
        })
    }

    fn credential_mounts(&self, agent: AgentKind, sandbox_dir: &Path) -> Result<Vec<Mount>> {
        match &self.oauth {
            OauthSource::Host => agent.credential_mounts(&self.home, sandbox_dir),
            OauthSource::Fixed(token) => {
                agent.credential_mounts_with(&self.home, sandbox_dir, token.clone())
            }
        }
    }

    fn init_script(&self) -> Option<PathBuf> {
        let configured = self.config.init_script.as_deref()?;
        let path = self.ctx.project_root.join(configured);
        if path.is_file() {
            Some(path)
        } else {
            tracing::warn!("init script '{}' not found, skipping", path.display());
            None
        }
    }

    fn environment(&self, agent: AgentKind) -> Result<Vec<EnvVar>> {
        let env_file = match &self.config.env_file {
            Some(file) => load_env_file(&self.ctx.project_root.join(file))?,
            None => Vec::new(),
        };
        Ok(layer_env(agent.default_env(), &self.config.env, env_file))
    }

    /// Write one JSON file per earlier iteration and mount them in order.
    fn pre_context_mounts(&self, task_id: u64, current: u32, sandbox_dir: &Path) -> Result<Vec<Mount>> {
        let contexts = IterationStore::new(self.ctx, task_id).pre_contexts(current)?;
        let mut mounts = Vec::with_capacity(contexts.len());
        for (index, context) in contexts.iter().enumerate() {
            let host = sandbox_dir.join(format!("pre-context-{}.json", index));
            crate::fs::atomic_write_json(&host, context)?;
            mounts.push(Mount::ro(host, pre_context_path(index)));
        }
        Ok(mounts)
    }

    fn entrypoint_args(&self, agent: AgentKind, task_id: u64, pre_contexts: &[String]) -> Vec<String> {
        let mut args = vec![
            "--agent-tool".to_string(),
            agent.to_string(),
            "--task-id".to_string(),
            task_id.to_string(),
            "--status-file".to_string(),
            STATUS_FILE_PATH.to_string(),
            "--output".to_string(),
            OUTPUT_MOUNT.to_string(),
            "--inputs-json".to_string(),
            INPUTS_PATH.to_string(),
        ];
        if self.verbose {
            args.push("-v".to_string());
        }
        for path in pre_contexts {
            args.push("--pre-context-file".to_string());
            args.push(path.clone());
        }
        args
    }
}
