//! The workflow entry point
//!
//! A workflow binds validated inputs to a single fetch task and finishes when the task finishes.
//! It declares no outputs: the fetched files in the output location are the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::profile::{Profile, Toolchain};
use crate::request::inputs::WorkflowInputs;
use crate::task::command::{copy_prefix, fetch_command};
use crate::task::run::{run_container, run_local};
use crate::task::script::TaskScript;
use crate::task::stage::stage;
use crate::task::Executor;
use crate::WorkingDirectory;

pub struct Workflow {
    pub profile: Profile,
    pub tools: Toolchain,
    pub executor: Executor,
    pub dry_run: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Inputs staged and the task script rendered, nothing executed
    DryRun { script: PathBuf },
    /// Both steps succeeded
    Completed { copied: usize },
}

impl Workflow {
    pub async fn run(&self, inputs: &WorkflowInputs, wd: &WorkingDirectory) -> Result<TaskOutcome> {
        let runtime = self.profile.runtime();
        let output = inputs.output()?;
        let disk_gb = runtime.disk_gb(inputs.disk_gb);

        info!("Running {} profile, image {}", self.profile, runtime.image);
        match disk_gb {
            Some(gb) => info!("Requesting {} GB scratch disk", gb),
            None => info!("No scratch disk requested, executor default applies"),
        }

        let task_wd = wd.task_dir();
        info!("Task directory {}", task_wd.path.display());
        let staged = stage(inputs, &runtime, &task_wd).context("Staging task inputs")?;
        let fetch = fetch_command(&self.tools, &staged, inputs.n_files);
        let copy = copy_prefix(&self.tools, runtime.threaded_copy);
        let script = TaskScript::render(self.profile, disk_gb, &fetch, &copy, &output)?
            .write(&task_wd.path)
            .context("Writing task script")?;

        if self.dry_run {
            info!("--dry-run set, not running task");
            return Ok(TaskOutcome::DryRun { script });
        }

        info!("Running task with {} executor", self.executor);
        let copied = match self.executor {
            Executor::Local => run_local(&task_wd.path, &self.tools, runtime.threaded_copy, &fetch, &output).await?,
            Executor::Docker => run_container(&task_wd.path, &self.tools, runtime.image, &output).await?,
        };
        info!("Copied {} entries to {}", copied, output);

        Ok(TaskOutcome::Completed { copied })
    }
}
