//! The fetch task: stage inputs, run the fetch script, copy the download directory
//!
//! Both steps run strictly in order. A failing step fails the task and nothing is retried or
//! rolled back; resubmission is left to whatever drives the workflow.

use std::fmt;
use std::io;
use std::path::PathBuf;

use clap::ValueEnum;

/// Build the argument vectors of the fetch and copy steps
pub mod command;
/// Copy file inputs into the working directory
pub mod stage;
/// Render the task as a shell script using TinyTemplate
pub mod script;
/// Run task steps as child processes
pub mod run;

/// Where the task steps execute
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Executor {
    /// Run the fetch and copy steps directly on this host
    Local,
    /// Run the rendered task script in the profile's container image
    Docker,
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Executor::Local => write!(f, "local"),
            Executor::Docker => write!(f, "docker"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Fetch,
    Copy,
    Container,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Step::Fetch => write!(f, "fetch"),
            Step::Copy => write!(f, "copy"),
            Step::Container => write!(f, "container"),
        }
    }
}

#[derive(Debug)]
pub enum TaskError {
    StageError(io::Error),
    RenderError(String),
    SpawnError { step: Step, source: io::Error },
    /// A step exited non-zero (`None` when killed by a signal)
    StepFailed { step: Step, code: Option<i32> },
    NothingToCopy(PathBuf),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskError::StageError(err) => write!(f, "can't stage task inputs: {}", err),
            TaskError::RenderError(err) => write!(f, "can't render task script: {}", err),
            TaskError::SpawnError { step, source } => write!(f, "can't start {} step: {}", step, source),
            TaskError::StepFailed { step, code: Some(code) } => {
                write!(f, "{} step failed with exit status {}", step, code)
            }
            TaskError::StepFailed { step, code: None } => {
                write!(f, "{} step was terminated by a signal", step)
            }
            TaskError::NothingToCopy(dir) => write!(f, "nothing to copy in {}", dir.display()),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::StageError(err) => Some(err),
            TaskError::SpawnError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for TaskError {
    fn from(err: io::Error) -> Self {
        TaskError::StageError(err)
    }
}
