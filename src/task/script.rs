use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::profile::Profile;
use crate::request::inputs::OutputLocation;
use crate::task::command::{StepCommand, DOWNLOAD_DIR};
use crate::task::TaskError;

/// Name of the rendered script in the task directory
pub static SCRIPT_NAME: &str = "task.sh";

/// The whole task as a bash script
///
/// The header declares the runtime (profile, image and disk). The command block runs the fetch
/// step then copies the download directory, stopping at the first failure.
pub struct TaskScript {
    pub content: String,
}

/// Rendering context for the runtime header
#[derive(Serialize)]
struct HeaderContext {
    time_now: String,
    profile: String,
    image: String,
    disk_gb: Option<u32>,
}

/// Rendering context for the command block
#[derive(Serialize)]
struct CommandContext {
    fetch: String,
    copy: String,
    download_dir: String,
    output: String,
}

impl TaskScript {
    pub fn render(profile: Profile, disk_gb: Option<u32>, fetch: &StepCommand, copy: &StepCommand, output: &OutputLocation) -> Result<TaskScript, TaskError> {
        let header = render_header(profile, disk_gb)?;
        let command = render_command(fetch, copy, output)?;
        Ok(TaskScript { content: header + &command })
    }

    pub fn write(&self, wd: &Path) -> Result<PathBuf, io::Error> {
        let path = wd.join(SCRIPT_NAME);
        info!("Writing task script to {}", path.display());
        fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// Render the runtime header using TinyTemplate
fn render_header(profile: Profile, disk_gb: Option<u32>) -> Result<String, TaskError> {
    /// included header template
    static HEADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/header.txt"));
    let context = HeaderContext {
        time_now: Utc::now().to_rfc3339(),
        profile: profile.to_string(),
        image: profile.runtime().image.to_string(),
        disk_gb,
    };
    render("header", HEADER, &context)
}

/// Render the fetch and copy commands using TinyTemplate
fn render_command(fetch: &StepCommand, copy: &StepCommand, output: &OutputLocation) -> Result<String, TaskError> {
    /// included command template
    static COMMAND: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/command.txt"));
    // the download glob stays unquoted so the shell expands it
    let context = CommandContext {
        fetch: fetch.display(),
        copy: copy.display(),
        download_dir: shell_words::quote(DOWNLOAD_DIR).into_owned(),
        output: shell_words::quote(&output.to_string()).into_owned(),
    };
    render("command", COMMAND, &context)
}

fn render<C: Serialize>(name: &str, template: &str, context: &C) -> Result<String, TaskError> {
    let mut tt = TinyTemplate::new();
    // shell text, not HTML
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template(name, template).map_err(|err| TaskError::RenderError(err.to_string()))?;
    tt.render(name, context).map_err(|err| TaskError::RenderError(err.to_string()))
}
