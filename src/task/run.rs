use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::profile::Toolchain;
use crate::request::inputs::OutputLocation;
use crate::task::command::{copy_command, list_download, StepCommand, DOWNLOAD_DIR};
use crate::task::script::SCRIPT_NAME;
use crate::task::{Step, TaskError};

/// Mount point of the working directory inside the container
static CONTAINER_WORK_DIR: &str = "/work";

/// Run the fetch step then the copy step on this host
///
/// Returns the number of download directory entries that were copied. The copy step never runs
/// if the fetch step fails.
pub async fn run_local(wd: &Path, tools: &Toolchain, threaded: bool, fetch: &StepCommand, output: &OutputLocation) -> Result<usize, TaskError> {
    run_step(Step::Fetch, fetch, wd).await?;

    let sources = downloaded(wd)?;
    prepare_output(output)?;
    let copy = copy_command(tools, threaded, &sources, output);
    run_step(Step::Copy, &copy, wd).await?;

    Ok(sources.len())
}

/// Run the rendered task script in a container
///
/// Returns the number of download directory entries the script copied.
pub async fn run_container(wd: &Path, tools: &Toolchain, image: &str, output: &OutputLocation) -> Result<usize, TaskError> {
    prepare_output(output)?;
    let docker = docker_command(tools, wd, image, output);
    run_step(Step::Container, &docker, wd).await?;

    Ok(downloaded(wd)?.len())
}

/// `docker run` for the task script, with the task directory (and a local output) mounted
pub fn docker_command(tools: &Toolchain, wd: &Path, image: &str, output: &OutputLocation) -> StepCommand {
    let (program, leading) = match tools.container_tool.split_first() {
        Some((program, leading)) => (program.clone(), leading.to_vec()),
        None => ("docker".to_string(), Vec::new()),
    };
    let mut args = leading;
    args.extend([
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        format!("{}:{}", wd.display(), CONTAINER_WORK_DIR),
        "-w".to_string(),
        CONTAINER_WORK_DIR.to_string(),
    ]);
    if let OutputLocation::Local(dir) = output {
        args.push("-v".to_string());
        args.push(format!("{}:{}", dir.display(), dir.display()));
    }
    args.push(image.to_string());
    args.push("bash".to_string());
    args.push(SCRIPT_NAME.to_string());

    StepCommand { program, args }
}

/// Run one step to completion, forwarding its output to the log
pub async fn run_step(step: Step, command: &StepCommand, cwd: &Path) -> Result<(), TaskError> {
    info!("Running {} step", step);
    info!("{}", command.display());

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| TaskError::SpawnError { step, source })?;

    let stdout = child.stdout.take().map(|out| tokio::spawn(forward(BufReader::new(out), step, "stdout")));
    let stderr = child.stderr.take().map(|err| tokio::spawn(forward(BufReader::new(err), step, "stderr")));

    let status = child.wait().await.map_err(|source| TaskError::SpawnError { step, source })?;
    for handle in [stdout, stderr].into_iter().flatten() {
        let _ = handle.await;
    }

    check_status(step, status)
}

async fn forward<R: AsyncBufRead + Unpin>(reader: R, step: Step, stream: &'static str) {
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!("[{} {}] {}", step, stream, line);
    }
}

fn check_status(step: Step, status: ExitStatus) -> Result<(), TaskError> {
    match status.success() {
        true => {
            info!("{} step finished", step);
            Ok(())
        }
        false => {
            warn!("{} step failed: {}", step, status);
            Err(TaskError::StepFailed { step, code: status.code() })
        }
    }
}

/// Entries of the download directory; an empty or missing directory has nothing to copy
fn downloaded(wd: &Path) -> Result<Vec<PathBuf>, TaskError> {
    let dir = wd.join(DOWNLOAD_DIR);
    match list_download(wd) {
        Ok(entries) if !entries.is_empty() => {
            info!("Found {} entries in {}", entries.len(), dir.display());
            Ok(entries)
        }
        Ok(_) => Err(TaskError::NothingToCopy(dir)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(TaskError::NothingToCopy(dir)),
        Err(err) => Err(TaskError::StageError(err)),
    }
}

/// A local destination directory must exist before copying into it
fn prepare_output(output: &OutputLocation) -> Result<(), TaskError> {
    if let OutputLocation::Local(dir) = output {
        if !dir.exists() {
            info!("Creating output directory {}", dir.display());
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
