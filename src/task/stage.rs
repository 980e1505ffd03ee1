use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::profile::{CredentialPath, Runtime};
use crate::request::inputs::WorkflowInputs;
use crate::task::command::DOWNLOAD_DIR;
use crate::WorkingDirectory;

/// Directory the task owns inside the caller's working directory
pub static TASK_DIR: &str = "dbgap-fetch";
/// Staging directory for file inputs, relative to the task directory
pub static INPUTS_DIR: &str = "inputs";

impl WorkingDirectory {
    /// The task's own subdirectory; staging, the script and downloads never touch anything else
    pub fn task_dir(&self) -> WorkingDirectory {
        WorkingDirectory { path: self.path.join(TASK_DIR) }
    }
}

/// File inputs after staging, as paths relative to the task directory
///
/// Relative paths resolve the same way for a local run (task directory as current directory)
/// and a container run (task directory mounted as the container's working directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInputs {
    pub cart: PathBuf,
    pub ngc: PathBuf,
    pub manifest: Option<PathBuf>,
}

/// Copy file inputs into the task directory
///
/// Leftovers of an earlier run (staged inputs and the download directory) are deleted first, so
/// stale downloads are never copied to the output location. A leftover directory holding one of
/// the file inputs is never deleted: staging fails instead.
pub fn stage(inputs: &WorkflowInputs, runtime: &Runtime, wd: &WorkingDirectory) -> Result<StagedInputs, io::Error> {
    let staging = wd.path.join(INPUTS_DIR);
    info!("Staging inputs in {}", staging.display());

    for stale in [&staging, &wd.path.join(DOWNLOAD_DIR)] {
        if stale.exists() {
            if let Some(input) = held_input(stale, inputs)? {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} holds input {}, refusing to remove it", stale.display(), input.display()),
                ));
            }
            warn!("{} already exists, files will be overwritten", stale.display());
            fs::remove_dir_all(stale)?;
        }
    }
    fs::create_dir_all(&staging)?;

    let cart = stage_file(&inputs.cart_file, &wd.path, Path::new("cart"))?;
    let ngc = match runtime.credential {
        CredentialPath::Input => stage_file(&inputs.ngc_file, &wd.path, Path::new("ngc"))?,
        CredentialPath::Fixed(name) => copy_to(&inputs.ngc_file, &wd.path, &Path::new(INPUTS_DIR).join(name))?,
    };
    let manifest = match &inputs.manifest_file {
        Some(manifest) => Some(stage_file(manifest, &wd.path, Path::new("manifest"))?),
        None => None,
    };

    Ok(StagedInputs { cart, ngc, manifest })
}

/// First file input that lives under `dir`
fn held_input(dir: &Path, inputs: &WorkflowInputs) -> Result<Option<PathBuf>, io::Error> {
    let dir = fs::canonicalize(dir)?;
    let files = [Some(&inputs.cart_file), Some(&inputs.ngc_file), inputs.manifest_file.as_ref()];
    for input in files.into_iter().flatten() {
        if fs::canonicalize(input)?.starts_with(&dir) {
            return Ok(Some(input.clone()));
        }
    }
    Ok(None)
}

/// Stage `source` under `inputs/<kind>/`, keeping its file name
fn stage_file(source: &Path, wd: &Path, kind: &Path) -> Result<PathBuf, io::Error> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file name", source.display()))
    })?;
    copy_to(source, wd, &Path::new(INPUTS_DIR).join(kind).join(name))
}

fn copy_to(source: &Path, wd: &Path, relative: &Path) -> Result<PathBuf, io::Error> {
    let target = wd.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Staging {} as {}", source.display(), relative.display());
    fs::copy(source, &target)?;
    Ok(relative.to_path_buf())
}
