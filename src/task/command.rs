use std::fs;
use std::io;
use std::iter;
use std::path::{Path, PathBuf};

use crate::profile::Toolchain;
use crate::request::inputs::OutputLocation;
use crate::task::stage::StagedInputs;

/// Download directory of the fetch script, relative to the task directory
pub static DOWNLOAD_DIR: &str = "tmp_download";

/// A program and its arguments, run without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl StepCommand {
    pub fn argv(&self) -> Vec<String> {
        iter::once(self.program.clone()).chain(self.args.iter().cloned()).collect()
    }

    /// Shell-quoted command line, for logs and the rendered script
    pub fn display(&self) -> String {
        shell_words::join(self.argv())
    }
}

/// `python3 fetch.py --prefetch .. --ngc .. --cart .. [--manifest ..] [--n-files ..] --outdir .. --untar`
///
/// Absent optional inputs are left off the command line entirely.
pub fn fetch_command(tools: &Toolchain, staged: &StagedInputs, n_files: Option<u32>) -> StepCommand {
    let mut args = vec![
        tools.fetch_script.display().to_string(),
        "--prefetch".to_string(),
        tools.prefetch.display().to_string(),
        "--ngc".to_string(),
        staged.ngc.display().to_string(),
        "--cart".to_string(),
        staged.cart.display().to_string(),
    ];
    if let Some(manifest) = &staged.manifest {
        args.push("--manifest".to_string());
        args.push(manifest.display().to_string());
    }
    if let Some(n) = n_files {
        args.push("--n-files".to_string());
        args.push(n.to_string());
    }
    args.push("--outdir".to_string());
    args.push(DOWNLOAD_DIR.to_string());
    args.push("--untar".to_string());

    StepCommand { program: tools.python.display().to_string(), args }
}

/// `<copy tool> [-m] cp -r`, without sources or destination
pub fn copy_prefix(tools: &Toolchain, threaded: bool) -> StepCommand {
    let (program, leading) = match tools.copy_tool.split_first() {
        Some((program, leading)) => (program.clone(), leading.to_vec()),
        None => ("gsutil".to_string(), Vec::new()),
    };
    let mut args = leading;
    if threaded {
        args.push("-m".to_string());
    }
    args.push("cp".to_string());
    args.push("-r".to_string());

    StepCommand { program, args }
}

/// Copy every entry of the download directory to the output location
pub fn copy_command(tools: &Toolchain, threaded: bool, sources: &[PathBuf], output: &OutputLocation) -> StepCommand {
    let mut command = copy_prefix(tools, threaded);
    command.args.extend(sources.iter().map(|source| source.display().to_string()));
    command.args.push(output.to_string());
    command
}

/// Expand `tmp_download/*`: entries of the download directory, relative to the task directory
///
/// Hidden entries are skipped, as the shell glob in the rendered script skips them.
pub fn list_download(wd: &Path) -> Result<Vec<PathBuf>, io::Error> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(wd.join(DOWNLOAD_DIR))? {
        let name = entry?.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(Path::new(DOWNLOAD_DIR).join(name));
    }
    entries.sort();
    Ok(entries)
}
