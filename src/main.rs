use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use dbgap_fetch::profile::{Profile, Toolchain};
use dbgap_fetch::request::inputs::{read_inputs, InputFlags};
use dbgap_fetch::request::schema::load_schema;
use dbgap_fetch::task::Executor;
use dbgap_fetch::workflow::{TaskOutcome, Workflow};
use dbgap_fetch::WorkingDirectory;

/// Fetch dbGaP files listed in a cart with prefetch and copy them to an output location
#[derive(Parser, Debug)]
#[command(name = "dbgap-fetch", author, version, about, long_about = None)]
struct Args {
    /// JSON file of workflow inputs. Flags below replace values from this file
    #[arg(short, long)]
    inputs: Option<PathBuf>,
    /// Cart file listing the accessions to fetch
    #[arg(long)]
    cart: Option<PathBuf>,
    /// Credential (ngc) file for the dbGaP project
    #[arg(long)]
    ngc: Option<PathBuf>,
    /// Manifest refining the file selection
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Number of files to fetch
    #[arg(long)]
    n_files: Option<u32>,
    /// Destination URI (e.g. gs://bucket/prefix) or local directory
    #[arg(long)]
    output: Option<String>,
    /// Scratch disk to request, in GB
    #[arg(long)]
    disk_gb: Option<u32>,
    /// Workflow version to run
    #[arg(long, value_enum, default_value_t = Profile::Standard)]
    profile: Profile,
    /// Where to execute the task
    #[arg(long, value_enum, default_value_t = Executor::Local)]
    executor: Executor,
    /// Directory to stage inputs, render the task script and download into
    #[arg(short, long)]
    work_dir: PathBuf,
    /// Validate, stage and render the task without running it
    #[arg(long)]
    dry_run: bool,
    /// Python interpreter running the fetch script
    #[arg(long)]
    python: Option<PathBuf>,
    /// Path of the fetch script
    #[arg(long)]
    fetch_script: Option<PathBuf>,
    /// Path of the prefetch binary passed to the fetch script
    #[arg(long)]
    prefetch: Option<PathBuf>,
    /// Cloud storage copy tool, with any leading arguments
    #[arg(long)]
    copy_tool: Option<String>,
    /// Container engine for the docker executor, with any leading arguments
    #[arg(long)]
    container_tool: Option<String>,
}

impl Args {
    fn input_flags(&self) -> InputFlags {
        InputFlags {
            cart_file: self.cart.clone(),
            ngc_file: self.ngc.clone(),
            manifest_file: self.manifest.clone(),
            n_files: self.n_files,
            output_location: self.output.clone(),
            disk_gb: self.disk_gb,
        }
    }

    fn toolchain(&self) -> Result<Toolchain> {
        let mut tools = Toolchain::default();
        if let Some(python) = &self.python {
            tools.python = python.clone();
        }
        if let Some(fetch_script) = &self.fetch_script {
            tools.fetch_script = fetch_script.clone();
        }
        if let Some(prefetch) = &self.prefetch {
            tools.prefetch = prefetch.clone();
        }
        if let Some(copy_tool) = &self.copy_tool {
            tools.copy_tool = split_tool("--copy-tool", copy_tool)?;
        }
        if let Some(container_tool) = &self.container_tool {
            tools.container_tool = split_tool("--container-tool", container_tool)?;
        }
        Ok(tools)
    }
}

fn split_tool(flag: &str, value: &str) -> Result<Vec<String>> {
    let words = shell_words::split(value).with_context(|| format!("Parsing {}", flag))?;
    if words.is_empty() {
        bail!("{} is empty", flag);
    }
    Ok(words)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("starting dbgap-fetch {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let schema = load_schema()?;
    let inputs = read_inputs(args.inputs.as_deref(), args.input_flags(), &schema)
        .context("Workflow inputs rejected")?;

    fs::create_dir_all(&args.work_dir)
        .with_context(|| format!("Creating working directory {}", args.work_dir.display()))?;
    let wd = WorkingDirectory { path: fs::canonicalize(&args.work_dir)? };

    let workflow = Workflow {
        profile: args.profile,
        tools: args.toolchain()?,
        executor: args.executor,
        dry_run: args.dry_run,
    };

    match workflow.run(&inputs, &wd).await.context("Fetch task failed")? {
        TaskOutcome::DryRun { script } => info!("Task script written to {}", script.display()),
        TaskOutcome::Completed { copied } => info!("Fetched {} entries to {}", copied, inputs.output_location),
    }

    Ok(())
}
