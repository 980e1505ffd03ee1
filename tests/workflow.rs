//! End-to-end runs of the fetch task with stand-in tools.
//!
//! The fetch script and the copy tool are replaced by small shell scripts: the fake fetch script
//! records its arguments and writes one file per cart accession (plus an "untarred" directory),
//! the fake copy tool records its arguments and hands over to `cp -r`.
#![cfg(unix)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use dbgap_fetch::profile::{Profile, Toolchain};
use dbgap_fetch::request::inputs::WorkflowInputs;
use dbgap_fetch::task::{Executor, Step, TaskError};
use dbgap_fetch::workflow::{TaskOutcome, Workflow};
use dbgap_fetch::WorkingDirectory;

static FAKE_FETCH: &str = r#"
prev=""
for arg in "$@"; do
  case "$prev" in
    --outdir) out="$arg" ;;
    --ngc) ngc="$arg" ;;
    --cart) cart="$arg" ;;
  esac
  prev="$arg"
done
printf '%s\n' "$@" > fetch-args.txt
if grep -q invalid "$ngc"; then
  echo "invalid credential" >&2
  exit 3
fi
mkdir -p "$out/phs000001"
while read -r accession; do
  echo "$accession" > "$out/$accession.sra"
done < "$cart"
echo "untarred" > "$out/phs000001/README.txt"
"#;

static FAKE_COPY: &str = r#"
printf '%s\n' "$@" > copy-args.txt
if [ "$1" = "-m" ]; then shift; fi
shift 2
exec cp -r "$@"
"#;

struct Fixture {
    _dir: TempDir,
    work: PathBuf,
    output: PathBuf,
    tools: Toolchain,
    inputs: WorkflowInputs,
}

fn fixture(credential: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let bin = root.join("bin");
    let work = root.join("work");
    fs::create_dir_all(&bin).unwrap();
    fs::create_dir_all(&work).unwrap();

    let fetch_script = bin.join("fetch.sh");
    let copy_script = bin.join("copy.sh");
    fs::write(&fetch_script, FAKE_FETCH).unwrap();
    fs::write(&copy_script, FAKE_COPY).unwrap();

    let cart = root.join("cart.krt");
    let ngc = root.join("prj_123.ngc");
    fs::write(&cart, "SRR000001\nSRR000002\nSRR000003\n").unwrap();
    fs::write(&ngc, credential).unwrap();

    let output = root.join("bucket").join("fetched");
    let tools = Toolchain {
        python: PathBuf::from("/bin/sh"),
        fetch_script,
        prefetch: PathBuf::from("/opt/sratoolkit/bin/prefetch"),
        copy_tool: vec!["/bin/sh".to_string(), copy_script.display().to_string()],
        ..Toolchain::default()
    };
    let inputs = WorkflowInputs {
        cart_file: cart,
        ngc_file: ngc,
        manifest_file: None,
        n_files: None,
        output_location: output.display().to_string(),
        disk_gb: None,
    };

    Fixture { _dir: dir, work, output, tools, inputs }
}

fn workflow(profile: Profile, tools: &Toolchain, dry_run: bool) -> Workflow {
    Workflow { profile, tools: tools.clone(), executor: Executor::Local, dry_run }
}

/// Where the task stages, renders and downloads inside the working directory
fn task_dir(f: &Fixture) -> PathBuf {
    f.work.join("dbgap-fetch")
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

#[tokio::test]
async fn fetches_cart_and_copies_download() {
    let f = fixture("token");
    let wd = WorkingDirectory { path: f.work.clone() };

    let outcome = workflow(Profile::Standard, &f.tools, false).run(&f.inputs, &wd).await.unwrap();
    assert_eq!(outcome, TaskOutcome::Completed { copied: 4 });

    let args = lines(&task_dir(&f).join("fetch-args.txt"));
    let flags: HashSet<&str> = args.iter().map(String::as_str).filter(|arg| arg.starts_with("--")).collect();
    let expected: HashSet<&str> = ["--prefetch", "--ngc", "--cart", "--outdir", "--untar"].into_iter().collect();
    assert_eq!(flags, expected);

    for accession in ["SRR000001", "SRR000002", "SRR000003"] {
        let fetched = f.output.join(format!("{accession}.sra"));
        assert_eq!(fs::read_to_string(fetched).unwrap().trim(), accession);
    }
    assert!(f.output.join("phs000001").join("README.txt").is_file());

    let copy_args = lines(&task_dir(&f).join("copy-args.txt"));
    assert_eq!(copy_args[..2], ["cp", "-r"]);
    assert_eq!(copy_args.last().unwrap(), &f.output.display().to_string());
}

#[tokio::test]
async fn threaded_profile_uses_fixed_credential_and_parallel_copy() {
    let mut f = fixture("token");
    f.inputs.n_files = Some(3);
    let wd = WorkingDirectory { path: f.work.clone() };

    workflow(Profile::Threaded, &f.tools, false).run(&f.inputs, &wd).await.unwrap();

    let args = lines(&task_dir(&f).join("fetch-args.txt"));
    let ngc = args.iter().position(|arg| arg == "--ngc").unwrap();
    assert_eq!(args[ngc + 1], "inputs/prj.ngc");
    let n_files = args.iter().position(|arg| arg == "--n-files").unwrap();
    assert_eq!(args[n_files + 1], "3");
    assert!(!args.iter().any(|arg| arg == "--manifest"));

    let copy_args = lines(&task_dir(&f).join("copy-args.txt"));
    assert_eq!(copy_args[..3], ["-m", "cp", "-r"]);
    assert!(f.output.join("SRR000003.sra").is_file());
}

#[tokio::test]
async fn invalid_credential_fails_before_copy() {
    let f = fixture("invalid");
    let wd = WorkingDirectory { path: f.work.clone() };

    let err = workflow(Profile::Standard, &f.tools, false).run(&f.inputs, &wd).await.unwrap_err();

    match err.downcast_ref::<TaskError>() {
        Some(TaskError::StepFailed { step: Step::Fetch, code: Some(3) }) => {}
        other => panic!("expected fetch step failure, got {other:?}"),
    }
    assert!(!task_dir(&f).join("copy-args.txt").exists());
    assert!(!f.output.exists());
}

#[tokio::test]
async fn dry_run_renders_without_running() {
    let f = fixture("token");
    let wd = WorkingDirectory { path: f.work.clone() };

    let outcome = workflow(Profile::Standard, &f.tools, true).run(&f.inputs, &wd).await.unwrap();

    let script = task_dir(&f).join("task.sh");
    assert_eq!(outcome, TaskOutcome::DryRun { script: script.clone() });
    let content = fs::read_to_string(script).unwrap();
    assert!(content.contains("# disks: local-disk 50 HDD"));
    assert!(content.contains("--cart inputs/cart/cart.krt"));
    assert!(task_dir(&f).join("inputs/ngc/prj_123.ngc").is_file());
    assert!(!task_dir(&f).join("fetch-args.txt").exists());
}

#[tokio::test]
async fn output_location_reaches_copy_byte_for_byte() {
    let mut f = fixture("token");
    let output = f.output.with_file_name("my data é");
    f.inputs.output_location = output.display().to_string();
    let wd = WorkingDirectory { path: f.work.clone() };

    workflow(Profile::Standard, &f.tools, false).run(&f.inputs, &wd).await.unwrap();

    let copy_args = lines(&task_dir(&f).join("copy-args.txt"));
    assert_eq!(copy_args.last().unwrap(), &f.inputs.output_location);
    assert!(output.join("SRR000001.sra").is_file());
}

#[tokio::test]
async fn remote_output_location_is_not_reencoded() {
    let mut f = fixture("token");
    let recorder = f.work.with_file_name("record.sh");
    fs::write(&recorder, "printf '%s\\n' \"$@\" > copy-args.txt\n").unwrap();
    f.tools.copy_tool = vec!["/bin/sh".to_string(), recorder.display().to_string()];
    f.inputs.output_location = "gs://bucket/my data/données".to_string();
    let wd = WorkingDirectory { path: f.work.clone() };

    workflow(Profile::Standard, &f.tools, false).run(&f.inputs, &wd).await.unwrap();

    let copy_args = lines(&task_dir(&f).join("copy-args.txt"));
    assert_eq!(copy_args.last().unwrap(), "gs://bucket/my data/données");
}

#[tokio::test]
async fn inputs_inside_work_dir_are_left_alone() {
    let mut f = fixture("token");
    let user_inputs = f.work.join("inputs");
    fs::create_dir_all(user_inputs.join("tmp_download")).unwrap();
    let cart = user_inputs.join("cart.krt");
    let ngc = user_inputs.join("prj.ngc");
    fs::copy(&f.inputs.cart_file, &cart).unwrap();
    fs::copy(&f.inputs.ngc_file, &ngc).unwrap();
    fs::write(f.work.join("tmp_download"), "not ours").unwrap();
    f.inputs.cart_file = cart.clone();
    f.inputs.ngc_file = ngc.clone();
    let wd = WorkingDirectory { path: f.work.clone() };

    workflow(Profile::Standard, &f.tools, true).run(&f.inputs, &wd).await.unwrap();
    workflow(Profile::Standard, &f.tools, true).run(&f.inputs, &wd).await.unwrap();

    assert_eq!(fs::read_to_string(&ngc).unwrap(), "token");
    assert!(cart.is_file());
    assert!(user_inputs.join("tmp_download").is_dir());
    assert_eq!(fs::read_to_string(f.work.join("tmp_download")).unwrap(), "not ours");
    assert!(task_dir(&f).join("inputs/ngc/prj.ngc").is_file());
}
