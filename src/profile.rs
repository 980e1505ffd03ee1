use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;

/// Path of the prefetch binary inside the container image
pub static PREFETCH_PATH: &str = "/usr/local/sratoolkit/bin/prefetch";
/// Path of the fetch script inside the container image
pub static FETCH_SCRIPT_PATH: &str = "/usr/local/dbgap-fetch/fetch.py";

/// A workflow version with its own pinned runtime
///
/// Profiles are independent of each other: they differ in image tag, disk default, credential
/// handling and copy threading, and none of them is the canonical one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Profile {
    Standard,
    Threaded,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Profile::Standard => write!(f, "standard"),
            Profile::Threaded => write!(f, "threaded"),
        }
    }
}

/// Where the fetch script reads the credential file from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialPath {
    /// The path the caller supplied, staged under its own name
    Input,
    /// A fixed file name in the staging directory
    Fixed(&'static str),
}

/// Runtime declaration of a profile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runtime {
    pub image: &'static str,
    pub default_disk_gb: Option<u32>,
    pub threaded_copy: bool,
    pub credential: CredentialPath,
}

impl Runtime {
    /// Disk to request: the caller's value wins, otherwise the profile default (if any)
    pub fn disk_gb(&self, requested: Option<u32>) -> Option<u32> {
        requested.or(self.default_disk_gb)
    }
}

impl Profile {
    pub fn runtime(&self) -> Runtime {
        match self {
            Profile::Standard => Runtime {
                image: "dbgap-fetch:0.1.0",
                default_disk_gb: Some(50),
                threaded_copy: false,
                credential: CredentialPath::Input,
            },
            Profile::Threaded => Runtime {
                image: "dbgap-fetch:0.2.0",
                default_disk_gb: None,
                threaded_copy: true,
                credential: CredentialPath::Fixed("prj.ngc"),
            },
        }
    }
}

/// External programs the task shells out to
///
/// Defaults follow the container contract. `copy_tool` and `container_tool` are a program followed
/// by any leading arguments, so a wrapper like `sh copy.sh` works too.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub python: PathBuf,
    pub fetch_script: PathBuf,
    pub prefetch: PathBuf,
    pub copy_tool: Vec<String>,
    pub container_tool: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            python: PathBuf::from("python3"),
            fetch_script: PathBuf::from(FETCH_SCRIPT_PATH),
            prefetch: PathBuf::from(PREFETCH_PATH),
            copy_tool: vec!["gsutil".to_string()],
            container_tool: vec!["docker".to_string()],
        }
    }
}
