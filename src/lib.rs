//! Fetch controlled-access dbGaP data listed in a cart file and stage it to a storage location

use std::path::PathBuf;

/// Pinned runtime settings for each workflow version
pub mod profile;
/// Read and validate workflow inputs
pub mod request;
/// Stage, render and run the fetch task
pub mod task;
/// Bind validated inputs to the fetch task
pub mod workflow;

/// Directory the task stages inputs into and downloads under
pub struct WorkingDirectory {
    pub path: PathBuf,
}
