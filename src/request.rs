//! Workflow inputs arrive as a JSON object and/or command line flags and are validated before any
//! task work starts

/// Compile the JSON schema for workflow inputs
pub mod schema;
/// Merge, validate and deserialise inputs into typed Rust objects
pub mod inputs;
