use anyhow::{anyhow, Result};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

/// included inputs schema
static INPUTS_SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/inputs.json"));

pub fn load_schema() -> Result<JSONSchema> {
    let schema_json: Value = serde_json::from_str(INPUTS_SCHEMA)?;
    compile_schema(&schema_json)
}

fn compile_schema(schema: &Value) -> Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|err| anyhow!("Invalid inputs schema: {}", err))
}
