use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use jsonschema::JSONSchema;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

#[derive(Debug)]
pub enum InputError {
    ReadError(PathBuf),
    JSONDecodeError,
    NotAnObject,
    JSONValidationError(Vec<String>),
    DeserialisationError,
    MissingFile { input: &'static str, path: PathBuf },
    OutputLocationError(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InputError::ReadError(path) => write!(f, "can't read inputs at {}", path.display()),
            InputError::JSONDecodeError => write!(f, "inputs are not valid JSON"),
            InputError::NotAnObject => write!(f, "inputs must be a JSON object"),
            InputError::JSONValidationError(errors) => {
                write!(f, "inputs fail validation: {}", errors.join("; "))
            }
            InputError::DeserialisationError => write!(f, "can't deserialise inputs"),
            InputError::MissingFile { input, path } => {
                write!(f, "{} {} does not exist or is not a file", input, path.display())
            }
            InputError::OutputLocationError(location) => {
                write!(f, "unsupported output location {}", location)
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Typed workflow inputs, forwarded unmodified to the fetch task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowInputs {
    pub cart_file: PathBuf,
    pub ngc_file: PathBuf,
    pub manifest_file: Option<PathBuf>,
    pub n_files: Option<u32>,
    pub output_location: String,
    pub disk_gb: Option<u32>,
}

impl WorkflowInputs {
    /// File inputs must exist before the task is started
    pub fn check_files(&self) -> Result<(), InputError> {
        check_file("cart_file", &self.cart_file)?;
        check_file("ngc_file", &self.ngc_file)?;
        if let Some(manifest) = &self.manifest_file {
            check_file("manifest_file", manifest)?;
        }
        Ok(())
    }

    pub fn output(&self) -> Result<OutputLocation, InputError> {
        OutputLocation::parse(&self.output_location)
    }
}

fn check_file(input: &'static str, path: &Path) -> Result<(), InputError> {
    if !path.is_file() {
        warn!("Missing {} at {}", input, path.display());
        return Err(InputError::MissingFile { input, path: path.to_path_buf() });
    }
    Ok(())
}

/// Inputs given as command line flags, applied on top of an inputs file
#[derive(Debug, Clone, Default)]
pub struct InputFlags {
    pub cart_file: Option<PathBuf>,
    pub ngc_file: Option<PathBuf>,
    pub manifest_file: Option<PathBuf>,
    pub n_files: Option<u32>,
    pub output_location: Option<String>,
    pub disk_gb: Option<u32>,
}

impl InputFlags {
    fn apply(self, object: &mut Map<String, Value>) {
        let mut set = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                object.insert(key.to_string(), value);
            }
        };
        set("cart_file", self.cart_file.map(path_value));
        set("ngc_file", self.ngc_file.map(path_value));
        set("manifest_file", self.manifest_file.map(path_value));
        set("n_files", self.n_files.map(Value::from));
        set("output_location", self.output_location.map(Value::from));
        set("disk_gb", self.disk_gb.map(Value::from));
    }
}

fn path_value(path: PathBuf) -> Value {
    Value::String(path.display().to_string())
}

/// Read, merge and validate workflow inputs
///
/// Values from `flags` replace those in the inputs file. The merged object is validated against
/// the JSON schema before it's deserialised, and file inputs are checked on disk, so a bad
/// submission is rejected before anything is staged.
pub fn read_inputs(path: Option<&Path>, flags: InputFlags, schema: &JSONSchema) -> Result<WorkflowInputs, InputError> {
    let mut object = match path {
        Some(path) => read_object(path)?,
        None => Map::new(),
    };
    flags.apply(&mut object);
    let json = Value::Object(object);

    validate(schema, &json)?;
    info!("Inputs are valid");

    let inputs = parse_json(json)?;
    inputs.check_files()?;
    inputs.output()?;
    Ok(inputs)
}

fn read_object(path: &Path) -> Result<Map<String, Value>, InputError> {
    info!("Reading inputs at {}", path.display());
    let json_string = fs::read_to_string(path).map_err(|err| {
        warn!("Can't read inputs at path {}: {}", path.display(), err);
        InputError::ReadError(path.to_path_buf())
    })?;
    match serde_json::from_str::<Value>(&json_string) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(InputError::NotAnObject),
        Err(_) => Err(InputError::JSONDecodeError),
    }
}

fn validate(schema: &JSONSchema, json: &Value) -> Result<(), InputError> {
    info!("Validating inputs against JSON schema");
    if let Err(errors) = schema.validate(json) {
        let messages: Vec<String> = errors.map(|err| err.to_string()).collect();
        for message in &messages {
            warn!("Invalid inputs: {}", message);
        }
        return Err(InputError::JSONValidationError(messages));
    }
    Ok(())
}

fn parse_json(value: Value) -> Result<WorkflowInputs, InputError> {
    serde_json::from_value::<WorkflowInputs>(value)
        .map_err(|_| InputError::DeserialisationError)
}

/// Destination for fetched data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocation {
    /// Object storage URI such as `gs://bucket/prefix`, exactly as the caller wrote it
    ///
    /// The URI is parsed only to check it has a scheme and a host; the copy tool gets `raw`
    /// unchanged, spaces and non-ASCII characters included.
    Remote { raw: String },
    /// Absolute local directory
    Local(PathBuf),
}

impl OutputLocation {
    pub fn parse(location: &str) -> Result<OutputLocation, InputError> {
        let unsupported = || InputError::OutputLocationError(location.to_string());
        match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => {
                url.to_file_path().map(OutputLocation::Local).map_err(|_| unsupported())
            }
            Ok(url) => match url.host_str() {
                Some(_) => Ok(OutputLocation::Remote { raw: location.to_string() }),
                None => Err(unsupported()),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let path = PathBuf::from(location);
                if path.is_absolute() {
                    return Ok(OutputLocation::Local(path));
                }
                std::env::current_dir()
                    .map(|cwd| OutputLocation::Local(cwd.join(path)))
                    .map_err(|_| unsupported())
            }
            Err(_) => Err(unsupported()),
        }
    }
}

impl fmt::Display for OutputLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputLocation::Remote { raw } => write!(f, "{}", raw),
            OutputLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
