use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Default port for the HTTP probe server.
pub const DEFAULT_PROBE_PORT: u16 = 8066;

/// Environment variable overriding the probe server port.
pub const PROBE_PORT_ENV: &str = "LIFECYCLE_PROBE_PORT";

/// Environment variable carrying the workload identity string.
pub const WORKLOAD_NAME_ENV: &str = "LIFECYCLE_WORKLOAD_NAME";

/// Process-level settings read from the environment.
///
/// These cover the knobs Kubernetes typically injects through the pod spec:
/// the probe listen port and the workload identity string.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Probe server listen port
    pub probe_port: u16,

    /// Workload identity string (e.g. the StatefulSet pod name)
    pub workload_name: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            probe_port: DEFAULT_PROBE_PORT,
            workload_name: String::new(),
        }
    }
}

impl RuntimeSettings {
    /// Read settings from `LIFECYCLE_*` environment variables.
    ///
    /// Missing variables fall back to defaults; malformed values are an error.
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix("LIFECYCLE").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Load the user's configuration document into an opaque in-memory mapping.
///
/// The orchestrator never interprets the document; it is handed to every hook
/// as-is. An absent path is not an error: the configuration defaults to an
/// empty mapping. A path that cannot be read or parsed is fatal to `run`.
pub fn load_document(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        info!("No configuration file specified");
        return Ok(Value::Object(Default::default()));
    };

    debug!("Loading configuration from: {}", path.display());

    let settings = Config::builder().add_source(File::from(path)).build()?;

    Ok(settings.try_deserialize()?)
}
