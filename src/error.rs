use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe server failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("{phase} hook failed: {message}")]
    Hook {
        phase: &'static str,
        message: String,
    },

    #[error("{phase} hook timed out after {limit_ms} ms")]
    HookTimeout { phase: &'static str, limit_ms: u64 },

    #[error("System error: {message}")]
    System { message: String },
}

impl LifecycleError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn hook<S: Into<String>>(phase: &'static str, message: S) -> Self {
        Self::Hook {
            phase,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
