use std::path::PathBuf;

/// Errors raised while creating or driving GPU resources.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("buffer '{label}' needs {size} bytes, device limit is {limit}")]
    BufferTooLarge { label: String, size: u64, limit: u64 },

    #[error("allocation of buffer '{label}' failed: {reason}")]
    Allocation { label: String, reason: String },

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
}

impl RenderError {
    pub fn allocation(label: &str, reason: impl ToString) -> Self {
        RenderError::Allocation {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
