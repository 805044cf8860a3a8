use thiserror::Error;

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("{body} instantiated outside of world bounds ({width} x {height})")]
    Bounds {
        body: String,
        width: f64,
        height: f64,
    },

    #[error("texture '{key}' is not in the texture cache")]
    Cache { key: String },

    #[error("failed to load texture '{key}': {reason}")]
    TextureLoad { key: String, reason: String },

    #[error("total rays ({total_rays}) must not exceed the screen width ({width})")]
    TooManyRays { total_rays: usize, width: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
