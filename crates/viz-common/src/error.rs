//! Error types for the render pipeline.
//!
//! Every error here is `Clone`: a single in-flight production hands the same
//! failure to every caller that joined it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias using RenderError.
pub type RenderResult<T> = Result<T, RenderError>;

/// Failure to turn a raw request into canonical plot parameters.
///
/// Always recoverable and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Width value '{value}' given without a unit")]
    MissingUnit { value: String },

    #[error("Invalid value for '{param}': {message}")]
    InvalidValue { param: String, message: String },

    #[error("Unknown plot kind: {0}")]
    UnknownPlotKind(String),

    #[error("Unknown axis: {0}")]
    UnknownAxis(String),

    #[error("Unknown particle type: {0}")]
    UnknownParticleType(String),

    #[error("Dataset has no fields to plot")]
    EmptyCatalog,
}

impl ResolutionError {
    pub fn invalid(param: &str, message: impl Into<String>) -> Self {
        ResolutionError::InvalidValue {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

/// Failure reported by a snapshot loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Dataset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Corrupt snapshot {}: {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },
}

/// Failure reported by a drawing backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("Unsupported render request: {0}")]
    Unsupported(String),

    #[error("Drawing backend failed: {0}")]
    Backend(String),

    #[error("Drawing backend timed out after {0:?}")]
    Timeout(Duration),
}

/// Error returned by the render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Draw(#[from] DrawError),

    #[error("No dataset available")]
    NoDataset,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RenderError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            RenderError::Resolution(_) => 400,
            RenderError::Load(LoadError::NotFound(_) | LoadError::UnknownDataset(_)) => 404,
            RenderError::NoDataset => 409,
            RenderError::Draw(DrawError::Timeout(_)) => 504,
            _ => 500,
        }
    }

    /// Short machine-readable code for JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::Resolution(ResolutionError::UnknownField(_)) => "UnknownField",
            RenderError::Resolution(ResolutionError::MissingUnit { .. }) => "MissingUnit",
            RenderError::Resolution(ResolutionError::UnknownParticleType(_)) => {
                "UnknownParticleType"
            }
            RenderError::Resolution(_) => "InvalidParameterValue",
            RenderError::Draw(_) => "DrawError",
            RenderError::NoDataset => "NoDataset",
            RenderError::Load(_) => "LoadError",
            RenderError::Internal(_) => "InternalError",
        }
    }
}
