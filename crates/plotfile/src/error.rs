//! Error types for plotfile reading.

use std::path::{Path, PathBuf};

use thiserror::Error;
use viz_common::LoadError;

/// Result type for plotfile operations.
pub type PlotfileResult<T> = Result<T, PlotfileError>;

/// Error types for plotfile reading.
#[derive(Error, Debug)]
pub enum PlotfileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Directory is not a plotfile (no `Header`)
    #[error("Not a plotfile: {}", .0.display())]
    NotAPlotfile(PathBuf),

    /// Header present but malformed
    #[error("Invalid header at line {line}: {message}")]
    InvalidHeader { line: usize, message: String },
}

impl PlotfileError {
    pub(crate) fn header(line: usize, message: impl Into<String>) -> Self {
        PlotfileError::InvalidHeader {
            line,
            message: message.into(),
        }
    }

    /// Convert to the loader-level error for the plotfile at `path`.
    pub fn into_load_error(self, path: &Path) -> LoadError {
        match self {
            PlotfileError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                LoadError::NotFound(path.to_path_buf())
            }
            PlotfileError::IoError(e) => LoadError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            PlotfileError::NotAPlotfile(p) => LoadError::NotFound(p),
            e @ PlotfileError::InvalidHeader { .. } => LoadError::InvalidFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        }
    }
}
