use std::path::PathBuf;

use thiserror::Error;

/// Dataset export failures. Export stops at the first one.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to serialize calibration record")]
    Record(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("sample {0} written before the dataset header")]
    MissingHeader(usize),

    #[error("export format {0:?} is not available in this build")]
    UnsupportedFormat(crate::ExportFormat),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}
