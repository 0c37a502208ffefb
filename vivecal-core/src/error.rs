use thiserror::Error;

use crate::FrameGeometry;

/// Failures of the capture pipeline. Every variant is fatal to the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Device absent, disconnected, or its streaming handle is invalid.
    #[error("tracked camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("frame buffer too small: device needs {required} bytes, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    #[error(
        "unsupported frame layout: {buffer_size} bytes for {width}x{height} is neither 3 nor 4 channels"
    )]
    UnsupportedFrameLayout {
        width: u32,
        height: u32,
        buffer_size: usize,
    },

    /// The device changed modes mid-session.
    #[error("frame geometry changed mid-session: expected {expected}, found {found}")]
    FrameGeometryMismatch {
        expected: FrameGeometry,
        found: FrameGeometry,
    },

    #[error("capture session already holds its target of {target} samples")]
    SessionFull { target: usize },

    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),

    #[error("frame sequence stuck at {sequence} after {polls} header polls")]
    SequenceStalled { sequence: u32, polls: u64 },
}

impl CaptureError {
    pub fn device_unavailable(reason: impl Into<String>) -> Self {
        CaptureError::DeviceUnavailable(reason.into())
    }
}
