use crate::{frame::FrameHeader, frame::RawFrame, PoseMatrix};

#[derive(Clone, Debug, PartialEq)]
pub struct PoseSample {
    pub rows: PoseMatrix,
    pub valid: bool,
}

impl PoseSample {
    /// Copies the tracked transform when the header reports a valid pose with
    /// tracking running, otherwise falls back to [`PoseSample::invalid`].
    pub fn from_header(header: &FrameHeader) -> Self {
        if header.has_tracking() {
            Self {
                rows: header.pose,
                valid: true,
            }
        } else {
            Self::invalid()
        }
    }

    /// Zeroed placeholder keeping the frame/pose correspondence. The matrix is
    /// not tracking data.
    pub fn invalid() -> Self {
        Self {
            rows: PoseMatrix::zeros(),
            valid: false,
        }
    }
}

/// One accepted frame and the pose that came with it.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSample {
    pub index: usize,
    // device frame sequence this sample was built from
    pub sequence: u32,
    pub frame: RawFrame,
    pub pose: PoseSample,
}
