use serde::Deserialize;

use crate::{FrameGeometry, PixelLayout, PoseMatrix};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Running,
    NotRunning,
    Uninitialized,
}

/// Per-poll metadata of the current device frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameHeader {
    pub sequence: u32,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub pose_valid: bool,
    pub tracking_state: TrackingState,
    // device to absolute tracking (standing universe)
    pub pose: PoseMatrix,
}

impl FrameHeader {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(
            self.width,
            self.height,
            self.width as usize * self.height as usize * self.bytes_per_pixel as usize,
        )
    }

    pub fn has_tracking(&self) -> bool {
        self.pose_valid && self.tracking_state == TrackingState::Running
    }
}

/// Owned copy of one frame's pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }
}
