//! In-memory [`FrameSource`] replaying a fixed list of device polls.
//!
//! Every `poll_header` call moves to the next scripted poll, `poll_frame`
//! returns the poll last reached together with its pixels. Once the script is
//! exhausted the device reports itself as disconnected.

use std::collections::VecDeque;

use vivecal_core::{
    frame::{FrameHeader, TrackingState},
    CameraIntrinsics, CaptureError, FrameGeometry, PixelLayout, PoseMatrix,
};

use crate::FrameSource;

#[derive(Clone, Debug)]
pub struct ScriptedPoll {
    pub header: FrameHeader,
    pub pixels: Vec<u8>,
}

impl ScriptedPoll {
    /// Frame of the given geometry filled with the low byte of `sequence`.
    pub fn new(geometry: &FrameGeometry, sequence: u32, pose: Option<PoseMatrix>) -> Self {
        let pixel_count = geometry.pixel_count().max(1);
        let header = FrameHeader {
            sequence,
            width: geometry.width,
            height: geometry.height,
            bytes_per_pixel: (geometry.buffer_size / pixel_count) as u32,
            pose_valid: pose.is_some(),
            tracking_state: if pose.is_some() {
                TrackingState::Running
            } else {
                TrackingState::NotRunning
            },
            pose: pose.unwrap_or_else(PoseMatrix::zeros),
        };

        Self {
            header,
            pixels: vec![sequence as u8; geometry.buffer_size],
        }
    }
}

pub struct ScriptedSource {
    geometry: FrameGeometry,
    intrinsics: CameraIntrinsics,
    available: bool,
    streaming: bool,
    polls: VecDeque<ScriptedPoll>,
    current: Option<ScriptedPoll>,
    header_polls: usize,
    frame_polls: usize,
}

impl ScriptedSource {
    pub fn new(geometry: FrameGeometry, intrinsics: CameraIntrinsics) -> Self {
        Self {
            geometry,
            intrinsics,
            available: true,
            streaming: false,
            polls: VecDeque::new(),
            current: None,
            header_polls: 0,
            frame_polls: 0,
        }
    }

    /// Source whose reported geometry implies the given layout and whose
    /// intrinsics put the principal point at the image center.
    pub fn with_layout(width: u32, height: u32, layout: PixelLayout) -> Self {
        let geometry = FrameGeometry::new(
            width,
            height,
            width as usize * height as usize * layout.channels(),
        );
        let intrinsics = CameraIntrinsics::new(
            [width as f64, width as f64].into(),
            [width as f64 / 2.0, height as f64 / 2.0].into(),
            width,
            height,
        );
        Self::new(geometry, intrinsics)
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn push(&mut self, poll: ScriptedPoll) -> &mut Self {
        self.polls.push_back(poll);
        self
    }

    /// Queues one poll per sequence number, all with `pose`.
    pub fn push_sequences(&mut self, sequences: &[u32], pose: Option<PoseMatrix>) -> &mut Self {
        for &sequence in sequences {
            let poll = ScriptedPoll::new(&self.geometry, sequence, pose);
            self.polls.push_back(poll);
        }
        self
    }

    pub fn header_polls(&self) -> usize {
        self.header_polls
    }

    pub fn frame_polls(&self) -> usize {
        self.frame_polls
    }

    fn ensure_streaming(&self) -> Result<(), CaptureError> {
        if !self.available {
            return Err(CaptureError::device_unavailable("no tracked camera"));
        }
        if !self.streaming {
            return Err(CaptureError::device_unavailable("streaming handle not acquired"));
        }
        Ok(())
    }
}

impl FrameSource for ScriptedSource {
    fn is_available(&self) -> bool {
        self.available
    }

    fn frame_geometry(&self) -> Result<FrameGeometry, CaptureError> {
        if !self.available {
            return Err(CaptureError::device_unavailable("no tracked camera"));
        }
        Ok(self.geometry)
    }

    fn intrinsics(&self) -> Result<CameraIntrinsics, CaptureError> {
        if !self.available {
            return Err(CaptureError::device_unavailable("no tracked camera"));
        }
        Ok(self.intrinsics)
    }

    fn acquire_stream(&mut self) -> Result<(), CaptureError> {
        if !self.available {
            return Err(CaptureError::device_unavailable("invalid streaming handle"));
        }
        self.streaming = true;
        Ok(())
    }

    fn poll_header(&mut self) -> Result<FrameHeader, CaptureError> {
        self.ensure_streaming()?;
        self.header_polls += 1;

        match self.polls.pop_front() {
            Some(poll) => {
                let header = poll.header.clone();
                self.current = Some(poll);
                Ok(header)
            }
            None => {
                log::debug!("script exhausted after {} header polls", self.header_polls);
                Err(CaptureError::device_unavailable("device disconnected"))
            }
        }
    }

    fn poll_frame(&mut self, buffer: &mut [u8]) -> Result<FrameHeader, CaptureError> {
        self.ensure_streaming()?;
        self.frame_polls += 1;

        if buffer.len() < self.geometry.buffer_size {
            return Err(CaptureError::BufferTooSmall {
                required: self.geometry.buffer_size,
                provided: buffer.len(),
            });
        }

        let poll = self
            .current
            .as_ref()
            .ok_or_else(|| CaptureError::device_unavailable("no frame streamed yet"))?;
        let n = poll.pixels.len().min(buffer.len());
        buffer[..n].copy_from_slice(&poll.pixels[..n]);
        Ok(poll.header.clone())
    }
}
