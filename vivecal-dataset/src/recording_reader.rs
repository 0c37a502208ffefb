//! Replays a recorded tracked-camera stream as a [`FrameSource`].
//!
//! A recording directory holds
//! - `camera.txt`: `frame_size: <width> <height> <buffer_size>` and
//!   `intrinsics: <fx> <fy> <cx> <cy>`
//! - `frames.csv`: one row per device poll,
//!   `sequence,pose_valid,tracking,m00,...,m23,image`, where `image` is a raw
//!   pixel file relative to the recording directory.
//!
//! Every header poll moves to the next row. Running out of rows looks like the
//! device disconnecting.

use std::{
    collections::VecDeque,
    io::BufRead,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use vivecal_core::{
    frame::{FrameHeader, TrackingState},
    CameraIntrinsics, CaptureError, FrameGeometry, PoseMatrix,
};
use vivecal_sensor::FrameSource;

#[derive(Debug, Deserialize)]
struct FrameRow {
    sequence: u32,
    pose_valid: bool,
    tracking: TrackingState,
    m00: f64,
    m01: f64,
    m02: f64,
    m03: f64,
    m10: f64,
    m11: f64,
    m12: f64,
    m13: f64,
    m20: f64,
    m21: f64,
    m22: f64,
    m23: f64,
    image: PathBuf,
}

impl FrameRow {
    fn pose(&self) -> PoseMatrix {
        PoseMatrix::new(
            self.m00, self.m01, self.m02, self.m03,
            self.m10, self.m11, self.m12, self.m13,
            self.m20, self.m21, self.m22, self.m23,
        )
    }
}

struct RecordedFrame {
    header: FrameHeader,
    image: PathBuf,
}

pub struct RecordingReader {
    recording_path: PathBuf,
    geometry: Option<FrameGeometry>,
    intrinsics: Option<CameraIntrinsics>,
    frames: VecDeque<RecordedFrame>,
    current: Option<RecordedFrame>,
    streaming: bool,
}

impl RecordingReader {
    pub fn new(recording_path: impl Into<PathBuf>) -> Self {
        RecordingReader {
            recording_path: recording_path.into(),
            geometry: None,
            intrinsics: None,
            frames: VecDeque::new(),
            current: None,
            streaming: false,
        }
    }

    /// Reads `camera.txt` and `frames.csv`.
    pub fn open(recording_path: impl Into<PathBuf>) -> Result<Self> {
        let mut reader = Self::new(recording_path);
        reader.load_camera()?;
        reader.load_frames()?;
        Ok(reader)
    }

    pub fn recording_path(&self) -> &Path {
        &self.recording_path
    }

    /// Polls left before the recording runs out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn load_camera(&mut self) -> Result<()> {
        let camera_file_path = self.recording_path.join("camera.txt");

        let file = std::fs::File::open(&camera_file_path)
            .with_context(|| format!("failed to open {}", camera_file_path.display()))?;
        let file = std::io::BufReader::new(file);

        let mut frame_size = None;
        let mut intrinsics = None;
        for line in file.lines() {
            let line = line?;
            let Some((key, values)) = line.split_once(':') else {
                continue;
            };
            let values: Vec<&str> = values.split_whitespace().collect();

            match key.trim() {
                "frame_size" => {
                    if values.len() != 3 {
                        bail!("frame_size needs width, height and buffer size: {line:?}");
                    }
                    frame_size = Some(FrameGeometry::new(
                        values[0].parse()?,
                        values[1].parse()?,
                        values[2].parse()?,
                    ));
                }
                "intrinsics" => {
                    if values.len() != 4 {
                        bail!("intrinsics needs fx, fy, cx and cy: {line:?}");
                    }
                    let v = values
                        .iter()
                        .map(|v| v.parse::<f64>())
                        .collect::<Result<Vec<_>, _>>()?;
                    intrinsics = Some((v[0], v[1], v[2], v[3]));
                }
                other => log::debug!("ignoring camera property {other:?}"),
            }
        }

        let Some(geometry) = frame_size else {
            bail!("{} has no frame_size", camera_file_path.display());
        };
        let Some((fx, fy, cx, cy)) = intrinsics else {
            bail!("{} has no intrinsics", camera_file_path.display());
        };

        log::debug!("recorded camera: {geometry}, fx {fx} fy {fy} cx {cx} cy {cy}");
        self.geometry = Some(geometry);
        self.intrinsics = Some(CameraIntrinsics::new(
            [fx, fy].into(),
            [cx, cy].into(),
            geometry.width,
            geometry.height,
        ));
        Ok(())
    }

    pub fn load_frames(&mut self) -> Result<()> {
        let Some(geometry) = self.geometry else {
            bail!("load_camera has to run before load_frames");
        };
        let pixel_count = geometry.pixel_count().max(1);
        let frames_file_path = self.recording_path.join("frames.csv");

        let mut reader = csv::Reader::from_path(&frames_file_path)
            .with_context(|| format!("failed to open {}", frames_file_path.display()))?;

        self.frames.clear();
        for (line, row) in reader.deserialize::<FrameRow>().enumerate() {
            let row = row.with_context(|| format!("bad row {} in frames.csv", line + 1))?;
            let header = FrameHeader {
                sequence: row.sequence,
                width: geometry.width,
                height: geometry.height,
                bytes_per_pixel: (geometry.buffer_size / pixel_count) as u32,
                pose_valid: row.pose_valid,
                tracking_state: row.tracking,
                pose: row.pose(),
            };
            self.frames.push_back(RecordedFrame {
                header,
                image: self.recording_path.join(&row.image),
            });
        }

        log::info!(
            "loaded {} polls from {}",
            self.frames.len(),
            self.recording_path.display()
        );
        Ok(())
    }

    fn ensure_streaming(&self) -> Result<FrameGeometry, CaptureError> {
        if !self.streaming {
            return Err(CaptureError::device_unavailable("streaming handle not acquired"));
        }
        self.frame_geometry()
    }
}

impl FrameSource for RecordingReader {
    fn is_available(&self) -> bool {
        self.geometry.is_some() && self.intrinsics.is_some()
    }

    fn frame_geometry(&self) -> Result<FrameGeometry, CaptureError> {
        self.geometry
            .ok_or_else(|| CaptureError::device_unavailable("recording has no camera"))
    }

    fn intrinsics(&self) -> Result<CameraIntrinsics, CaptureError> {
        self.intrinsics
            .ok_or_else(|| CaptureError::device_unavailable("recording has no camera"))
    }

    fn acquire_stream(&mut self) -> Result<(), CaptureError> {
        if !self.is_available() {
            return Err(CaptureError::device_unavailable("invalid streaming handle"));
        }
        self.streaming = true;
        Ok(())
    }

    fn poll_header(&mut self) -> Result<FrameHeader, CaptureError> {
        self.ensure_streaming()?;
        let frame = self
            .frames
            .pop_front()
            .ok_or_else(|| CaptureError::device_unavailable("recording exhausted"))?;
        let header = frame.header.clone();
        self.current = Some(frame);
        Ok(header)
    }

    fn poll_frame(&mut self, buffer: &mut [u8]) -> Result<FrameHeader, CaptureError> {
        let geometry = self.ensure_streaming()?;
        if buffer.len() < geometry.buffer_size {
            return Err(CaptureError::BufferTooSmall {
                required: geometry.buffer_size,
                provided: buffer.len(),
            });
        }

        let frame = self
            .current
            .as_ref()
            .ok_or_else(|| CaptureError::device_unavailable("no frame streamed yet"))?;
        let pixels = std::fs::read(&frame.image).map_err(|e| {
            CaptureError::device_unavailable(format!("cannot read {}: {e}", frame.image.display()))
        })?;

        if pixels.len() != geometry.buffer_size {
            return Err(CaptureError::FrameGeometryMismatch {
                expected: geometry,
                found: FrameGeometry::new(geometry.width, geometry.height, pixels.len()),
            });
        }

        buffer[..pixels.len()].copy_from_slice(&pixels);
        Ok(frame.header.clone())
    }
}
