use vivecal_core::{
    frame::{FrameHeader, RawFrame},
    sample::{CaptureSample, PoseSample},
    CameraIntrinsics, CaptureError, FrameGeometry, PixelLayout,
};

/// Builds [`CaptureSample`]s from accepted frames, checking every frame
/// against the geometry fixed at session start.
#[derive(Debug)]
pub struct SamplePairer {
    geometry: FrameGeometry,
    layout: PixelLayout,
}

impl SamplePairer {
    /// Infers the pixel layout once from the device geometry. Intrinsics
    /// describing a different frame size are rejected up front.
    pub fn new(
        geometry: FrameGeometry,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Self, CaptureError> {
        let layout = PixelLayout::infer(&geometry)?;

        if intrinsics.frame_width != geometry.width || intrinsics.frame_height != geometry.height {
            return Err(CaptureError::FrameGeometryMismatch {
                expected: geometry,
                found: FrameGeometry::new(
                    intrinsics.frame_width,
                    intrinsics.frame_height,
                    geometry.buffer_size,
                ),
            });
        }

        Ok(Self { geometry, layout })
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Copies `pixels` into a new sample at `index`. The pose is only kept
    /// when the header reports a valid pose with tracking running.
    pub fn pair(
        &self,
        index: usize,
        header: &FrameHeader,
        pixels: &[u8],
    ) -> Result<CaptureSample, CaptureError> {
        let found = header.geometry();
        if found != self.geometry {
            return Err(CaptureError::FrameGeometryMismatch {
                expected: self.geometry,
                found,
            });
        }

        let size = self.geometry.buffer_size;
        if pixels.len() < size {
            return Err(CaptureError::FrameGeometryMismatch {
                expected: self.geometry,
                found: FrameGeometry::new(header.width, header.height, pixels.len()),
            });
        }

        let pose = PoseSample::from_header(header);
        if pose.valid {
            for row in pose.rows.row_iter() {
                log::debug!(
                    "frame {} pose: {:.3} {:.3} {:.3} {:.3}",
                    header.sequence, row[0], row[1], row[2], row[3]
                );
            }
        } else {
            log::warn!(
                "frame {} has no valid pose (tracking {:?})",
                header.sequence,
                header.tracking_state
            );
        }

        Ok(CaptureSample {
            index,
            sequence: header.sequence,
            frame: RawFrame {
                width: self.geometry.width,
                height: self.geometry.height,
                layout: self.layout,
                pixels: pixels[..size].to_vec(),
            },
            pose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivecal_core::{frame::TrackingState, PoseMatrix};
    use vivecal_sensor::scripted::ScriptedPoll;

    fn intrinsics(width: u32, height: u32) -> CameraIntrinsics {
        CameraIntrinsics::new([100.0, 100.0].into(), [2.0, 1.0].into(), width, height)
    }

    #[test]
    fn pairs_frame_with_valid_pose() {
        let geometry = FrameGeometry::new(4, 2, 4 * 2 * 4);
        let pairer = SamplePairer::new(geometry, &intrinsics(4, 2)).unwrap();
        assert_eq!(pairer.layout(), PixelLayout::Rgba8);

        let pose = PoseMatrix::from_fn(|r, c| (r + c) as f64);
        let poll = ScriptedPoll::new(&geometry, 42, Some(pose));
        let sample = pairer.pair(3, &poll.header, &poll.pixels).unwrap();

        assert_eq!(sample.index, 3);
        assert_eq!(sample.sequence, 42);
        assert!(sample.pose.valid);
        assert_eq!(sample.pose.rows, pose);
        assert_eq!(sample.frame.pixels, poll.pixels);
        assert_eq!(sample.frame.channels(), 4);
    }

    #[test]
    fn untracked_frame_keeps_a_zeroed_slot() {
        let geometry = FrameGeometry::new(4, 2, 4 * 2 * 3);
        let pairer = SamplePairer::new(geometry, &intrinsics(4, 2)).unwrap();

        let mut poll = ScriptedPoll::new(&geometry, 7, Some(PoseMatrix::repeat(1.0)));
        poll.header.tracking_state = TrackingState::Uninitialized;
        let sample = pairer.pair(0, &poll.header, &poll.pixels).unwrap();

        assert!(!sample.pose.valid);
        assert_eq!(sample.pose.rows, PoseMatrix::zeros());
    }

    #[test]
    fn mode_change_is_fatal() {
        let geometry = FrameGeometry::new(4, 2, 4 * 2 * 3);
        let pairer = SamplePairer::new(geometry, &intrinsics(4, 2)).unwrap();

        let other = FrameGeometry::new(8, 2, 8 * 2 * 3);
        let poll = ScriptedPoll::new(&other, 1, None);
        assert!(matches!(
            pairer.pair(0, &poll.header, &poll.pixels),
            Err(CaptureError::FrameGeometryMismatch { .. })
        ));

        let poll = ScriptedPoll::new(&geometry, 1, None);
        assert!(matches!(
            pairer.pair(0, &poll.header, &poll.pixels[..10]),
            Err(CaptureError::FrameGeometryMismatch { .. })
        ));
    }

    #[test]
    fn rejects_unsupported_layout_and_inconsistent_intrinsics() {
        let geometry = FrameGeometry::new(4, 2, 4 * 2 * 5);
        assert!(matches!(
            SamplePairer::new(geometry, &intrinsics(4, 2)),
            Err(CaptureError::UnsupportedFrameLayout { .. })
        ));

        let geometry = FrameGeometry::new(4, 2, 4 * 2 * 3);
        assert!(matches!(
            SamplePairer::new(geometry, &intrinsics(640, 480)),
            Err(CaptureError::FrameGeometryMismatch { .. })
        ));
    }
}
