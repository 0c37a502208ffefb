use std::num::NonZeroUsize;

use serde::Deserialize;
use vivecal_core::{CameraIntrinsics, CaptureError, Dataset};
use vivecal_sensor::FrameSource;

use crate::{
    frame_sequencer::FrameSequencer, sample_pairer::SamplePairer, session::CaptureSession,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureCfg {
    pub target_count: usize,
    // bound on consecutive repeated-sequence polls, unbounded if unset
    pub max_duplicate_polls: Option<u64>,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            target_count: 100,
            max_duplicate_polls: None,
        }
    }
}

impl CaptureCfg {
    /// Queries the device once and prepares a capture session.
    ///
    /// Everything that can be rejected before the first poll is rejected
    /// here: an absent device, an unsupported frame layout, and a zero target.
    pub fn finalize<S>(self, source: &mut S) -> Result<Capture, CaptureError>
    where
        S: FrameSource + ?Sized,
    {
        let target_count = NonZeroUsize::new(self.target_count)
            .ok_or_else(|| CaptureError::InvalidConfig("target_count must be positive".into()))?;
        if self.max_duplicate_polls == Some(0) {
            return Err(CaptureError::InvalidConfig(
                "max_duplicate_polls must be positive when set".into(),
            ));
        }

        if !source.is_available() {
            return Err(CaptureError::device_unavailable("no tracked camera available"));
        }

        let geometry = source.frame_geometry()?;
        let intrinsics = source.intrinsics()?;
        let pairer = SamplePairer::new(geometry, &intrinsics)?;

        source.acquire_stream()?;

        log::info!(
            "capturing {} samples of {} ({:?})",
            target_count,
            geometry,
            pairer.layout()
        );
        log::info!(
            "focal length: {:?}, principal point: {:?}",
            intrinsics.focal_length.as_slice(),
            intrinsics.principal_point.as_slice()
        );

        Ok(Capture {
            sequencer: FrameSequencer::new(self.max_duplicate_polls),
            pairer,
            session: CaptureSession::new(target_count),
            intrinsics,
            buffer: vec![0u8; geometry.buffer_size],
        })
    }
}

pub struct Capture {
    sequencer: FrameSequencer,
    pairer: SamplePairer,
    session: CaptureSession,
    intrinsics: CameraIntrinsics,
    // reused across polls, samples own their own copy
    buffer: Vec<u8>,
}

impl Capture {
    /// Polls until the session reaches its target or a fatal error occurs.
    /// Samples gathered before an error are handed back in the outcome.
    pub fn run<S>(mut self, source: &mut S) -> CaptureOutcome
    where
        S: FrameSource + ?Sized,
    {
        let mut error = None;
        while !self.session.is_full() {
            if let Err(e) = self.step(source) {
                error = Some(e);
                break;
            }
        }

        log::info!(
            "captured {}/{} samples, {} with valid pose",
            self.session.len(),
            self.session.target_count(),
            self.session.valid_pose_count()
        );

        CaptureOutcome {
            session: self.session,
            intrinsics: self.intrinsics,
            error,
        }
    }

    fn step<S>(&mut self, source: &mut S) -> Result<(), CaptureError>
    where
        S: FrameSource + ?Sized,
    {
        let header = self.sequencer.next_frame(source, &mut self.buffer)?;
        let sample = self
            .pairer
            .pair(self.session.next_index(), &header, &self.buffer)?;
        log::debug!(
            "accepted frame {} as sample {} (pose valid: {})",
            sample.sequence,
            sample.index,
            sample.pose.valid
        );
        self.session.append(sample)
    }
}

/// Result of a capture run. `error` is set when polling stopped before the
/// target was reached; `session` still holds every accepted sample.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub session: CaptureSession,
    pub intrinsics: CameraIntrinsics,
    pub error: Option<CaptureError>,
}

impl CaptureOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.session.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivecal_core::{FrameGeometry, PixelLayout, PoseMatrix};
    use vivecal_sensor::scripted::{ScriptedPoll, ScriptedSource};

    fn cfg(target_count: usize) -> CaptureCfg {
        CaptureCfg {
            target_count,
            ..Default::default()
        }
    }

    #[test]
    fn stops_exactly_at_target() {
        let mut source = ScriptedSource::with_layout(4, 2, PixelLayout::Rgb8);
        source.push_sequences(&[5, 5, 6, 6, 6, 7, 8, 9], Some(PoseMatrix::identity()));

        let outcome = cfg(3).finalize(&mut source).unwrap().run(&mut source);

        assert!(outcome.is_complete());
        let sequences: Vec<_> = outcome.session.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![5, 6, 7]);
        // nothing polled after the third sample
        assert_eq!(source.header_polls(), 6);
        assert_eq!(source.frame_polls(), 3);
    }

    #[test]
    fn unsupported_layout_aborts_before_polling() {
        let geometry = FrameGeometry::new(4, 2, 4 * 2 * 5);
        let intrinsics = CameraIntrinsics::new([1.0, 1.0].into(), [2.0, 1.0].into(), 4, 2);
        let mut source = ScriptedSource::new(geometry, intrinsics);
        source.push(ScriptedPoll::new(&geometry, 1, None));

        assert!(matches!(
            cfg(1).finalize(&mut source).err(),
            Some(CaptureError::UnsupportedFrameLayout { .. })
        ));
        assert_eq!(source.header_polls(), 0);
        assert_eq!(source.frame_polls(), 0);
    }

    #[test]
    fn missing_device_is_rejected() {
        let mut source = ScriptedSource::with_layout(4, 2, PixelLayout::Rgb8).unavailable();
        assert!(matches!(
            cfg(1).finalize(&mut source).err(),
            Some(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn zero_target_is_invalid() {
        let mut source = ScriptedSource::with_layout(4, 2, PixelLayout::Rgb8);
        assert!(matches!(
            cfg(0).finalize(&mut source).err(),
            Some(CaptureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn disconnect_keeps_partial_session() {
        let mut source = ScriptedSource::with_layout(4, 2, PixelLayout::Rgba8);
        source.push_sequences(&[1, 2, 2], None);

        let outcome = cfg(5).finalize(&mut source).unwrap().run(&mut source);

        assert!(!outcome.is_complete());
        assert!(matches!(outcome.error, Some(CaptureError::DeviceUnavailable(_))));
        assert_eq!(outcome.session.len(), 2);
    }

    #[test]
    fn mode_change_stops_capture() {
        let mut source = ScriptedSource::with_layout(4, 2, PixelLayout::Rgb8);
        source.push_sequences(&[1], None);
        let other = FrameGeometry::new(2, 2, 2 * 2 * 3);
        source.push(ScriptedPoll::new(&other, 2, None));

        let outcome = cfg(3).finalize(&mut source).unwrap().run(&mut source);

        assert!(matches!(
            outcome.error,
            Some(CaptureError::FrameGeometryMismatch { .. })
        ));
        assert_eq!(outcome.session.len(), 1);
    }

    #[test]
    fn samples_own_their_pixels() {
        let mut source = ScriptedSource::with_layout(2, 2, PixelLayout::Rgb8);
        source.push_sequences(&[1, 2, 3], None);

        let outcome = cfg(3).finalize(&mut source).unwrap().run(&mut source);

        for (sample, expected) in outcome.session.iter().zip([1u8, 2, 3]) {
            assert!(sample.frame.pixels.iter().all(|&b| b == expected));
        }
    }
}
