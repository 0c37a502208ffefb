use std::num::NonZeroUsize;

use vivecal_core::{sample::CaptureSample, CaptureError, Dataset};

/// Append-only store of accepted samples, capped at `target_count`.
///
/// Insertion order is capture order and `samples[i].index == i`.
#[derive(Debug)]
pub struct CaptureSession {
    target_count: NonZeroUsize,
    samples: Vec<CaptureSample>,
}

impl CaptureSession {
    pub fn new(target_count: NonZeroUsize) -> Self {
        Self {
            target_count,
            samples: Vec::with_capacity(target_count.get()),
        }
    }

    pub fn target_count(&self) -> usize {
        self.target_count.get()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.target_count.get()
    }

    /// Index the next appended sample has to carry.
    pub fn next_index(&self) -> usize {
        self.samples.len()
    }

    pub fn append(&mut self, sample: CaptureSample) -> Result<(), CaptureError> {
        if self.is_full() {
            return Err(CaptureError::SessionFull {
                target: self.target_count.get(),
            });
        }
        debug_assert_eq!(sample.index, self.samples.len());

        self.samples.push(sample);
        Ok(())
    }

    pub fn samples(&self) -> &[CaptureSample] {
        &self.samples
    }

    pub fn valid_pose_count(&self) -> usize {
        self.samples.iter().filter(|s| s.pose.valid).count()
    }
}

impl Dataset<CaptureSample> for CaptureSession {
    fn get(&self, index: usize) -> Option<&CaptureSample> {
        self.samples.get(index)
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivecal_core::{frame::RawFrame, sample::PoseSample, PixelLayout};

    fn sample(index: usize) -> CaptureSample {
        CaptureSample {
            index,
            sequence: index as u32 + 10,
            frame: RawFrame {
                width: 1,
                height: 1,
                layout: PixelLayout::Rgb8,
                pixels: vec![0; 3],
            },
            pose: PoseSample::invalid(),
        }
    }

    #[test]
    fn stops_accepting_at_target() {
        let mut session = CaptureSession::new(NonZeroUsize::new(2).unwrap());
        assert!(session.is_empty());

        session.append(sample(session.next_index())).unwrap();
        assert!(!session.is_full());
        session.append(sample(session.next_index())).unwrap();
        assert!(session.is_full());

        assert_eq!(
            session.append(sample(2)),
            Err(CaptureError::SessionFull { target: 2 })
        );
        assert_eq!(session.len(), 2);
        assert_eq!(session.valid_pose_count(), 0);

        let sequences: Vec<_> = session.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![10, 11]);
    }
}
