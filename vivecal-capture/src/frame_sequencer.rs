use vivecal_core::{frame::FrameHeader, CaptureError};
use vivecal_sensor::FrameSource;

/// Turns repeated device polls into a stream of distinct frames.
///
/// Only equality against the last accepted sequence number matters, so a
/// wrapped-around counter still counts as new.
pub struct FrameSequencer {
    last_accepted: Option<u32>,
    max_duplicate_polls: Option<u64>,
}

impl FrameSequencer {
    pub fn new(max_duplicate_polls: Option<u64>) -> Self {
        Self {
            last_accepted: None,
            max_duplicate_polls,
        }
    }

    pub fn last_accepted(&self) -> Option<u32> {
        self.last_accepted
    }

    pub fn is_new(&self, sequence: u32) -> bool {
        self.last_accepted != Some(sequence)
    }

    /// Busy-polls headers until the sequence number changes, then copies the
    /// frame into `buffer` and returns its header.
    ///
    /// There is no backoff between header polls. Without `max_duplicate_polls`
    /// a device that never advances keeps this spinning.
    pub fn next_frame<S>(
        &mut self,
        source: &mut S,
        buffer: &mut [u8],
    ) -> Result<FrameHeader, CaptureError>
    where
        S: FrameSource + ?Sized,
    {
        let mut duplicate_polls = 0u64;
        loop {
            let header = source.poll_header()?;
            if self.is_new(header.sequence) {
                break;
            }

            duplicate_polls += 1;
            log::trace!("frame {} already captured, polling again", header.sequence);

            if let Some(max) = self.max_duplicate_polls {
                if duplicate_polls >= max {
                    return Err(CaptureError::SequenceStalled {
                        sequence: header.sequence,
                        polls: duplicate_polls,
                    });
                }
            }
        }

        // frame has changed, do the more expensive buffer copy
        let header = source.poll_frame(buffer)?;
        self.last_accepted = Some(header.sequence);
        Ok(header)
    }
}
