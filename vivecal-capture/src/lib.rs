pub mod capture;
pub mod sample_pairer;
pub mod frame_sequencer;
pub mod session;

pub use capture::{Capture, CaptureCfg, CaptureOutcome};
pub use session::CaptureSession;
