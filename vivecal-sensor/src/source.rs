use vivecal_core::{frame::FrameHeader, CameraIntrinsics, CaptureError, FrameGeometry};

/// Blocking polling interface over a tracked camera.
///
/// Implementations never retry on their own; poll cadence belongs to the
/// caller. Any call against an absent device or an invalid streaming handle
/// fails with [`CaptureError::DeviceUnavailable`].
pub trait FrameSource {
    /// Whether the device is present and has a camera.
    fn is_available(&self) -> bool;

    fn frame_geometry(&self) -> Result<FrameGeometry, CaptureError>;

    fn intrinsics(&self) -> Result<CameraIntrinsics, CaptureError>;

    /// Acquires the video streaming handle. Polls fail until this succeeds.
    fn acquire_stream(&mut self) -> Result<(), CaptureError>;

    /// Header of the current frame, without copying pixels.
    fn poll_header(&mut self) -> Result<FrameHeader, CaptureError>;

    /// Header of the current frame with its pixels copied into `buffer`,
    /// which must hold at least `frame_geometry().buffer_size` bytes. A frame
    /// of any other size is [`CaptureError::FrameGeometryMismatch`].
    fn poll_frame(&mut self, buffer: &mut [u8]) -> Result<FrameHeader, CaptureError>;
}
