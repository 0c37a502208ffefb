use std::fmt;

use sophus::nalgebra::Vector2;

use crate::{CameraMatrix, CaptureError, Real};

/// Frame size as reported by the device, including the raw buffer size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub buffer_size: usize,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, buffer_size: usize) -> Self {
        Self {
            width,
            height,
            buffer_size,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ({} bytes)", self.width, self.height, self.buffer_size)
    }
}

/// Interleaved 8-bit pixel layout. Channel order is whatever the device
/// delivers; no color conversion happens here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }

    /// Infers the layout from `buffer_size / (width * height)`.
    ///
    /// The buffer size has to be an exact multiple of the pixel count; 3 maps
    /// to [`PixelLayout::Rgb8`], 4 to [`PixelLayout::Rgba8`], anything else is
    /// [`CaptureError::UnsupportedFrameLayout`].
    pub fn infer(geometry: &FrameGeometry) -> Result<PixelLayout, CaptureError> {
        let unsupported = CaptureError::UnsupportedFrameLayout {
            width: geometry.width,
            height: geometry.height,
            buffer_size: geometry.buffer_size,
        };

        let pixels = geometry.pixel_count();
        if pixels == 0 || geometry.buffer_size % pixels != 0 {
            return Err(unsupported);
        }

        match geometry.buffer_size / pixels {
            3 => Ok(PixelLayout::Rgb8),
            4 => Ok(PixelLayout::Rgba8),
            _ => Err(unsupported),
        }
    }
}

/// Pinhole intrinsics of the undistorted camera stream. Constant for a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    pub focal_length: Vector2<Real>,
    pub principal_point: Vector2<Real>,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl CameraIntrinsics {
    pub fn new(
        focal_length: Vector2<Real>,
        principal_point: Vector2<Real>,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            focal_length,
            principal_point,
            frame_width,
            frame_height,
        }
    }

    /// 3x3 camera matrix: identity with fx, fy on the diagonal and cx, cy in
    /// the last column.
    pub fn camera_matrix(&self) -> CameraMatrix {
        let mut k = CameraMatrix::identity();
        k[(0, 0)] = self.focal_length.x;
        k[(1, 1)] = self.focal_length.y;
        k[(0, 2)] = self.principal_point.x;
        k[(1, 2)] = self.principal_point.y;
        k
    }
}
