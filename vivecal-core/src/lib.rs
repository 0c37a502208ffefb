mod dataset;
pub use dataset::*;
mod camera;
pub use camera::*;
mod error;
pub use error::*;
pub mod frame;
pub mod sample;

use sophus::nalgebra::{Matrix3, Matrix3x4};

pub type Real = f64;
pub type CameraMatrix = Matrix3<Real>;
pub type PoseMatrix = Matrix3x4<Real>;
