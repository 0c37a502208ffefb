use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vivecal_core::{CameraMatrix, PoseMatrix, Real};

/// Row-major matrix as stored in the calibration record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Real>,
}

impl MatrixRecord {
    fn row_major(rows: usize, cols: usize, at: impl Fn(usize, usize) -> Real) -> Self {
        let data = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .map(|(r, c)| at(r, c))
            .collect();
        Self { rows, cols, data }
    }

    pub fn from_camera_matrix(m: &CameraMatrix) -> Self {
        Self::row_major(3, 3, |r, c| m[(r, c)])
    }

    pub fn from_pose(m: &PoseMatrix) -> Self {
        Self::row_major(3, 4, |r, c| m[(r, c)])
    }

    pub fn to_pose(&self) -> Option<PoseMatrix> {
        if self.rows != 3 || self.cols != 4 || self.data.len() != 12 {
            return None;
        }
        Some(PoseMatrix::from_row_slice(&self.data))
    }
}

/// Structured part of an exported dataset: frame count, camera matrix, and
/// one `Pose_Matrix_<i>` entry per image `<i>.png`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub nr_of_frames: usize,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(rename = "Camera_Matrix")]
    pub camera_matrix: MatrixRecord,
    #[serde(flatten)]
    pub poses: BTreeMap<String, MatrixRecord>,
}

impl CalibrationRecord {
    pub fn pose_key(index: usize) -> String {
        format!("Pose_Matrix_{index}")
    }

    pub fn image_name(index: usize) -> String {
        format!("{index}.png")
    }

    pub fn pose(&self, index: usize) -> Option<PoseMatrix> {
        self.poses.get(&Self::pose_key(index))?.to_pose()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_matrix_is_row_major() {
        let pose = PoseMatrix::from_fn(|r, c| (r * 10 + c) as f64);
        let record = MatrixRecord::from_pose(&pose);

        assert_eq!(record.data[..4], [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(record.data[4], 10.0);
        assert_eq!(record.to_pose(), Some(pose));
    }

    #[test]
    fn wrong_shape_is_not_a_pose() {
        let k = MatrixRecord::from_camera_matrix(&CameraMatrix::identity());
        assert_eq!(k.data, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(k.to_pose(), None);
    }
}
