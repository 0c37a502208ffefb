use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use image::ColorType;
use vivecal_core::{frame::RawFrame, CameraIntrinsics, CameraMatrix, PixelLayout, PoseMatrix};

use crate::{
    exporter::DatasetWriter,
    record::{CalibrationRecord, MatrixRecord},
    ExportError,
};

/// Writes `<i>.png` images and a JSON [`CalibrationRecord`] into one
/// directory. The record is written by `finish`.
pub struct DirectoryWriter {
    dir: PathBuf,
    record_name: String,
    record: Option<CalibrationRecord>,
}

impl DirectoryWriter {
    pub fn new(dir: impl Into<PathBuf>, record_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            record_name: record_name.into(),
            record: None,
        }
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(&self.record_name)
    }
}

impl DatasetWriter for DirectoryWriter {
    fn write_header(
        &mut self,
        frame_count: usize,
        intrinsics: &CameraIntrinsics,
        camera_matrix: &CameraMatrix,
    ) -> Result<(), ExportError> {
        self.record = Some(CalibrationRecord {
            nr_of_frames: frame_count,
            image_width: intrinsics.frame_width,
            image_height: intrinsics.frame_height,
            camera_matrix: MatrixRecord::from_camera_matrix(camera_matrix),
            poses: Default::default(),
        });
        Ok(())
    }

    fn write_image(&mut self, index: usize, frame: &RawFrame) -> Result<(), ExportError> {
        let path = self.dir.join(CalibrationRecord::image_name(index));
        let color = match frame.layout {
            PixelLayout::Rgb8 => ColorType::Rgb8,
            PixelLayout::Rgba8 => ColorType::Rgba8,
        };

        image::save_buffer(&path, &frame.pixels, frame.width, frame.height, color)
            .map_err(|source| ExportError::Image { path, source })
    }

    fn write_pose(&mut self, index: usize, pose: &PoseMatrix) -> Result<(), ExportError> {
        let record = self.record.as_mut().ok_or(ExportError::MissingHeader(index))?;
        record
            .poses
            .insert(CalibrationRecord::pose_key(index), MatrixRecord::from_pose(pose));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        let record = self.record.take().ok_or(ExportError::MissingHeader(0))?;
        let path = self.record_path();

        let file = File::create(&path).map_err(|e| ExportError::io(&path, e))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &record)?;
        out.flush().map_err(|e| ExportError::io(&path, e))?;

        log::info!(
            "wrote {} ({} poses) to {}",
            self.record_name,
            record.poses.len(),
            self.dir.display()
        );
        Ok(())
    }
}
