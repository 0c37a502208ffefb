use std::path::PathBuf;

use serde::Deserialize;
use vivecal_core::{
    frame::RawFrame, sample::CaptureSample, CameraIntrinsics, CameraMatrix, Dataset, PoseMatrix,
};

use crate::{directory_writer::DirectoryWriter, ExportError};

/// Destination of a calibration dataset.
///
/// The exporter calls `write_header` once, then `write_image` and
/// `write_pose` for every index in order, then `finish`.
pub trait DatasetWriter {
    fn write_header(
        &mut self,
        frame_count: usize,
        intrinsics: &CameraIntrinsics,
        camera_matrix: &CameraMatrix,
    ) -> Result<(), ExportError>;

    fn write_image(&mut self, index: usize, frame: &RawFrame) -> Result<(), ExportError>;

    fn write_pose(&mut self, index: usize, pose: &PoseMatrix) -> Result<(), ExportError>;

    fn finish(&mut self) -> Result<(), ExportError>;
}

/// Writes every sample of `samples` through `writer` and returns the number
/// of exported samples.
///
/// Samples without a valid pose are exported with their zeroed matrix. The
/// first failing write aborts the export; whatever was already written stays.
pub fn export<D, W>(
    samples: &D,
    intrinsics: &CameraIntrinsics,
    writer: &mut W,
) -> Result<usize, ExportError>
where
    D: Dataset<CaptureSample>,
    W: DatasetWriter + ?Sized,
{
    let count = samples.len();
    writer.write_header(count, intrinsics, &intrinsics.camera_matrix())?;

    let mut invalid_poses = 0;
    for (index, sample) in samples.iter().enumerate() {
        writer.write_image(index, &sample.frame)?;
        writer.write_pose(index, &sample.pose.rows)?;
        if !sample.pose.valid {
            invalid_poses += 1;
        }
    }

    writer.finish()?;

    if invalid_poses > 0 {
        log::warn!("{invalid_poses} of {count} exported samples carry no valid pose");
    }
    Ok(count)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG images and a JSON record.
    Png,
    /// PNG images and an OpenCV `FileStorage` XML record.
    OpenCv,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportCfg {
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    // defaults to Poses.json / Poses.xml depending on the format
    pub record_name: Option<String>,
}

impl Default for ExportCfg {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("calibration"),
            format: ExportFormat::Png,
            record_name: None,
        }
    }
}

impl ExportCfg {
    /// Creates the output directory and the writer for the configured format.
    pub fn finalize(self) -> Result<Box<dyn DatasetWriter>, ExportError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ExportError::io(&self.output_dir, e))?;

        match self.format {
            ExportFormat::Png => {
                let record_name = self.record_name.unwrap_or_else(|| "Poses.json".into());
                Ok(Box::new(DirectoryWriter::new(self.output_dir, record_name)))
            }
            #[cfg(feature = "opencv")]
            ExportFormat::OpenCv => {
                let record_name = self.record_name.unwrap_or_else(|| "Poses.xml".into());
                Ok(Box::new(crate::opencv_writer::OpenCvWriter::new(
                    self.output_dir,
                    record_name,
                )))
            }
            #[cfg(not(feature = "opencv"))]
            format @ ExportFormat::OpenCv => Err(ExportError::UnsupportedFormat(format)),
        }
    }
}
