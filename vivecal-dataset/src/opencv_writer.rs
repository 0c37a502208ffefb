use std::path::{Path, PathBuf};

use opencv::{
    core::{FileStorage, FileStorage_Mode, Mat, Scalar, Vector, CV_8UC3, CV_8UC4},
    imgcodecs,
    prelude::*,
};
use vivecal_core::{frame::RawFrame, CameraIntrinsics, CameraMatrix, PixelLayout, PoseMatrix};

use crate::{exporter::DatasetWriter, record::CalibrationRecord, ExportError};

/// Writes `<i>.png` through `imgcodecs` and an OpenCV `FileStorage` record
/// that calibration tools can read with `cv::FileStorage`.
///
/// Unlike [`crate::directory_writer::DirectoryWriter`] the record is streamed:
/// a failed export leaves whatever was written so far.
pub struct OpenCvWriter {
    dir: PathBuf,
    record_name: String,
    storage: Option<FileStorage>,
}

impl OpenCvWriter {
    pub fn new(dir: impl Into<PathBuf>, record_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            record_name: record_name.into(),
            storage: None,
        }
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(&self.record_name)
    }
}

fn path_str(path: &Path) -> Result<&str, ExportError> {
    path.to_str().ok_or_else(|| {
        ExportError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
        )
    })
}

impl DatasetWriter for OpenCvWriter {
    fn write_header(
        &mut self,
        frame_count: usize,
        intrinsics: &CameraIntrinsics,
        camera_matrix: &CameraMatrix,
    ) -> Result<(), ExportError> {
        let path = self.record_path();
        let mut storage = FileStorage::new(path_str(&path)?, FileStorage_Mode::WRITE as i32, "")?;
        if !storage.is_opened()? {
            return Err(ExportError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::Other, "FileStorage did not open"),
            ));
        }

        let rows: Vec<[f64; 3]> = (0..3)
            .map(|r| [camera_matrix[(r, 0)], camera_matrix[(r, 1)], camera_matrix[(r, 2)]])
            .collect();

        storage.write("nr_of_frames", frame_count as i32)?;
        storage.write("image_width", intrinsics.frame_width as i32)?;
        storage.write("image_height", intrinsics.frame_height as i32)?;
        storage.write_mat("Camera_Matrix", &Mat::from_slice_2d(&rows)?)?;

        self.storage = Some(storage);
        Ok(())
    }

    fn write_image(&mut self, index: usize, frame: &RawFrame) -> Result<(), ExportError> {
        let path = self.dir.join(CalibrationRecord::image_name(index));
        let typ = match frame.layout {
            PixelLayout::Rgb8 => CV_8UC3,
            PixelLayout::Rgba8 => CV_8UC4,
        };

        let mut image = Mat::new_rows_cols_with_default(
            frame.height as i32,
            frame.width as i32,
            typ,
            Scalar::all(0.),
        )?;
        image.data_bytes_mut()?.copy_from_slice(&frame.pixels);

        if !imgcodecs::imwrite(path_str(&path)?, &image, &Vector::new())? {
            return Err(ExportError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::Other, "imwrite refused the image"),
            ));
        }
        Ok(())
    }

    fn write_pose(&mut self, index: usize, pose: &PoseMatrix) -> Result<(), ExportError> {
        let storage = self.storage.as_mut().ok_or(ExportError::MissingHeader(index))?;
        let rows: Vec<[f64; 4]> = (0..3)
            .map(|r| [pose[(r, 0)], pose[(r, 1)], pose[(r, 2)], pose[(r, 3)]])
            .collect();

        storage.write_mat(&CalibrationRecord::pose_key(index), &Mat::from_slice_2d(&rows)?)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        let mut storage = self.storage.take().ok_or(ExportError::MissingHeader(0))?;
        storage.release()?;
        log::info!("wrote {}", self.record_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_readable_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OpenCvWriter::new(dir.path(), "Poses.xml");
        let intrinsics = CameraIntrinsics::new([10.0, 11.0].into(), [1.0, 0.5].into(), 2, 1);

        writer
            .write_header(1, &intrinsics, &intrinsics.camera_matrix())
            .unwrap();
        let frame = RawFrame {
            width: 2,
            height: 1,
            layout: PixelLayout::Rgb8,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        writer.write_image(0, &frame).unwrap();
        writer.write_pose(0, &PoseMatrix::identity()).unwrap();
        writer.finish().unwrap();

        assert!(dir.path().join("0.png").is_file());
        let xml = std::fs::read_to_string(writer.record_path()).unwrap();
        assert!(xml.contains("<nr_of_frames>1</nr_of_frames>"));
        assert!(xml.contains("<Camera_Matrix"));
        assert!(xml.contains("<Pose_Matrix_0"));
    }
}
