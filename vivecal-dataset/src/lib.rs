pub mod directory_writer;
mod error;
pub use error::*;
pub mod exporter;
#[cfg(feature = "opencv")]
pub mod opencv_writer;
pub mod record;
pub mod recording_reader;

pub use exporter::{export, DatasetWriter, ExportCfg, ExportFormat};
