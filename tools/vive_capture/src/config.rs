use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use vivecal_capture::CaptureCfg;
use vivecal_dataset::ExportCfg;

/// Contents of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppCfg {
    pub capture: CaptureCfg,
    pub export: ExportCfg,
}

impl AppCfg {
    /// Defaults when no path is given; a given file has to exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn with_overrides(
        mut self,
        output_dir: Option<PathBuf>,
        target_count: Option<usize>,
    ) -> Self {
        if let Some(output_dir) = output_dir {
            self.export.output_dir = output_dir;
        }
        if let Some(target_count) = target_count {
            self.capture.target_count = target_count;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivecal_dataset::ExportFormat;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: AppCfg = toml::from_str("[capture]\nmax_duplicate_polls = 500\n").unwrap();
        assert_eq!(cfg.capture.target_count, 100);
        assert_eq!(cfg.capture.max_duplicate_polls, Some(500));
        assert_eq!(cfg.export.format, ExportFormat::Png);
        assert_eq!(cfg.export.output_dir, PathBuf::from("calibration"));
    }

    #[test]
    fn reads_export_section_and_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.toml");
        std::fs::write(
            &path,
            "[capture]\ntarget_count = 20\n\n[export]\noutput_dir = \"out\"\nformat = \"opencv\"\nrecord_name = \"Poses2.xml\"\n",
        )
        .unwrap();

        let cfg = AppCfg::load(Some(&path)).unwrap();
        assert_eq!(cfg.capture.target_count, 20);
        assert_eq!(cfg.export.format, ExportFormat::OpenCv);
        assert_eq!(cfg.export.record_name.as_deref(), Some("Poses2.xml"));

        let cfg = cfg.with_overrides(Some(PathBuf::from("elsewhere")), Some(5));
        assert_eq!(cfg.export.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(cfg.capture.target_count, 5);
    }

    #[test]
    fn unreadable_config_is_an_error() {
        assert!(AppCfg::load(Some(Path::new("/nonexistent/capture.toml"))).is_err());
        assert!(AppCfg::load(None).is_ok());
    }
}
