mod config;

use std::{fmt, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use vivecal_core::Dataset;
use vivecal_dataset::{export, recording_reader::RecordingReader};

use crate::config::AppCfg;

/// Capture synchronized camera frames and poses for offline calibration.
#[derive(Parser, Debug)]
#[command(name = "vive_capture", version)]
struct Cli {
    /// Recorded tracked-camera stream (camera.txt + frames.csv)
    #[arg(long)]
    recording: PathBuf,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset output directory, overrides the config
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of samples to capture, overrides the config
    #[arg(long)]
    target_count: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Startup,
    Capture,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Startup => "startup",
            Stage::Capture => "capture",
            Stage::Export => "export",
        };
        write!(f, "{stage} failed")
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(count) => {
            log::info!("calibration dataset with {count} samples written");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<usize> {
    let cfg = AppCfg::load(cli.config.as_deref())
        .context(Stage::Startup)?
        .with_overrides(cli.output, cli.target_count);
    log::debug!("{cfg:?}");

    let mut reader = RecordingReader::open(&cli.recording).context(Stage::Startup)?;
    let capture = cfg.capture.finalize(&mut reader).context(Stage::Startup)?;
    let outcome = capture.run(&mut reader);

    if let Some(error) = &outcome.error {
        if outcome.session.is_empty() {
            return Err(error.clone()).context(Stage::Capture);
        }
        log::warn!(
            "capture stopped after {} of {} samples, exporting what was captured: {error}",
            outcome.session.len(),
            outcome.session.target_count()
        );
    }

    let output_dir = cfg.export.output_dir.clone();
    let mut writer = cfg.export.finalize().context(Stage::Export)?;
    let count =
        export(&outcome.session, &outcome.intrinsics, writer.as_mut()).context(Stage::Export)?;
    log::info!("exported {count} samples to {}", output_dir.display());

    match outcome.error {
        Some(error) => Err(error).context(Stage::Capture),
        None => Ok(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_recording(dir: &Path, sequences: &[u32]) {
        std::fs::write(
            dir.join("camera.txt"),
            "frame_size: 2 2 16\nintrinsics: 100 100 1 1\n",
        )
        .unwrap();
        std::fs::write(dir.join("frame.raw"), [9u8; 16]).unwrap();

        let mut csv = String::from(
            "sequence,pose_valid,tracking,m00,m01,m02,m03,m10,m11,m12,m13,m20,m21,m22,m23,image\n",
        );
        for sequence in sequences {
            csv.push_str(&format!("{sequence},true,running,1,0,0,0,0,1,0,0,0,0,1,0,frame.raw\n"));
        }
        std::fs::write(dir.join("frames.csv"), csv).unwrap();
    }

    fn cli(recording: &Path, output: &Path, target_count: usize) -> Cli {
        Cli {
            recording: recording.to_path_buf(),
            config: None,
            output: Some(output.to_path_buf()),
            target_count: Some(target_count),
        }
    }

    #[test]
    fn captures_and_exports() {
        let recording = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_recording(recording.path(), &[1, 1, 2, 3]);

        let count = run(cli(recording.path(), output.path(), 3)).unwrap();
        assert_eq!(count, 3);
        assert!(output.path().join("Poses.json").is_file());
        assert!(output.path().join("2.png").is_file());
    }

    #[test]
    fn early_disconnect_exports_then_fails() {
        let recording = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_recording(recording.path(), &[1, 2]);

        let error = run(cli(recording.path(), output.path(), 5)).unwrap_err();
        assert!(error.to_string().starts_with("capture failed"));
        assert!(output.path().join("1.png").is_file());
    }

    #[test]
    fn bad_recording_fails_at_startup() {
        let recording = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let error = run(cli(recording.path(), output.path(), 5)).unwrap_err();
        assert_eq!(error.to_string(), "startup failed");
    }
}
