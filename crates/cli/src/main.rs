use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use depthguard_core::capture::domain::depth_sensor::DepthSensor;
use depthguard_core::capture::infrastructure::synthetic_sensor::SyntheticSensor;
use depthguard_core::detection::infrastructure::onnx_yunet_detector::{OnnxYuNetDetector, YuNetConfig};
use depthguard_core::pipeline::acquisition_pipeline::{AcquisitionPipeline, RedactedFramePair};
use depthguard_core::pipeline::infrastructure::threaded_acquisition_worker::{
    AcquisitionWorker, WorkerEvent,
};
use depthguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use depthguard_core::redaction::face_redactor::FaceRedactor;
use depthguard_core::redaction::infrastructure::solid_fill_redactor::SolidFillRedactor;
use depthguard_core::shared::constants::{
    COLOR_IMAGE_EXTENSION, DEPTH_IMAGE_EXTENSION, RAW_DEPTH_IMAGE_EXTENSION,
};
use depthguard_core::shared::settings::Settings;
use depthguard_core::storage::domain::image_writer::ImageWriter;
use depthguard_core::storage::infrastructure::image_file_writer::ImageFileWriter;

/// Capture aligned color and depth frames with faces redacted.
#[derive(Parser)]
#[command(name = "depthguard")]
struct Cli {
    /// Directory the captured frames are written to.
    output: PathBuf,

    /// Number of frame pairs to capture.
    #[arg(long, default_value = "30")]
    frames: usize,

    /// Settings file (defaults to the per-user settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// YuNet ONNX model; downloaded to the model cache when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Capture frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Depth colorization preset: 0 jet, 1 classic, 2 white-to-black, 3 black-to-white.
    #[arg(long)]
    color_preset: Option<u8>,

    /// Only redact detections at or above this confidence (0.0-1.0).
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Keep faces visible.
    #[arg(long)]
    no_anonymize: bool,

    /// Use the built-in synthetic camera instead of a RealSense device.
    #[arg(long)]
    synthetic: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    validate(&cli, &settings)?;

    // Load the model before touching the camera so a bad model never
    // leaves a device claimed.
    let redactor = build_redactor(&settings)?;
    let mut sensor = open_sensor(cli.synthetic)?;
    let pipeline = AcquisitionPipeline::open(sensor.as_mut(), &settings, redactor)?
        .with_logger(Box::new(StdoutPipelineLogger::default()));

    fs::create_dir_all(&cli.output)?;
    write_calibration(&cli.output, &pipeline)?;

    let mut worker = AcquisitionWorker::spawn(pipeline, settings.anonymize)?;
    let writer = ImageFileWriter::new();
    let mut written = 0;

    while written < cli.frames {
        crossbeam_channel::select! {
            recv(worker.frames()) -> msg => match msg {
                Ok(pair) => {
                    save_pair(&writer, &cli.output, written, &pair)?;
                    written += 1;
                }
                Err(_) => break,
            },
            recv(worker.events()) -> msg => match msg {
                Ok(WorkerEvent::Failed(e)) => return Err(e.into()),
                Ok(WorkerEvent::Stopped) | Err(_) => break,
            },
        }
    }

    worker.stop();
    log::info!("Wrote {written} frame pairs to {}", cli.output.display());
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load(),
    };
    if let Some(fps) = cli.fps {
        settings.fps = fps;
    }
    if let Some(preset) = cli.color_preset {
        settings.color_preset = preset;
    }
    if cli.model.is_some() {
        settings.model_path = cli.model.clone();
    }
    if cli.min_confidence.is_some() {
        settings.min_confidence = cli.min_confidence;
    }
    if cli.no_anonymize {
        settings.anonymize = false;
    }
    Ok(settings)
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if cli.frames == 0 {
        return Err("--frames must be at least 1".into());
    }
    if settings.fps == 0 {
        return Err("Frame rate must be positive".into());
    }
    if settings.color_preset > 3 {
        return Err(format!(
            "Color preset must be between 0 and 3, got {}",
            settings.color_preset
        )
        .into());
    }
    if let Some(c) = settings.min_confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {c}").into());
        }
    }
    Ok(())
}

fn build_redactor(settings: &Settings) -> Result<FaceRedactor, Box<dyn std::error::Error>> {
    let config = YuNetConfig {
        input_size: settings.detector_input_size,
        score_threshold: settings.score_threshold,
        nms_threshold: settings.nms_threshold,
        top_k: settings.top_k,
    };
    let detector = OnnxYuNetDetector::load(
        settings.model_path.as_deref(),
        config,
        Some(Box::new(download_progress)),
    )?;

    Ok(FaceRedactor::new(
        Box::new(detector),
        Box::new(SolidFillRedactor::new(settings.fill_color)),
    )
    .with_min_confidence(settings.min_confidence))
}

fn open_sensor(synthetic: bool) -> Result<Box<dyn DepthSensor>, Box<dyn std::error::Error>> {
    if synthetic {
        return Ok(Box::new(SyntheticSensor::new()));
    }
    #[cfg(feature = "realsense")]
    {
        use depthguard_core::capture::infrastructure::realsense_sensor::RealsenseSensor;
        Ok(Box::new(RealsenseSensor::new()?))
    }
    #[cfg(not(feature = "realsense"))]
    {
        Err("built without RealSense support; rebuild with --features realsense or pass --synthetic".into())
    }
}

fn write_calibration(
    dir: &Path,
    pipeline: &AcquisitionPipeline,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = dir.join("calibration.json");
    fs::write(&path, serde_json::to_string_pretty(&pipeline.calibration())?)?;
    log::info!("Calibration written to {}", path.display());
    Ok(())
}

fn save_pair(
    writer: &dyn ImageWriter,
    dir: &Path,
    index: usize,
    pair: &RedactedFramePair,
) -> Result<(), Box<dyn std::error::Error>> {
    writer.write_frame(&dir.join(format!("color_{index:05}.{COLOR_IMAGE_EXTENSION}")), &pair.color)?;
    writer.write_frame(&dir.join(format!("depth_{index:05}.{DEPTH_IMAGE_EXTENSION}")), &pair.depth)?;
    writer.write_depth(
        &dir.join(format!("depth_raw_{index:05}.{RAW_DEPTH_IMAGE_EXTENSION}")),
        &pair.raw_depth,
    )?;
    log::debug!(
        "saved pair {index} (sequence {}, {} faces)",
        pair.sequence,
        pair.boxes.len()
    );
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
