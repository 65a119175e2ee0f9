use std::time::Instant;

use crate::alignment::frame_synchronizer::FrameSynchronizer;
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::depth_sensor::{DepthSensor, DeviceInfo};
use crate::capture::sensor_session::{SensorSession, SessionCloser};
use crate::colorizing::color_scheme::ColorScheme;
use crate::colorizing::depth_colorizer::DepthColorizer;
use crate::redaction::face_redactor::FaceRedactor;
use crate::shared::calibration::Calibration;
use crate::shared::depth_frame::DepthFrame;
use crate::shared::detection_box::DetectionBox;
use crate::shared::frame::Frame;
use crate::shared::settings::Settings;

use super::pipeline_error::PipelineError;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// One acquisition cycle's output, owned by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct RedactedFramePair {
    /// Color image with faces filled when anonymization was on.
    pub color: Frame,
    /// Colorized aligned depth, same extent and fills as `color`.
    pub depth: Frame,
    /// Aligned raw depth, zeroed inside the same boxes.
    pub raw_depth: DepthFrame,
    pub boxes: Vec<DetectionBox>,
    pub sequence: u64,
}

/// Single entry point over session, synchronizer, colorizer and redactor.
///
/// Cycles are strictly sequential: `acquire` takes `&mut self`, so a second
/// call cannot start before the previous one returns.
pub struct AcquisitionPipeline {
    session: SensorSession,
    synchronizer: FrameSynchronizer,
    colorizer: DepthColorizer,
    redactor: FaceRedactor,
    logger: Box<dyn PipelineLogger>,
    max_consecutive_timeouts: u32,
    consecutive_timeouts: u32,
    summarized: bool,
}

impl AcquisitionPipeline {
    /// Opens the first available device with the configured streams.
    ///
    /// The redactor (and with it the face model) must already be loaded, so
    /// a bad model never leaves a device claimed.
    pub fn open(
        sensor: &mut dyn DepthSensor,
        settings: &Settings,
        redactor: FaceRedactor,
    ) -> Result<Self, PipelineError> {
        let session = SensorSession::open(sensor, settings.capture_config())?;
        let pipeline = Self::new(
            session,
            FrameSynchronizer::new(settings.frame_timeout()),
            colorizer_for(settings),
            redactor,
        )
        .with_max_consecutive_timeouts(settings.max_consecutive_timeouts);
        Ok(pipeline)
    }

    pub fn new(
        session: SensorSession,
        synchronizer: FrameSynchronizer,
        colorizer: DepthColorizer,
        redactor: FaceRedactor,
    ) -> Self {
        Self {
            session,
            synchronizer,
            colorizer,
            redactor,
            logger: Box::new(NullPipelineLogger),
            max_consecutive_timeouts: 0,
            consecutive_timeouts: 0,
            summarized: false,
        }
    }

    /// Timeouts in a row before `acquire` gives up; `0` retries forever.
    pub fn with_max_consecutive_timeouts(mut self, max: u32) -> Self {
        self.max_consecutive_timeouts = max;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn device(&self) -> &DeviceInfo {
        self.session.device()
    }

    pub fn calibration(&self) -> Calibration {
        self.session.calibration()
    }

    pub fn closer(&self) -> SessionCloser {
        self.session.closer()
    }

    /// Runs one cycle: wait and align, colorize, then redact.
    ///
    /// Returns `Ok(None)` for cycles that produced no pair (an incomplete
    /// frame set or a timeout below the limit). Every `Err` ends the session.
    pub fn acquire(
        &mut self,
        enable_anonymization: bool,
    ) -> Result<Option<RedactedFramePair>, PipelineError> {
        let started = Instant::now();
        let aligned = match self.synchronizer.next_aligned_frame_set(&mut self.session) {
            Ok(set) => set,
            Err(e) if e.is_transient() => return self.skip_cycle(e),
            Err(e) => return Err(e.into()),
        };
        self.consecutive_timeouts = 0;
        self.logger.timing("sync", elapsed_ms(started));

        let t = Instant::now();
        let depth_image = self.colorizer.colorize(&aligned.depth);
        self.logger.timing("colorize", elapsed_ms(t));

        let t = Instant::now();
        let sequence = aligned.color.sequence();
        let redaction = self
            .redactor
            .redact(aligned.color, depth_image, enable_anonymization)
            .map_err(|e| PipelineError::Redaction(e.to_string()))?;
        let mut raw_depth = aligned.depth;
        for b in &redaction.boxes {
            raw_depth.clear_region(b);
        }
        self.logger.timing("redact", elapsed_ms(t));
        self.logger.metric("faces", redaction.boxes.len() as f64);
        self.logger.frame_delivered(sequence);

        Ok(Some(RedactedFramePair {
            color: redaction.color,
            depth: redaction.depth,
            raw_depth,
            boxes: redaction.boxes,
            sequence,
        }))
    }

    /// Absorbs a per-cycle capture failure, escalating once the
    /// consecutive timeout limit is reached.
    fn skip_cycle(&mut self, error: CaptureError) -> Result<Option<RedactedFramePair>, PipelineError> {
        let CaptureError::FrameTimeout(waited) = error else {
            // The device answered, so the timeout streak is broken.
            self.consecutive_timeouts = 0;
            self.logger.frame_skipped("incomplete");
            log::debug!("{error}, skipping cycle");
            return Ok(None);
        };

        self.logger.frame_skipped("timeout");
        self.consecutive_timeouts += 1;
        if self.max_consecutive_timeouts > 0
            && self.consecutive_timeouts >= self.max_consecutive_timeouts
        {
            return Err(PipelineError::TimeoutsExhausted(self.consecutive_timeouts));
        }
        log::warn!(
            "no frames within {}ms ({} in a row)",
            waited.as_millis(),
            self.consecutive_timeouts
        );
        Ok(None)
    }

    /// Stops capture, releases the device and emits the session summary.
    pub fn close(&mut self) {
        self.session.close();
        if !self.summarized {
            self.summarized = true;
            self.logger.summary();
        }
    }
}

/// Colorizer configured from settings; an unknown preset falls back to the
/// black-to-white ramp.
pub fn colorizer_for(settings: &Settings) -> DepthColorizer {
    let scheme = ColorScheme::from_preset(settings.color_preset).unwrap_or_else(|| {
        log::warn!(
            "unknown color preset {}, using {}",
            settings.color_preset,
            ColorScheme::BlackToWhite
        );
        ColorScheme::BlackToWhite
    });
    DepthColorizer::new(scheme)
        .with_equalization(settings.equalize_histogram)
        .with_range(settings.min_distance_m, settings.max_distance_m)
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
