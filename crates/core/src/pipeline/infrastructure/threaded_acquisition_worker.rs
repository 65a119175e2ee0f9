use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::sensor_session::SessionCloser;
use crate::pipeline::acquisition_pipeline::{AcquisitionPipeline, RedactedFramePair};
use crate::pipeline::pipeline_error::PipelineError;

/// Lifecycle notifications from the acquisition thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// The session ended with an error; no further frames will arrive.
    Failed(PipelineError),
    /// The thread exited and the device was released.
    Stopped,
}

/// Runs `AcquisitionPipeline::acquire` in a loop on a dedicated thread.
///
/// Frames are delivered through a channel holding at most one pair. When
/// the consumer falls behind, the unread pair is replaced by the newer one,
/// so a display loop always sees the freshest frame.
pub struct AcquisitionWorker {
    frames: Receiver<RedactedFramePair>,
    events: Receiver<WorkerEvent>,
    anonymize: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    closer: SessionCloser,
    handle: Option<JoinHandle<()>>,
}

impl AcquisitionWorker {
    pub fn spawn(pipeline: AcquisitionPipeline, anonymize: bool) -> std::io::Result<Self> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(1);
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let anonymize = Arc::new(AtomicBool::new(anonymize));
        let stop = Arc::new(AtomicBool::new(false));
        let closer = pipeline.closer();

        let handle = std::thread::Builder::new().name("acquisition".into()).spawn({
            let frame_rx = frame_rx.clone();
            let anonymize = anonymize.clone();
            let stop = stop.clone();
            move || run(pipeline, frame_tx, frame_rx, event_tx, anonymize, stop)
        })?;

        Ok(Self {
            frames: frame_rx,
            events: event_rx,
            anonymize,
            stop,
            closer,
            handle: Some(handle),
        })
    }

    pub fn frames(&self) -> &Receiver<RedactedFramePair> {
        &self.frames
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Takes the pending pair, if one arrived since the last call.
    pub fn latest(&self) -> Option<RedactedFramePair> {
        self.frames.try_recv().ok()
    }

    /// Applies from the next cycle on.
    pub fn set_anonymize(&self, enabled: bool) {
        self.anonymize.store(enabled, Ordering::Relaxed);
    }

    pub fn anonymize(&self) -> bool {
        self.anonymize.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Closes the session (unblocking a pending wait) and joins the thread.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.closer.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("acquisition thread panicked");
            }
        }
    }
}

impl Drop for AcquisitionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut pipeline: AcquisitionPipeline,
    frame_tx: Sender<RedactedFramePair>,
    frame_rx: Receiver<RedactedFramePair>,
    event_tx: Sender<WorkerEvent>,
    anonymize: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) {
    log::info!("acquisition started on {}", pipeline.device().serial);
    while !stop.load(Ordering::Relaxed) {
        match pipeline.acquire(anonymize.load(Ordering::Relaxed)) {
            Ok(Some(pair)) => {
                if !deliver_latest(&frame_tx, &frame_rx, pair) {
                    break;
                }
            }
            Ok(None) => {}
            Err(PipelineError::Capture(CaptureError::SessionClosed))
                if stop.load(Ordering::Relaxed) => {}
            Err(e) => {
                log::error!("acquisition failed: {e}");
                let _ = event_tx.send(WorkerEvent::Failed(e));
                break;
            }
        }
    }
    pipeline.close();
    let _ = event_tx.send(WorkerEvent::Stopped);
}

/// Sends `pair`, evicting an unread older pair. Returns `false` once every
/// consumer is gone.
fn deliver_latest(
    tx: &Sender<RedactedFramePair>,
    rx: &Receiver<RedactedFramePair>,
    pair: RedactedFramePair,
) -> bool {
    let mut pending = pair;
    loop {
        match tx.try_send(pending) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                let _ = rx.try_recv();
                pending = back;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::synthetic_sensor::SyntheticSensor;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::redaction::face_redactor::FaceRedactor;
    use crate::redaction::infrastructure::solid_fill_redactor::SolidFillRedactor;
    use crate::shared::depth_frame::DepthFrame;
    use crate::shared::detection_box::DetectionBox;
    use crate::shared::frame::Frame;
    use crate::shared::settings::Settings;
    use std::time::{Duration, Instant};

    struct FixedDetector;

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectionBox>, Box<dyn std::error::Error>> {
            Ok(vec![DetectionBox::new(0, 0, 4, 4, 0.9)])
        }
    }

    fn pipeline(serial: &str) -> AcquisitionPipeline {
        let mut sensor = SyntheticSensor::with_serial(serial);
        let settings = Settings {
            width: 32,
            height: 24,
            fps: 30,
            ..Settings::default()
        };
        let redactor = FaceRedactor::new(
            Box::new(FixedDetector),
            Box::new(SolidFillRedactor::default()),
        );
        AcquisitionPipeline::open(&mut sensor, &settings, redactor).unwrap()
    }

    fn pair(sequence: u64) -> RedactedFramePair {
        RedactedFramePair {
            color: Frame::filled(2, 2, [0, 0, 0], sequence),
            depth: Frame::filled(2, 2, [0, 0, 0], sequence),
            raw_depth: DepthFrame::zeroed(2, 2, 0.001, sequence),
            boxes: Vec::new(),
            sequence,
        }
    }

    #[test]
    fn test_deliver_latest_replaces_unread_pair() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        assert!(deliver_latest(&tx, &rx, pair(1)));
        assert!(deliver_latest(&tx, &rx, pair(2)));
        assert_eq!(rx.try_recv().unwrap().sequence, 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_deliver_latest_detects_disconnect() {
        let (tx, rx) = crossbeam_channel::bounded::<RedactedFramePair>(1);
        drop(rx);
        let (_, orphan) = crossbeam_channel::bounded(1);
        assert!(!deliver_latest(&tx, &orphan, pair(1)));
    }

    #[test]
    fn test_worker_delivers_frames_and_stops() {
        let mut worker = AcquisitionWorker::spawn(pipeline("worker-test-deliver"), true).unwrap();
        let pair = worker
            .frames()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(pair.color.pixel(0, 0), &[0, 0, 0]);

        worker.stop();
        assert!(worker.is_finished());
        let events: Vec<_> = worker.events().try_iter().collect();
        assert_eq!(events, vec![WorkerEvent::Stopped]);
    }

    #[test]
    fn test_latest_polls_without_blocking() {
        let worker = AcquisitionWorker::spawn(pipeline("worker-test-latest"), true).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut latest = None;
        while latest.is_none() && Instant::now() < deadline {
            latest = worker.latest();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(latest.unwrap().boxes.len(), 1);
    }

    #[test]
    fn test_anonymize_toggle_applies_to_later_frames() {
        let mut worker = AcquisitionWorker::spawn(pipeline("worker-test-toggle"), true).unwrap();
        worker.set_anonymize(false);
        assert!(!worker.anonymize());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut saw_plain = false;
        while Instant::now() < deadline {
            if let Ok(pair) = worker.frames().recv_timeout(Duration::from_millis(500)) {
                if pair.boxes.is_empty() {
                    saw_plain = true;
                    break;
                }
            }
        }
        worker.stop();
        assert!(saw_plain);
    }

    #[test]
    fn test_stop_releases_device_for_reopen() {
        let mut worker = AcquisitionWorker::spawn(pipeline("worker-test-reopen"), false).unwrap();
        worker.stop();
        drop(worker);
        let _again = pipeline("worker-test-reopen");
    }
}
