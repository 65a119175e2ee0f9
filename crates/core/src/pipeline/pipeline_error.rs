use thiserror::Error;

use crate::capture::domain::capture_error::CaptureError;

/// Failures that end an acquisition session.
///
/// Per-cycle conditions (an incomplete frame set, an isolated timeout) never
/// surface here; the pipeline reports them as an empty cycle instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("face redaction failed: {0}")]
    Redaction(String),
    #[error("no frames after {0} consecutive timeouts")]
    TimeoutsExhausted(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_converts() {
        let err: PipelineError = CaptureError::NoDeviceFound.into();
        assert_eq!(err, PipelineError::Capture(CaptureError::NoDeviceFound));
        assert_eq!(err.to_string(), CaptureError::NoDeviceFound.to_string());
    }

    #[test]
    fn test_timeouts_message() {
        let err = PipelineError::TimeoutsExhausted(5);
        assert_eq!(err.to_string(), "no frames after 5 consecutive timeouts");
    }
}
