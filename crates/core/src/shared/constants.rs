pub const TARGET_WIDTH: u32 = 640;
pub const TARGET_HEIGHT: u32 = 480;
pub const TARGET_FPS: u32 = 6;

/// librealsense waits this long for a frame set before giving up.
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 5000;

/// Consecutive timeouts absorbed by the pipeline before the session ends.
pub const DEFAULT_MAX_CONSECUTIVE_TIMEOUTS: u32 = 5;

pub const YUNET_MODEL_NAME: &str = "face_detection_yunet_2022mar.onnx";
pub const YUNET_MODEL_URL: &str =
    "https://github.com/opencv/opencv_zoo/raw/main/models/face_detection_yunet/face_detection_yunet_2022mar.onnx";

/// Square input resolution the face model runs at, independent of capture size.
pub const DETECTOR_INPUT_SIZE: u32 = 320;

/// Colorizer preset used by the capture tool: black (near) to white (far).
pub const DEFAULT_COLOR_PRESET: u8 = 3;

pub const COLOR_IMAGE_EXTENSION: &str = "jpeg";
pub const DEPTH_IMAGE_EXTENSION: &str = "tiff";
pub const RAW_DEPTH_IMAGE_EXTENSION: &str = "png";
