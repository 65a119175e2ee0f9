#[cfg(feature = "realsense")]
pub mod realsense_sensor;
pub mod synthetic_sensor;
