use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use super::domain::capture_error::CaptureError;

fn claimed_serials() -> &'static Mutex<HashSet<String>> {
    static CLAIMED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    CLAIMED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive, process-wide ownership of one device serial.
///
/// Held by a sensor session for its whole lifetime; the serial becomes
/// claimable again when the guard drops.
#[derive(Debug)]
pub struct DeviceClaim {
    serial: String,
}

impl DeviceClaim {
    pub fn acquire(serial: &str) -> Result<Self, CaptureError> {
        let mut claimed = claimed_serials()
            .lock()
            .map_err(|_| CaptureError::Backend("device registry poisoned".into()))?;
        if !claimed.insert(serial.to_string()) {
            return Err(CaptureError::DeviceUnavailable {
                serial: serial.to_string(),
                reason: "already opened by another session".into(),
            });
        }
        Ok(Self {
            serial: serial.to_string(),
        })
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        if let Ok(mut claimed) = claimed_serials().lock() {
            claimed.remove(&self.serial);
        }
    }
}
