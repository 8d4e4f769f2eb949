/* Error taxonomy for the GMMK driver core: device discovery, interface claim, and per-transfer
 * failures. The binary wraps these in anyhow at the top level. */
use std::time::Duration;

use thiserror::Error;

use crate::frame::FRAME_LEN;

/* Errors that may occur while talking to the keyboard. */
/*                                                       */
/* Discovery and claim failures are fatal for the run;   */
/* transfer failures abort the in-flight operation only. */
#[derive(Debug, Error)]
pub enum GmmkError {
    #[error("Device {vid:04x}:{pid:04x} not found")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("Failed to claim interface {interface}: {source}")]
    ClaimFailed {
        interface: u8,
        #[source]
        source: rusb::Error,
    },

    #[error("Failed to release interface {interface}: {source}")]
    ReleaseFailed {
        interface: u8,
        #[source]
        source: rusb::Error,
    },

    #[error("Interface {interface} not present on the active configuration")]
    InterfaceMissing { interface: u8 },

    #[error("Endpoint {address:#04x} not present on the claimed interface")]
    EndpointMissing { address: u8 },

    #[error("Transfer on endpoint {endpoint:#04x} timed out after {}ms", .timeout.as_millis())]
    TransferTimeout { endpoint: u8, timeout: Duration },

    #[error("Transfer on endpoint {endpoint:#04x} failed: {source}")]
    TransferError {
        endpoint: u8,
        #[source]
        source: rusb::Error,
    },

    #[error("Short write on endpoint {endpoint:#04x}: {written} of {} bytes", FRAME_LEN)]
    ShortWrite { endpoint: u8, written: usize },

    #[error("Transfer on endpoint {endpoint:#04x} aborted: {reason}")]
    TransferAborted { endpoint: u8, reason: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

impl GmmkError {
    /* Classify a libusb transfer error: timeouts are kept distinct so callers can decide on retry. */
    pub fn from_transfer(endpoint: u8, timeout: Duration, source: rusb::Error) -> Self {
        match source {
            rusb::Error::Timeout => GmmkError::TransferTimeout { endpoint, timeout },
            source => GmmkError::TransferError { endpoint, source },
        }
    }

    /* True for the recoverable per-transfer failures (timeout or I/O). */
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            GmmkError::TransferTimeout { .. }
                | GmmkError::TransferError { .. }
                | GmmkError::ShortWrite { .. }
                | GmmkError::TransferAborted { .. }
        )
    }
}

pub type Result<T, E = GmmkError> = std::result::Result<T, E>;
