/* Device selection and transfer timing. The identifiers are fixed for the one supported keyboard;
 * only the timing can be overridden at runtime. */
use std::time::Duration;

pub const VENDOR_ID: u16 = 0x0c45;
pub const PRODUCT_ID: u16 = 0x652f;

/* Interface carrying the vendor command endpoints. */
pub const COMMAND_INTERFACE: u8 = 1;

/* Host to device. */
pub const COMMAND_ENDPOINT: u8 = 0x03;
/* Device to host. */
pub const INTERRUPT_ENDPOINT: u8 = 0x82;

/* Bound on every single transfer. */
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    pub command_endpoint: u8,
    pub interrupt_endpoint: u8,
    pub timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            interface: COMMAND_INTERFACE,
            command_endpoint: COMMAND_ENDPOINT,
            interrupt_endpoint: INTERRUPT_ENDPOINT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DeviceConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
