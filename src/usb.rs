/* USB host access: the capability surface the driver core needs from libusb, and the rusb-backed
 * implementation used against real hardware. */
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};
use tracing::{debug, info};

use crate::error::{GmmkError, Result};

/* Host-side operations on one opened USB device.                  */
/*                                                                 */
/* All methods take `&self` so an implementation can be shared     */
/* between the session (claim/release) and the transport, whose   */
/* transfers run on blocking worker threads.                       */
pub trait UsbDevice: Send + Sync + 'static {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool>;

    fn detach_kernel_driver(&self, interface: u8) -> rusb::Result<()>;

    fn attach_kernel_driver(&self, interface: u8) -> rusb::Result<()>;

    fn claim_interface(&self, interface: u8) -> rusb::Result<()>;

    fn release_interface(&self, interface: u8) -> rusb::Result<()>;

    /* Endpoint addresses of `interface` on the active configuration, */
    /* or `None` if the configuration has no such interface.          */
    fn endpoint_addresses(&self, interface: u8) -> rusb::Result<Option<Vec<u8>>>;

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize>;

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration)
    -> rusb::Result<usize>;
}

/* libusb device opened through rusb. */
pub struct RusbDevice {
    device: Device<Context>,
    handle: Mutex<DeviceHandle<Context>>,
}

impl RusbDevice {
    /* Find the first device matching `vid:pid` and open it. */
    pub fn open(vid: u16, pid: u16) -> Result<Self> {
        let context = Context::new()?;
        let device = context
            .devices()?
            .iter()
            .find(|d| {
                d.device_descriptor()
                    .map(|desc| desc.vendor_id() == vid && desc.product_id() == pid)
                    .unwrap_or(false)
            })
            .ok_or(GmmkError::DeviceNotFound { vid, pid })?;

        info!(
            "Found {vid:04x}:{pid:04x} on bus {:03} address {:03}",
            device.bus_number(),
            device.address()
        );

        let handle = device.open()?;
        Ok(Self {
            device,
            handle: Mutex::new(handle),
        })
    }

    /* A panicked transfer worker leaves the handle itself intact. */
    fn handle(&self) -> MutexGuard<'_, DeviceHandle<Context>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UsbDevice for RusbDevice {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool> {
        self.handle().kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&self, interface: u8) -> rusb::Result<()> {
        self.handle().detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&self, interface: u8) -> rusb::Result<()> {
        self.handle().attach_kernel_driver(interface)
    }

    fn claim_interface(&self, interface: u8) -> rusb::Result<()> {
        self.handle().claim_interface(interface)
    }

    fn release_interface(&self, interface: u8) -> rusb::Result<()> {
        self.handle().release_interface(interface)
    }

    fn endpoint_addresses(&self, interface: u8) -> rusb::Result<Option<Vec<u8>>> {
        let config = self.device.active_config_descriptor()?;
        let Some(iface) = config.interfaces().find(|i| i.number() == interface) else {
            return Ok(None);
        };

        let addresses: Vec<u8> = iface
            .descriptors()
            .flat_map(|alt| {
                alt.endpoint_descriptors()
                    .map(|ep| ep.address())
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!("Interface {interface} endpoints: {:02x?}", addresses);
        Ok(Some(addresses))
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle().write_interrupt(endpoint, buf, timeout)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.handle().read_interrupt(endpoint, buf, timeout)
    }
}
