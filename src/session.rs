/* Device lifecycle: exclusive claim on the command interface, bound to its transport.      */
/*                                                                                          */
/* A `Session` is released exactly once: explicitly through `release`, or on drop if the    */
/* caller returns early. A kernel driver detached during acquire is reattached on release.  */
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::DeviceConfig;
use crate::error::{GmmkError, Result};
use crate::keyboard::Keyboard;
use crate::transport::UsbTransport;
use crate::usb::{RusbDevice, UsbDevice};

/* Whether acquire had to detach a kernel driver from the interface. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelDriver {
    Untouched,
    Detached,
}

/* The interface claim. Dropping it releases the interface. */
struct Claim<D: UsbDevice> {
    device: Arc<D>,
    interface: u8,
    kernel_driver: KernelDriver,
    released: bool,
}

impl<D: UsbDevice> Claim<D> {
    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let released = self
            .device
            .release_interface(self.interface)
            .map_err(|source| GmmkError::ReleaseFailed {
                interface: self.interface,
                source,
            });
        if released.is_ok() {
            info!("Released interface {}", self.interface);
        }

        /* Reattach even if the release itself failed. */
        let reattached = match self.kernel_driver {
            KernelDriver::Detached => reattach(&*self.device, self.interface),
            KernelDriver::Untouched => Ok(()),
        };

        released.and(reattached)
    }
}

impl<D: UsbDevice> Drop for Claim<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release interface {}: {e}", self.interface);
        }
    }
}

fn reattach<D: UsbDevice + ?Sized>(device: &D, interface: u8) -> Result<()> {
    device.attach_kernel_driver(interface)?;
    info!("Reattached kernel driver on interface {interface}");
    Ok(())
}

/* Live, exclusively-owned claim on the keyboard's command interface. */
pub struct Session<D: UsbDevice> {
    transport: UsbTransport<D>,
    claim: Claim<D>,
}

impl Session<RusbDevice> {
    /* Find the keyboard on the bus and acquire it. */
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let device = RusbDevice::open(config.vendor_id, config.product_id)?;
        Self::acquire(device, config)
    }
}

impl<D: UsbDevice> Session<D> {
    /* Detach any kernel driver, claim the interface and bind the  */
    /* command/interrupt endpoint pair. Any failure after the      */
    /* detach leaves the device as it was found.                   */
    pub fn acquire(device: D, config: &DeviceConfig) -> Result<Self> {
        let device = Arc::new(device);
        let interface = config.interface;

        let kernel_driver = match device.kernel_driver_active(interface) {
            Ok(true) => {
                device
                    .detach_kernel_driver(interface)
                    .map_err(|source| GmmkError::ClaimFailed { interface, source })?;
                info!("Detached kernel driver from interface {interface}");
                KernelDriver::Detached
            }
            Ok(false) | Err(rusb::Error::NotSupported) => KernelDriver::Untouched,
            Err(source) => return Err(GmmkError::ClaimFailed { interface, source }),
        };

        if let Err(source) = device.claim_interface(interface) {
            if kernel_driver == KernelDriver::Detached
                && let Err(e) = reattach(&*device, interface)
            {
                warn!("Failed to reattach kernel driver after claim failure: {e}");
            }
            return Err(GmmkError::ClaimFailed { interface, source });
        }
        info!("Claimed interface {interface}");

        /* From here on dropping `claim` undoes the claim and detach. */
        let claim = Claim {
            device: Arc::clone(&device),
            interface,
            kernel_driver,
            released: false,
        };

        let endpoints = device
            .endpoint_addresses(interface)?
            .ok_or(GmmkError::InterfaceMissing { interface })?;
        for address in [config.command_endpoint, config.interrupt_endpoint] {
            if !endpoints.contains(&address) {
                return Err(GmmkError::EndpointMissing { address });
            }
        }

        let transport = UsbTransport::new(
            device,
            config.command_endpoint,
            config.interrupt_endpoint,
            config.timeout,
        );
        info!(
            "Bound command endpoint {:#04x}, interrupt endpoint {:#04x}, timeout {:?}",
            transport.command_endpoint(),
            transport.interrupt_endpoint(),
            transport.timeout()
        );

        Ok(Self { transport, claim })
    }

    pub fn kernel_driver(&self) -> KernelDriver {
        self.claim.kernel_driver
    }

    pub fn keyboard(&mut self) -> Keyboard<'_, UsbTransport<D>> {
        Keyboard::new(&mut self.transport)
    }

    /* Release the interface and reattach the kernel driver if it was detached. */
    pub fn release(mut self) -> Result<()> {
        self.claim.release()
    }
}
