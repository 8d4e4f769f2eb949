/* Framed request/response transport over the command-out and interrupt-in endpoint pair. */
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{GmmkError, Result};
use crate::frame::{FRAME_LEN, Frame};
use crate::usb::UsbDevice;

/* One command channel and one acknowledgement channel to the keyboard. */
/*                                                                      */
/* A call resolves only once its transfer has completed or failed.      */
/* Implementations are driven by one caller at a time.                  */
#[async_trait]
pub trait Transport: Send {
    /* Write a full frame to the command endpoint. Returns the bytes   */
    /* the device accepted, which is always the whole frame on success. */
    async fn send_command(&mut self, frame: &Frame) -> Result<Vec<u8>>;

    /* Read one acknowledgement (up to 64 bytes) from the interrupt endpoint. */
    async fn receive_reply(&mut self) -> Result<Vec<u8>>;
}

/* Transport bound to the two endpoints of a claimed interface. */
/*                                                              */
/* libusb transfers block, so each one runs on the blocking     */
/* thread pool and the join handle serves as its completion.    */
pub struct UsbTransport<D: UsbDevice> {
    device: Arc<D>,
    command_endpoint: u8,
    interrupt_endpoint: u8,
    timeout: Duration,
}

impl<D: UsbDevice> UsbTransport<D> {
    pub(crate) fn new(
        device: Arc<D>,
        command_endpoint: u8,
        interrupt_endpoint: u8,
        timeout: Duration,
    ) -> Self {
        Self {
            device,
            command_endpoint,
            interrupt_endpoint,
            timeout,
        }
    }

    pub fn command_endpoint(&self) -> u8 {
        self.command_endpoint
    }

    pub fn interrupt_endpoint(&self) -> u8 {
        self.interrupt_endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn aborted(endpoint: u8, err: tokio::task::JoinError) -> GmmkError {
    GmmkError::TransferAborted {
        endpoint,
        reason: err.to_string(),
    }
}

#[async_trait]
impl<D: UsbDevice> Transport for UsbTransport<D> {
    async fn send_command(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        let device = Arc::clone(&self.device);
        let endpoint = self.command_endpoint;
        let timeout = self.timeout;
        let buf = *frame.as_bytes();

        let written =
            tokio::task::spawn_blocking(move || device.write_interrupt(endpoint, &buf, timeout))
                .await
                .map_err(|e| aborted(endpoint, e))?
                .map_err(|e| GmmkError::from_transfer(endpoint, timeout, e))?;

        debug!("TX {} bytes: {:02x?}", written, &buf[..written.min(FRAME_LEN)]);
        if written != FRAME_LEN {
            return Err(GmmkError::ShortWrite { endpoint, written });
        }
        Ok(buf.to_vec())
    }

    async fn receive_reply(&mut self) -> Result<Vec<u8>> {
        let device = Arc::clone(&self.device);
        let endpoint = self.interrupt_endpoint;
        let timeout = self.timeout;

        let (n, buf) = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; FRAME_LEN];
            device
                .read_interrupt(endpoint, &mut buf, timeout)
                .map(|n| (n.min(FRAME_LEN), buf))
        })
        .await
        .map_err(|e| aborted(endpoint, e))?
        .map_err(|e| GmmkError::from_transfer(endpoint, timeout, e))?;

        debug!("RX {} bytes: {:02x?}", n, &buf[..n]);
        Ok(buf[..n].to_vec())
    }
}
