/* Test doubles for the USB host and the transport. Compiled for tests only. */
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{COMMAND_ENDPOINT, INTERRUPT_ENDPOINT};
use crate::error::{GmmkError, Result};
use crate::frame::{FRAME_LEN, Frame};
use crate::transport::Transport;
use crate::usb::UsbDevice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    KernelDriverActive,
    Detach,
    Attach,
    Claim,
    Release,
    Write(u8),
    Read(u8),
}

struct DeviceState {
    kernel_driver: bool,
    endpoints: Option<Vec<u8>>,
    claim_error: Option<rusb::Error>,
    release_error: Option<rusb::Error>,
    attach_error: Option<rusb::Error>,
    fail_at: Option<(usize, rusb::Error)>,
    short_write: Option<usize>,
    replies: VecDeque<Vec<u8>>,
    transfers: usize,
    calls: Vec<Call>,
    writes: Vec<(u8, Vec<u8>)>,
}

/* In-memory USB device: records every host call and fails on request. */
pub struct MockDevice {
    state: Mutex<DeviceState>,
    /* Kept outside `state` so the panic does not poison the call log. */
    panic_on_write: AtomicBool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                kernel_driver: false,
                endpoints: Some(vec![COMMAND_ENDPOINT, INTERRUPT_ENDPOINT]),
                claim_error: None,
                release_error: None,
                attach_error: None,
                fail_at: None,
                short_write: None,
                replies: VecDeque::new(),
                transfers: 0,
                calls: Vec::new(),
                writes: Vec::new(),
            }),
            panic_on_write: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    pub fn with_kernel_driver(self) -> Self {
        self.state().kernel_driver = true;
        self
    }

    pub fn with_endpoints(self, endpoints: Vec<u8>) -> Self {
        self.state().endpoints = Some(endpoints);
        self
    }

    pub fn without_interface(self) -> Self {
        self.state().endpoints = None;
        self
    }

    pub fn fail_claim(self, err: rusb::Error) -> Self {
        self.state().claim_error = Some(err);
        self
    }

    pub fn fail_release(self, err: rusb::Error) -> Self {
        self.state().release_error = Some(err);
        self
    }

    /* Reattaching fails and leaves the kernel driver detached. */
    pub fn fail_attach(self, err: rusb::Error) -> Self {
        self.state().attach_error = Some(err);
        self
    }

    /* Panic inside `write_interrupt`, as a crashed transfer thread would. */
    pub fn panic_on_write(self) -> Self {
        self.panic_on_write.store(true, Ordering::SeqCst);
        self
    }

    /* Fail the `n`th transfer (0-based, writes and reads counted together). */
    pub fn fail_transfer(self, n: usize, err: rusb::Error) -> Self {
        self.state().fail_at = Some((n, err));
        self
    }

    pub fn with_short_write(self, written: usize) -> Self {
        self.state().short_write = Some(written);
        self
    }

    /* Queue a reply; once the queue is empty reads return a zeroed frame. */
    pub fn with_reply(self, reply: Vec<u8>) -> Self {
        self.state().replies.push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state().writes.clone()
    }

    pub fn reads(&self) -> Vec<u8> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Read(ep) => Some(*ep),
                _ => None,
            })
            .collect()
    }

    pub fn kernel_driver_attached(&self) -> bool {
        self.state().kernel_driver
    }

    fn next_transfer(state: &mut DeviceState) -> rusb::Result<()> {
        let n = state.transfers;
        state.transfers += 1;
        match state.fail_at {
            Some((at, err)) if at == n => Err(err),
            _ => Ok(()),
        }
    }
}

impl UsbDevice for MockDevice {
    fn kernel_driver_active(&self, _interface: u8) -> rusb::Result<bool> {
        let mut state = self.state();
        state.calls.push(Call::KernelDriverActive);
        Ok(state.kernel_driver)
    }

    fn detach_kernel_driver(&self, _interface: u8) -> rusb::Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Detach);
        state.kernel_driver = false;
        Ok(())
    }

    fn attach_kernel_driver(&self, _interface: u8) -> rusb::Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Attach);
        if let Some(err) = state.attach_error {
            return Err(err);
        }
        state.kernel_driver = true;
        Ok(())
    }

    fn claim_interface(&self, _interface: u8) -> rusb::Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Claim);
        match state.claim_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn release_interface(&self, _interface: u8) -> rusb::Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Release);
        match state.release_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn endpoint_addresses(&self, _interface: u8) -> rusb::Result<Option<Vec<u8>>> {
        Ok(self.state().endpoints.clone())
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], _timeout: Duration) -> rusb::Result<usize> {
        if self.panic_on_write.load(Ordering::SeqCst) {
            panic!("transfer thread crashed writing to {endpoint:#04x}");
        }
        let mut state = self.state();
        state.calls.push(Call::Write(endpoint));
        Self::next_transfer(&mut state)?;
        state.writes.push((endpoint, buf.to_vec()));
        Ok(state.short_write.unwrap_or(buf.len()))
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> rusb::Result<usize> {
        let mut state = self.state();
        state.calls.push(Call::Read(endpoint));
        Self::next_transfer(&mut state)?;
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| vec![0u8; FRAME_LEN]);
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }
}

/* Lets a test keep its own handle on the mock after a session takes ownership. */
impl UsbDevice for Arc<MockDevice> {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool> {
        (**self).kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&self, interface: u8) -> rusb::Result<()> {
        (**self).detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&self, interface: u8) -> rusb::Result<()> {
        (**self).attach_kernel_driver(interface)
    }

    fn claim_interface(&self, interface: u8) -> rusb::Result<()> {
        (**self).claim_interface(interface)
    }

    fn release_interface(&self, interface: u8) -> rusb::Result<()> {
        (**self).release_interface(interface)
    }

    fn endpoint_addresses(&self, interface: u8) -> rusb::Result<Option<Vec<u8>>> {
        (**self).endpoint_addresses(interface)
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> rusb::Result<usize> {
        (**self).write_interrupt(endpoint, buf, timeout)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        (**self).read_interrupt(endpoint, buf, timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Send(Frame),
    Receive,
}

/* Transport double recording call order, with optional failure on the `n`th call. */
pub struct MockTransport {
    pub events: Vec<Event>,
    fail_at: Option<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            fail_at: None,
        }
    }

    /* Fail the `n`th transport call (0-based, sends and receives counted together). */
    pub fn failing_at(n: usize) -> Self {
        Self {
            events: Vec::new(),
            fail_at: Some(n),
        }
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Send(frame) => Some(*frame),
                Event::Receive => None,
            })
            .collect()
    }

    fn check(&self, endpoint: u8) -> Result<()> {
        if self.fail_at == Some(self.events.len() - 1) {
            return Err(GmmkError::TransferTimeout {
                endpoint,
                timeout: Duration::from_millis(1000),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_command(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        self.events.push(Event::Send(*frame));
        self.check(COMMAND_ENDPOINT)?;
        Ok(frame.as_bytes().to_vec())
    }

    async fn receive_reply(&mut self) -> Result<Vec<u8>> {
        self.events.push(Event::Receive);
        self.check(INTERRUPT_ENDPOINT)?;
        Ok(vec![0u8; FRAME_LEN])
    }
}
