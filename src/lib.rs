/* gmmk-rgb: lighting control for the GMMK keyboard (0c45:652f) over its vendor command protocol.
 *
 * Data flow: `Session` claims the command interface and binds a `UsbTransport` to its two
 * endpoints; `Keyboard` turns each lighting operation into a `Script` of framed exchanges and
 * drives it over the transport; releasing the session hands the interface back. */
pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod keyboard;
pub mod script;
pub mod session;
pub mod transport;
pub mod usb;

#[cfg(test)]
mod testing;

pub use config::DeviceConfig;
pub use error::{GmmkError, Result};
pub use frame::{FOOTER, FRAME_LEN, Frame, HEADER};
pub use keyboard::Keyboard;
pub use script::{Script, Step, StepKind};
pub use session::{KernelDriver, Session};
pub use transport::{Transport, UsbTransport};
pub use usb::{RusbDevice, UsbDevice};
