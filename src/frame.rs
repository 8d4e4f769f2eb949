/* Packet builder: fixed 64-byte command frames and the shared header/footer delimiters. */
/*                                                                                      */
/* Every frame starts with the 0x04 report marker; the fields after it are opcode,      */
/* length and payload bytes. Whatever the caller does not set stays zero.               */
use std::fmt;

use crate::error::{GmmkError, Result};

/* Size of every command and reply frame. */
pub const FRAME_LEN: usize = 64;

/* Byte 0 of every command frame. */
pub const REPORT_MARKER: u8 = 0x04;

/* Transaction delimiters. The firmware only applies the state changes sent between them. */
pub const HEADER: Frame = Frame::build(&[REPORT_MARKER, 0x01, 0x00, 0x01]);
pub const FOOTER: Frame = Frame::build(&[REPORT_MARKER, 0x02, 0x00, 0x02]);

/* A fixed-size command frame. Immutable once built. */
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /* Build a frame from its leading bytes, zero-filling the remainder.  */
    /*                                                                    */
    /* Usable in const context so the fixed frames are computed at build  */
    /* time. Panics if `fields` is longer than a frame; runtime callers   */
    /* with untrusted lengths go through `try_build` instead.             */
    pub const fn build(fields: &[u8]) -> Self {
        assert!(fields.len() <= FRAME_LEN, "frame fields exceed 64 bytes");
        let mut buf = [0u8; FRAME_LEN];
        let mut i = 0;
        while i < fields.len() {
            buf[i] = fields[i];
            i += 1;
        }
        Frame(buf)
    }

    /* Build a frame from an opaque payload buffer of any length. */
    pub fn try_build(fields: &[u8]) -> Result<Self> {
        if fields.len() > FRAME_LEN {
            return Err(GmmkError::InvalidValue(format!(
                "frame payload is {} bytes, maximum is {FRAME_LEN}",
                fields.len()
            )));
        }
        Ok(Self::build(fields))
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /* Opcode byte (offset 1). */
    pub fn opcode(&self) -> u8 {
        self.0[1]
    }

    /* Return a copy with a single byte replaced. */
    pub const fn with_byte(mut self, offset: usize, value: u8) -> Self {
        self.0[offset] = value;
        self
    }

    /* Return a copy with `bytes` written starting at `offset`. */
    pub const fn with_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        assert!(offset + bytes.len() <= FRAME_LEN, "frame write out of bounds");
        let mut i = 0;
        while i < bytes.len() {
            self.0[offset + i] = bytes[i];
            i += 1;
        }
        self
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/* Trailing zeros are elided so log lines stay readable. */
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        write!(f, "Frame({:02x?}", &self.0[..used])?;
        if used < FRAME_LEN {
            write!(f, " + {} zeros", FRAME_LEN - used)?;
        }
        f.write_str(")")
    }
}
