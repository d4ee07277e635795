//! Host command transports.
//!
//! Two transports carry the same `KEY:VALUE` protocol:
//!
//! ```text
//!   Serial ── bytes ──▶ LineBuffer ──▶ parse ──▶ dispatch ──▶ reply + "\r\n" (now)
//!   Bus    ── write ──▶ skip register byte ──▶ parse ──▶ dispatch ──▶ BusReplySlot
//!                                                         host poll ◀──┘
//! ```
//!
//! Serial replies are written immediately.  Bus replies wait in a single
//! slot until the host reads; a newer reply replaces an unread one.  The
//! slot is the only state touched from both the main loop and the bus
//! interrupt, so it sits behind a critical section.

pub mod line;
pub mod parse;

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;
use heapless::String;

/// Receive line capacity, terminator slot included.
pub const COMM_BUFFER_SIZE: usize = 16;

/// Reply capacity.
pub const REPLY_BUFFER_SIZE: usize = 32;

/// Most extension callbacks a controller accepts.
pub const MAX_COMMAND_CALLBACKS: usize = 10;

/// Suffix appended to serial replies.
pub const SERIAL_LINE_END: &[u8] = b"\r\n";

pub type Reply = String<REPLY_BUFFER_SIZE>;

/// Which link a command arrived on (and its reply goes back to).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Byte-stream UART, replies flushed immediately.
    Serial,
    /// Addressed bus (I2C), replies held until polled.
    Bus,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Bus => write!(f, "bus"),
        }
    }
}

/// One pending reply for the bus transport.
pub struct BusReplySlot {
    inner: Mutex<RefCell<Option<Reply>>>,
}

impl BusReplySlot {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store `reply`, replacing any unread one.
    pub fn store(&self, reply: Reply) {
        critical_section::with(|cs| {
            self.inner.borrow(cs).replace(Some(reply));
        });
    }

    /// Take the pending reply, leaving the slot empty.
    pub fn take(&self) -> Option<Reply> {
        critical_section::with(|cs| self.inner.borrow(cs).take())
    }

    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow(cs).borrow().is_some())
    }
}

impl Default for BusReplySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BusReplySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusReplySlot")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Copy `text` into a reply, cutting it at capacity.
pub fn reply_from(text: &str) -> Reply {
    let mut r = Reply::new();
    for c in text.chars() {
        if r.push(c).is_err() {
            break;
        }
    }
    r
}
