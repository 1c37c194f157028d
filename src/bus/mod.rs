//! ISA bus words and responses
//!
//! The bus capture program delivers one 32-bit word per IOW or IOR cycle and
//! expects response words back on the same state machine. This module decodes
//! the incoming words into [`BusTransaction`]s and encodes [`Response`]s into
//! the words the capture program understands.
//!
//! Word layout:
//!
//! | Direction | Bits        | Meaning                  |
//! |-----------|-------------|--------------------------|
//! | IOW       | 17..8       | port (10-bit)            |
//! | IOW       | 7..0        | data byte                |
//! | IOR       | 9..0        | port (10-bit)            |

pub mod simulated;

pub use simulated::{SimChannel, SimulatedBus};

/// ISA I/O decode is 10 bits wide
pub const PORT_MASK: u16 = 0x3FF;

/// Response word that keeps IOCHRDY asserted (host held in a wait-state)
pub const IO_WAIT: u32 = 0xFFFF_FFFF;
/// Response word that releases the bus without driving data
pub const IO_END: u32 = 0x0000_0000;
/// OR'd into a read response so the capture program switches the data pins to outputs
pub const IOR_SET_VALUE: u32 = 0x0000_FF00;

/// Transfer direction of a bus cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// IOR: the host reads a byte from the card
    Read,
    /// IOW: the host writes a byte to the card
    Write,
}

/// One decoded bus cycle
///
/// Lives only for the duration of a single dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTransaction {
    /// Transfer direction
    pub direction: Direction,
    /// 10-bit port address
    pub port: u16,
    /// Data byte (writes only)
    pub data: Option<u8>,
}

impl BusTransaction {
    /// Build a write transaction
    pub fn write(port: u16, value: u8) -> Self {
        BusTransaction {
            direction: Direction::Write,
            port: port & PORT_MASK,
            data: Some(value),
        }
    }

    /// Build a read transaction
    pub fn read(port: u16) -> Self {
        BusTransaction {
            direction: Direction::Read,
            port: port & PORT_MASK,
            data: None,
        }
    }

    /// Decode a word popped from the IOW FIFO
    #[inline(always)]
    pub fn decode_write(word: u32) -> Self {
        Self::write(((word >> 8) as u16) & PORT_MASK, (word & 0xFF) as u8)
    }

    /// Decode a word popped from the IOR FIFO
    #[inline(always)]
    pub fn decode_read(word: u32) -> Self {
        Self::read((word as u16) & PORT_MASK)
    }

    /// Encode back into the capture program's word format
    ///
    /// Used by host-side event sources to feed the FIFOs.
    pub fn encode(&self) -> u32 {
        match self.direction {
            Direction::Write => {
                ((self.port as u32) << 8) | self.data.unwrap_or(0) as u32
            }
            Direction::Read => self.port as u32,
        }
    }
}

/// Response pushed back to the bus capture program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Keep the host waiting; a terminal response follows
    Hold,
    /// Release the bus without driving data
    Done,
    /// Release the bus and drive a data byte (reads only)
    Data(u8),
}

impl Response {
    /// Encode as the 32-bit word written to the capture program
    #[inline(always)]
    pub const fn word(self) -> u32 {
        match self {
            Response::Hold => IO_WAIT,
            Response::Done => IO_END,
            Response::Data(value) => IOR_SET_VALUE | value as u32,
        }
    }

    /// Decode a response word
    pub fn from_word(word: u32) -> Self {
        match word {
            IO_WAIT => Response::Hold,
            IO_END => Response::Done,
            w => Response::Data((w & 0xFF) as u8),
        }
    }

    /// Whether this response closes the transaction
    pub fn is_terminal(self) -> bool {
        !matches!(self, Response::Hold)
    }
}

/// Destination of response words for one bus direction
pub trait ResponseSink {
    /// Push a response word for the event currently being serviced
    fn push(&mut self, response: Response);
}

/// One direction of the bus event source
///
/// Each channel is a FIFO of decoded words plus the response path back to the
/// capture program. For every popped word the dispatcher pushes exactly one
/// terminal [`Response`], optionally preceded by a single [`Response::Hold`].
pub trait BusChannel: ResponseSink {
    /// Whether at least one word is waiting
    fn has_event(&self) -> bool;

    /// Pop the oldest word, if any
    fn pop(&mut self) -> Option<u32>;
}

impl ResponseSink for Vec<Response> {
    fn push(&mut self, response: Response) {
        Vec::push(self, response);
    }
}
