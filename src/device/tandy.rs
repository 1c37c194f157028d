//! Tandy 3-voice sound (SN76489)
//!
//! The bus side only forwards bytes: every write at the base port is pushed
//! onto the renderer queue and the host is released before the push. The
//! SN76489 latch/data decoding happens on the rendering context.

use super::{Device, DeviceKind, PortRole, PortSpan, ReadAccess, Renderer, WriteTiming};
use crate::queue::{command_queue, CommandConsumer, CommandProducer};
use crate::Result;

const REGION: &[PortSpan] = &[PortSpan {
    start: 0,
    len: 1,
    role: PortRole::Data,
    write: Some(WriteTiming::Fast),
    read: ReadAccess::None,
}];

/// Bus-facing half of the Tandy personality
#[derive(Debug)]
pub struct Tandy {
    commands: CommandProducer<u8>,
}

impl Tandy {
    /// Create the device and its renderer, joined by a queue of `capacity` bytes
    pub fn with_queue(capacity: usize) -> Result<(Self, TandyRenderer)> {
        let (commands, consumer) = command_queue(capacity)?;
        Ok((
            Tandy { commands },
            TandyRenderer {
                commands: consumer,
                registers: Sn76489Registers::default(),
            },
        ))
    }

    /// Bytes lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.commands.dropped()
    }

    /// Bytes waiting for the renderer
    pub fn pending(&self) -> usize {
        self.commands.len()
    }
}

impl Device for Tandy {
    const KIND: DeviceKind = DeviceKind::Tandy;
    const DEFAULT_BASE_PORT: u16 = 0x2C0;
    const REGION: &'static [PortSpan] = REGION;

    #[inline]
    fn write(&mut self, _offset: u16, value: u8) {
        self.commands.push(value);
    }

    fn read(&mut self, _offset: u16) -> u8 {
        0xFF
    }
}

/// SN76489 register file
///
/// Three 10-bit tone periods, one noise control nibble and four 4-bit
/// attenuators (0x0 loudest, 0xF off).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sn76489Registers {
    /// Tone channel periods
    pub tone: [u16; 3],
    /// Noise control (feedback bit and shift rate)
    pub noise: u8,
    /// Attenuation for tone 0-2 and noise
    pub attenuation: [u8; 4],
    latched_channel: u8,
    latched_volume: bool,
}

impl Default for Sn76489Registers {
    fn default() -> Self {
        Sn76489Registers {
            tone: [0; 3],
            noise: 0,
            attenuation: [0x0F; 4],
            latched_channel: 0,
            latched_volume: false,
        }
    }
}

impl Sn76489Registers {
    /// Apply one byte as written to the chip
    pub fn write(&mut self, byte: u8) {
        if byte & 0x80 != 0 {
            self.latched_channel = (byte >> 5) & 0x03;
            self.latched_volume = byte & 0x10 != 0;
            self.apply(byte & 0x0F, true);
        } else {
            self.apply(byte & 0x3F, false);
        }
    }

    fn apply(&mut self, data: u8, latch: bool) {
        let channel = usize::from(self.latched_channel);
        if self.latched_volume {
            self.attenuation[channel] = data & 0x0F;
        } else if channel == 3 {
            self.noise = data & 0x07;
        } else if latch {
            self.tone[channel] = (self.tone[channel] & 0x3F0) | u16::from(data);
        } else {
            self.tone[channel] = (self.tone[channel] & 0x00F) | (u16::from(data) << 4);
        }
    }
}

/// Rendering-side half of the Tandy personality
#[derive(Debug)]
pub struct TandyRenderer {
    commands: CommandConsumer<u8>,
    registers: Sn76489Registers,
}

impl TandyRenderer {
    /// Chip state after every byte consumed so far
    pub fn registers(&self) -> &Sn76489Registers {
        &self.registers
    }
}

impl Renderer for TandyRenderer {
    fn render(&mut self) -> usize {
        let registers = &mut self.registers;
        self.commands.drain(|byte| registers.write(byte))
    }
}
