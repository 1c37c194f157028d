//! Creative Music System / Game Blaster (2x SAA1099)
//!
//! Port map relative to the base port:
//!
//! | Offset | Write                 | Read                 |
//! |--------|-----------------------|----------------------|
//! | 0x0    | chip 0 data           |                      |
//! | 0x1    | chip 0 address        |                      |
//! | 0x2    | chip 1 data           |                      |
//! | 0x3    | chip 1 address        |                      |
//! | 0x4    |                       | 0x7F (detect)        |
//! | 0x6-7  | detect latch          |                      |
//! | 0xA-B  |                       | detect latch         |
//!
//! The detect latch is how the Creative drivers find the card: they write a
//! byte at 0x6/0x7 and expect it back from 0xA/0xB.

use super::{Device, DeviceKind, PortRole, PortSpan, ReadAccess, Renderer, WriteTiming};
use crate::queue::{command_queue, CommandConsumer, CommandProducer};
use crate::Result;

const REGION: &[PortSpan] = &[
    PortSpan {
        start: 0x0,
        len: 4,
        role: PortRole::Data,
        write: Some(WriteTiming::Fast),
        read: ReadAccess::None,
    },
    PortSpan {
        start: 0x4,
        len: 1,
        role: PortRole::Detect,
        write: None,
        read: ReadAccess::Sentinel(0x7F),
    },
    PortSpan {
        start: 0x6,
        len: 2,
        role: PortRole::Detect,
        write: Some(WriteTiming::Fast),
        read: ReadAccess::None,
    },
    PortSpan {
        start: 0xA,
        len: 2,
        role: PortRole::Detect,
        write: None,
        read: ReadAccess::Device,
    },
];

/// One write to a SAA1099 port
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CmsCommand {
    /// Offset 0-3: bit 1 selects the chip, bit 0 selects address vs data
    pub offset: u8,
    /// Byte written
    pub value: u8,
}

impl CmsCommand {
    /// Chip addressed by this command
    pub fn chip(&self) -> usize {
        usize::from((self.offset >> 1) & 1)
    }

    /// Whether this command selects a register rather than writing one
    pub fn is_address(&self) -> bool {
        self.offset & 1 != 0
    }
}

/// Bus-facing half of the CMS personality
#[derive(Debug)]
pub struct Cms {
    commands: CommandProducer<CmsCommand>,
    detect: u8,
}

impl Cms {
    /// Create the device and its renderer, joined by a queue of `capacity` commands
    pub fn with_queue(capacity: usize) -> Result<(Self, CmsRenderer)> {
        let (commands, consumer) = command_queue(capacity)?;
        Ok((
            Cms {
                commands,
                detect: 0xFF,
            },
            CmsRenderer {
                commands: consumer,
                registers: Saa1099Registers::default(),
            },
        ))
    }

    /// Commands lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.commands.dropped()
    }
}

impl Device for Cms {
    const KIND: DeviceKind = DeviceKind::Cms;
    const DEFAULT_BASE_PORT: u16 = 0x220;
    const REGION: &'static [PortSpan] = REGION;

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            0x0..=0x3 => {
                self.commands.push(CmsCommand {
                    offset: offset as u8,
                    value,
                });
            }
            0x6 | 0x7 => self.detect = value,
            _ => {}
        }
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            0xA | 0xB => self.detect,
            _ => 0xFF,
        }
    }
}

/// Register files of both SAA1099 chips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saa1099Registers {
    /// 32 registers per chip
    pub regs: [[u8; 32]; 2],
    selected: [u8; 2],
}

impl Default for Saa1099Registers {
    fn default() -> Self {
        Saa1099Registers {
            regs: [[0; 32]; 2],
            selected: [0; 2],
        }
    }
}

impl Saa1099Registers {
    /// Apply one port write
    pub fn apply(&mut self, command: CmsCommand) {
        let chip = command.chip();
        if command.is_address() {
            self.selected[chip] = command.value & 0x1F;
        } else {
            self.regs[chip][usize::from(self.selected[chip])] = command.value;
        }
    }

    /// Register currently selected on `chip`
    pub fn selected(&self, chip: usize) -> u8 {
        self.selected[chip & 1]
    }
}

/// Rendering-side half of the CMS personality
#[derive(Debug)]
pub struct CmsRenderer {
    commands: CommandConsumer<CmsCommand>,
    registers: Saa1099Registers,
}

impl CmsRenderer {
    /// Chip state after every command consumed so far
    pub fn registers(&self) -> &Saa1099Registers {
        &self.registers
    }
}

impl Renderer for CmsRenderer {
    fn render(&mut self) -> usize {
        let registers = &mut self.registers;
        self.commands.drain(|command| registers.apply(command))
    }
}
