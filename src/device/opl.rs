//! AdLib / OPL2 FM synthesizer
//!
//! The register interface lives on the bus side so the status port can be
//! answered within the wait-state; register writes are forwarded to the FM
//! renderer. The timers are modelled only as far as AdLib autodetection
//! needs: starting an unmasked timer raises its flag immediately.

use super::{Device, DeviceKind, PortRole, PortSpan, ReadAccess, Renderer, WriteTiming};
use crate::queue::{command_queue, CommandConsumer, CommandProducer};
use crate::Result;

const REGION: &[PortSpan] = &[
    PortSpan {
        start: 0,
        len: 1,
        role: PortRole::Address,
        write: Some(WriteTiming::Fast),
        read: ReadAccess::Device,
    },
    PortSpan {
        start: 1,
        len: 1,
        role: PortRole::Data,
        write: Some(WriteTiming::Slow),
        read: ReadAccess::None,
    },
];

/// Timer control register
const REG_TIMER_CONTROL: u8 = 0x04;

/// Status flags
const STATUS_IRQ: u8 = 0x80;
const STATUS_TIMER1: u8 = 0x40;
const STATUS_TIMER2: u8 = 0x20;

/// One register write forwarded to the FM renderer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OplCommand {
    /// Register index
    pub register: u8,
    /// Value written
    pub value: u8,
}

/// Bus-facing half of the OPL personality
#[derive(Debug)]
pub struct Opl {
    address: u8,
    status: u8,
    registers: [u8; 256],
    commands: CommandProducer<OplCommand>,
}

impl Opl {
    /// Create the device and its renderer, joined by a queue of `capacity` commands
    pub fn with_queue(capacity: usize) -> Result<(Self, OplRenderer)> {
        let (commands, consumer) = command_queue(capacity)?;
        Ok((
            Opl {
                address: 0,
                status: 0,
                registers: [0; 256],
                commands,
            },
            OplRenderer {
                commands: consumer,
                registers: [0; 256],
            },
        ))
    }

    /// Register index latched at offset 0
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Last value written to `register`
    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register)]
    }

    /// Commands lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.commands.dropped()
    }

    fn write_timer_control(&mut self, value: u8) {
        if value & STATUS_IRQ != 0 {
            self.status = 0;
            return;
        }
        if value & 0x01 != 0 && value & STATUS_TIMER1 == 0 {
            self.status |= STATUS_TIMER1 | STATUS_IRQ;
        }
        if value & 0x02 != 0 && value & STATUS_TIMER2 == 0 {
            self.status |= STATUS_TIMER2 | STATUS_IRQ;
        }
    }
}

impl Device for Opl {
    const KIND: DeviceKind = DeviceKind::Opl;
    const DEFAULT_BASE_PORT: u16 = 0x388;
    const REGION: &'static [PortSpan] = REGION;

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            0 => self.address = value,
            1 => {
                let register = self.address;
                self.registers[usize::from(register)] = value;
                match register {
                    // Timer counters never reach the synthesizer
                    0x02 | 0x03 => {}
                    REG_TIMER_CONTROL => self.write_timer_control(value),
                    _ => {
                        self.commands.push(OplCommand { register, value });
                    }
                }
            }
            _ => {}
        }
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            0 => self.status,
            _ => 0xFF,
        }
    }
}

/// Rendering-side half of the OPL personality
#[derive(Debug)]
pub struct OplRenderer {
    commands: CommandConsumer<OplCommand>,
    registers: [u8; 256],
}

impl OplRenderer {
    /// Register file as seen by the synthesizer
    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register)]
    }

    /// Whether the key-on bit of `channel` (0-8) is set
    pub fn key_on(&self, channel: u8) -> bool {
        channel < 9 && self.register(0xB0 + channel) & 0x20 != 0
    }
}

impl Renderer for OplRenderer {
    fn render(&mut self) -> usize {
        let registers = &mut self.registers;
        self.commands.drain(|command| {
            registers[usize::from(command.register)] = command.value;
        })
    }
}
