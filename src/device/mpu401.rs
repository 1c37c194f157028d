//! Roland MPU-401 MIDI interface
//!
//! Only UART mode is implemented: once the host sends 0x3F every data byte
//! goes straight to the MIDI output. Intelligent-mode commands are
//! acknowledged so drivers that probe for them do not hang, but their data
//! bytes are ignored.

use super::{Device, DeviceKind, PortRole, PortSpan, ReadAccess, Renderer, WriteTiming};
use crate::queue::{command_queue, CommandConsumer, CommandProducer};
use crate::Result;
use bitflags::bitflags;

const REGION: &[PortSpan] = &[
    PortSpan {
        start: 0,
        len: 1,
        role: PortRole::Data,
        write: Some(WriteTiming::Slow),
        read: ReadAccess::Device,
    },
    PortSpan {
        start: 1,
        len: 1,
        role: PortRole::Command,
        write: Some(WriteTiming::Slow),
        read: ReadAccess::Device,
    },
];

bitflags! {
    /// Status port bits (active low)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MpuStatus: u8 {
        /// Set while the host may not write (DRR)
        const OUTPUT_BUSY = 0x40;
        /// Set while there is nothing to read (DSR)
        const INPUT_EMPTY = 0x80;
    }
}

/// Command acknowledge byte
pub const MPU_ACK: u8 = 0xFE;

const CMD_RESET: u8 = 0xFF;
const CMD_UART: u8 = 0x3F;
const CMD_VERSION: u8 = 0xAC;
const CMD_REVISION: u8 = 0xAD;

const INPUT_CAPACITY: usize = 16;

/// Bus-facing half of the MPU-401 personality
#[derive(Debug)]
pub struct Mpu401 {
    uart_mode: bool,
    input: [u8; INPUT_CAPACITY],
    input_head: usize,
    input_len: usize,
    last_read: u8,
    midi_out: CommandProducer<u8>,
}

impl Mpu401 {
    /// Create the device and its MIDI output, joined by a queue of `capacity` bytes
    pub fn with_queue(capacity: usize) -> Result<(Self, MidiOut)> {
        let (midi_out, consumer) = command_queue(capacity)?;
        Ok((
            Mpu401 {
                uart_mode: false,
                input: [0; INPUT_CAPACITY],
                input_head: 0,
                input_len: 0,
                last_read: MPU_ACK,
                midi_out,
            },
            MidiOut {
                bytes: consumer,
                sent: Vec::new(),
            },
        ))
    }

    /// Whether the interface is in UART mode
    pub fn uart_mode(&self) -> bool {
        self.uart_mode
    }

    /// Current status byte
    pub fn status(&self) -> MpuStatus {
        let mut status = MpuStatus::empty();
        if self.input_len == 0 {
            status |= MpuStatus::INPUT_EMPTY;
        }
        if self.midi_out.is_full() {
            status |= MpuStatus::OUTPUT_BUSY;
        }
        status
    }

    /// MIDI bytes lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.midi_out.dropped()
    }

    fn queue_input(&mut self, byte: u8) {
        if self.input_len < INPUT_CAPACITY {
            self.input[(self.input_head + self.input_len) % INPUT_CAPACITY] = byte;
            self.input_len += 1;
        }
    }

    fn next_input(&mut self) -> u8 {
        if self.input_len > 0 {
            self.last_read = self.input[self.input_head];
            self.input_head = (self.input_head + 1) % INPUT_CAPACITY;
            self.input_len -= 1;
        }
        self.last_read
    }

    fn write_command(&mut self, command: u8) {
        if self.uart_mode && command != CMD_RESET {
            return;
        }
        match command {
            CMD_RESET => {
                tracing::debug!("mpu-401 reset");
                self.uart_mode = false;
                self.input_len = 0;
                self.queue_input(MPU_ACK);
            }
            CMD_UART => {
                tracing::debug!("mpu-401 entering uart mode");
                self.uart_mode = true;
                self.queue_input(MPU_ACK);
            }
            CMD_VERSION => {
                self.queue_input(MPU_ACK);
                self.queue_input(0x15);
            }
            CMD_REVISION => {
                self.queue_input(MPU_ACK);
                self.queue_input(0x01);
            }
            _ => self.queue_input(MPU_ACK),
        }
    }
}

impl Device for Mpu401 {
    const KIND: DeviceKind = DeviceKind::Mpu401;
    const DEFAULT_BASE_PORT: u16 = 0x330;
    const REGION: &'static [PortSpan] = REGION;

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            0 if self.uart_mode => {
                self.midi_out.push(value);
            }
            0 => {}
            1 => self.write_command(value),
            _ => {}
        }
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            0 => self.next_input(),
            1 => self.status().bits() | 0x3F,
            _ => 0xFF,
        }
    }
}

/// MIDI output side of the MPU-401 personality
///
/// Collects the byte stream the host sent in UART mode, in order.
#[derive(Debug)]
pub struct MidiOut {
    bytes: CommandConsumer<u8>,
    sent: Vec<u8>,
}

impl MidiOut {
    /// Bytes forwarded so far
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Take the forwarded bytes, leaving the log empty
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }
}

impl Renderer for MidiOut {
    fn render(&mut self) -> usize {
        let sent = &mut self.sent;
        self.bytes.drain(|byte| sent.push(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_acknowledges() {
        let (mut mpu, _out) = Mpu401::with_queue(8).unwrap();
        assert_eq!(mpu.read(1) & 0x80, 0x80, "nothing to read after boot");
        mpu.write(1, 0xFF);
        assert_eq!(mpu.read(1) & 0x80, 0x00);
        assert_eq!(mpu.read(0), MPU_ACK);
        assert!(mpu.status().contains(MpuStatus::INPUT_EMPTY));
    }

    #[test]
    fn test_uart_mode_forwards_data() {
        let (mut mpu, mut out) = Mpu401::with_queue(8).unwrap();
        mpu.write(0, 0x90); // ignored outside uart mode
        mpu.write(1, 0x3F);
        assert!(mpu.uart_mode());
        assert_eq!(mpu.read(0), MPU_ACK);

        for b in [0x90, 0x3C, 0x7F] {
            mpu.write(0, b);
        }
        assert_eq!(out.render(), 3);
        assert_eq!(out.sent(), &[0x90, 0x3C, 0x7F]);
    }

    #[test]
    fn test_uart_mode_ignores_commands_except_reset() {
        let (mut mpu, _out) = Mpu401::with_queue(8).unwrap();
        mpu.write(1, 0x3F);
        mpu.read(0);
        mpu.write(1, 0xAC);
        assert!(mpu.status().contains(MpuStatus::INPUT_EMPTY));
        mpu.write(1, 0xFF);
        assert!(!mpu.uart_mode());
        assert_eq!(mpu.read(0), MPU_ACK);
    }

    #[test]
    fn test_output_busy_when_queue_full() {
        let (mut mpu, mut out) = Mpu401::with_queue(2).unwrap();
        mpu.write(1, 0x3F);
        mpu.write(0, 0xF8);
        mpu.write(0, 0xF8);
        assert!(mpu.status().contains(MpuStatus::OUTPUT_BUSY));
        out.render();
        assert!(!mpu.status().contains(MpuStatus::OUTPUT_BUSY));
    }

    #[test]
    fn test_version_query() {
        let (mut mpu, _out) = Mpu401::with_queue(2).unwrap();
        mpu.write(1, 0xAC);
        assert_eq!(mpu.read(0), MPU_ACK);
        assert_eq!(mpu.read(0), 0x15);
    }
}
