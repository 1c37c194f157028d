//! Device personalities
//!
//! Every emulated legacy device implements [`Device`]: a byte-wide
//! `write`/`read` interface over port offsets relative to its base port, plus
//! a static region table describing which offsets it answers, what they mean
//! and whether a write needs the host held in a wait-state.
//!
//! The dispatch core is generic over `D: Device`, so the personality compiled
//! into a firmware image is resolved at build time and every call from the
//! bus path is statically dispatched.
//!
//! - [`Gus`] - Gravis UltraSound wavetable synthesizer
//! - [`Opl`] - AdLib / OPL2 FM synthesizer
//! - [`Mpu401`] - Roland MPU-401 MIDI interface (UART mode)
//! - [`Tandy`] - Tandy 3-voice (SN76489) PSG
//! - [`Cms`] - Creative Music System / Game Blaster (2x SAA1099) PSG
//! - [`GamePort`] - PC game port fed by a USB joystick

mod cms;
mod game_port;
mod gus;
mod mpu401;
mod opl;
mod tandy;

pub use cms::{Cms, CmsCommand, CmsRenderer, Saa1099Registers};
pub use game_port::{GamePort, GamePortButtons, JoystickFeed, JoystickInput, JoystickReport};
pub use gus::{Gus, DRAM_SIZE, TUNE_AUDIO_BUFFER, TUNE_DMA_INTERVAL};
pub use mpu401::{MidiOut, Mpu401, MpuStatus};
pub use opl::{Opl, OplCommand, OplRenderer};
pub use tandy::{Sn76489Registers, Tandy, TandyRenderer};

/// Device personality, as reported through control register 0x03
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Gravis UltraSound
    Gus,
    /// AdLib / OPL2
    Opl,
    /// MPU-401
    Mpu401,
    /// Tandy 3-voice
    Tandy,
    /// Creative Music System
    Cms,
    /// Game port
    GamePort,
}

impl DeviceKind {
    /// Type code read by host drivers; 0xFF means "unknown"
    pub const fn type_code(self) -> u8 {
        match self {
            DeviceKind::Gus => 0,
            DeviceKind::Opl => 1,
            DeviceKind::Mpu401 => 2,
            DeviceKind::Tandy => 3,
            DeviceKind::Cms => 4,
            DeviceKind::GamePort => 0xFF,
        }
    }

    /// Short lowercase name, matching the Cargo feature
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Gus => "gus",
            DeviceKind::Opl => "opl",
            DeviceKind::Mpu401 => "mpu401",
            DeviceKind::Tandy => "tandy",
            DeviceKind::Cms => "cms",
            DeviceKind::GamePort => "joystick",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait-state class of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTiming {
    /// Release the bus first, then perform the device write
    Fast,
    /// Hold the host until the device write has completed
    Slow,
}

/// What a read at an offset returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAccess {
    /// Offset is write-only; the bus is released without driving data
    None,
    /// Ask the device
    Device,
    /// Fixed autodetect byte, returned without touching device state
    Sentinel(u8),
}

/// Semantic role of a port offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    /// Data register
    Data,
    /// Command register
    Command,
    /// Status register
    Status,
    /// Register index latch
    Address,
    /// Autodetect latch or readback
    Detect,
    /// Configuration / control latch
    Control,
    /// Onboard memory window
    Memory,
}

/// One contiguous run of offsets inside a device region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpan {
    /// First offset, relative to the base port
    pub start: u16,
    /// Number of offsets covered
    pub len: u16,
    /// Meaning of the offsets
    pub role: PortRole,
    /// Write classification, `None` if writes are ignored
    pub write: Option<WriteTiming>,
    /// Read behaviour
    pub read: ReadAccess,
}

impl PortSpan {
    /// Whether `offset` falls inside this span
    #[inline(always)]
    pub const fn contains(&self, offset: u16) -> bool {
        offset >= self.start && offset - self.start < self.len
    }
}

/// Find the span covering `offset` in a region table
#[inline]
pub fn lookup(region: &'static [PortSpan], offset: u16) -> Option<&'static PortSpan> {
    region.iter().find(|span| span.contains(offset))
}

/// Common interface for device personalities
///
/// `write` and `read` run on the bus-facing context while the host may be
/// held in a wait-state, so they must never block. Work that takes longer
/// than a few microseconds belongs on the rendering context, reached through
/// a [`crate::queue`] command queue.
pub trait Device {
    /// Personality reported through control register 0x03
    const KIND: DeviceKind;

    /// Base port used until the host reprograms it
    const DEFAULT_BASE_PORT: u16;

    /// Offsets this device answers, relative to the base port
    const REGION: &'static [PortSpan];

    /// Extra control registers accepted by [`Device::tune`]
    const TUNING_REGISTERS: &'static [u8] = &[];

    /// Whether control register 0x04 reads back the base port
    const REPORTS_BASE_PORT: bool = true;

    /// Resolve `port` against the region for the given base port
    ///
    /// Returns the offset and its span when the port belongs to this device.
    #[inline]
    fn decode(&self, port: u16, base_port: u16) -> Option<(u16, &'static PortSpan)> {
        let offset = port.wrapping_sub(base_port);
        lookup(Self::REGION, offset).map(|span| (offset, span))
    }

    /// Write a byte at `offset`
    fn write(&mut self, offset: u16, value: u8);

    /// Read a byte at `offset`
    fn read(&mut self, offset: u16) -> u8;

    /// The base port changed; recompute anything derived from it
    fn rebase(&mut self, _base_port: u16) {}

    /// Apply a value written to one of [`Device::TUNING_REGISTERS`]
    fn tune(&mut self, _register: u8, _value: u8) {}
}

/// Rendering-side half of a device
///
/// Runs on the rendering context and consumes whatever the bus side
/// produced.
pub trait Renderer: Send {
    /// Apply pending commands, returning how many were consumed
    fn render(&mut self) -> usize;
}

/// Renderer for devices that need no command queue
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRenderer;

impl Renderer for NoRenderer {
    fn render(&mut self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: &[PortSpan] = &[
        PortSpan {
            start: 0,
            len: 4,
            role: PortRole::Data,
            write: Some(WriteTiming::Fast),
            read: ReadAccess::None,
        },
        PortSpan {
            start: 0x100,
            len: 1,
            role: PortRole::Status,
            write: None,
            read: ReadAccess::Sentinel(0x7F),
        },
    ];

    #[test]
    fn test_lookup_spans() {
        assert_eq!(lookup(REGION, 0).map(|s| s.role), Some(PortRole::Data));
        assert_eq!(lookup(REGION, 3).map(|s| s.role), Some(PortRole::Data));
        assert!(lookup(REGION, 4).is_none());
        assert_eq!(lookup(REGION, 0x100).map(|s| s.read), Some(ReadAccess::Sentinel(0x7F)));
        assert!(lookup(REGION, 0x101).is_none());
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(DeviceKind::Gus.type_code(), 0);
        assert_eq!(DeviceKind::Opl.type_code(), 1);
        assert_eq!(DeviceKind::Mpu401.type_code(), 2);
        assert_eq!(DeviceKind::Tandy.type_code(), 3);
        assert_eq!(DeviceKind::Cms.type_code(), 4);
        assert_eq!(DeviceKind::GamePort.type_code(), 0xFF);
    }
}
