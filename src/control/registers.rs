//! Control register map
//!
//! Register indices selected through the control port. Device tuning
//! registers are only recognized when the compiled-in device declares them.

use crate::device::Device;
use std::fmt;

/// Control register index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRegister {
    /// Card magic byte (0xDD) - 0x00
    Magic,
    /// Protocol version - 0x01
    ProtocolVersion,
    /// Firmware identity string - 0x02
    Identity,
    /// Device type code - 0x03
    DeviceType,
    /// Device base port - 0x04
    BasePort,
    /// Device-specific tuning register (e.g. GUS buffer size)
    Tuning(u8),
    /// Firmware update mode and status - 0xFF
    FirmwareUpdate,
}

impl ControlRegister {
    /// Magic register index
    pub const MAGIC: u8 = 0x00;
    /// Protocol version register index
    pub const PROTOCOL_VERSION: u8 = 0x01;
    /// Identity string register index
    pub const IDENTITY: u8 = 0x02;
    /// Device type register index
    pub const DEVICE_TYPE: u8 = 0x03;
    /// Base port register index
    pub const BASE_PORT: u8 = 0x04;
    /// Firmware update register index
    pub const FIRMWARE_UPDATE: u8 = 0xFF;

    /// Resolve a selected index for device `D`
    ///
    /// Returns `None` for indices the firmware does not recognize; selecting
    /// one of those relocks the protocol.
    pub fn decode<D: Device>(index: u8) -> Option<Self> {
        match index {
            Self::MAGIC => Some(ControlRegister::Magic),
            Self::PROTOCOL_VERSION => Some(ControlRegister::ProtocolVersion),
            Self::IDENTITY => Some(ControlRegister::Identity),
            Self::DEVICE_TYPE => Some(ControlRegister::DeviceType),
            Self::BASE_PORT => Some(ControlRegister::BasePort),
            Self::FIRMWARE_UPDATE => Some(ControlRegister::FirmwareUpdate),
            i if D::TUNING_REGISTERS.contains(&i) => Some(ControlRegister::Tuning(i)),
            _ => None,
        }
    }

    /// Raw register index
    pub fn index(&self) -> u8 {
        match self {
            ControlRegister::Magic => Self::MAGIC,
            ControlRegister::ProtocolVersion => Self::PROTOCOL_VERSION,
            ControlRegister::Identity => Self::IDENTITY,
            ControlRegister::DeviceType => Self::DEVICE_TYPE,
            ControlRegister::BasePort => Self::BASE_PORT,
            ControlRegister::Tuning(i) => *i,
            ControlRegister::FirmwareUpdate => Self::FIRMWARE_UPDATE,
        }
    }
}

impl fmt::Display for ControlRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRegister::Magic => write!(f, "0x00 (Magic)"),
            ControlRegister::ProtocolVersion => write!(f, "0x01 (Protocol Version)"),
            ControlRegister::Identity => write!(f, "0x02 (Identity String)"),
            ControlRegister::DeviceType => write!(f, "0x03 (Device Type)"),
            ControlRegister::BasePort => write!(f, "0x04 (Base Port)"),
            ControlRegister::Tuning(i) => write!(f, "{i:#04x} (Device Tuning)"),
            ControlRegister::FirmwareUpdate => write!(f, "0xff (Firmware Update)"),
        }
    }
}
