//! Firmware configuration
//!
//! Boot-time settings that would otherwise be compiled in: identity string,
//! base port, command queue depth, GUS tunables and the dispatch driver.
//! Stored as JSON; every field is optional.
//!
//! ```json
//! {
//!   "identity": "picogus v0.1.0 (tandy)",
//!   "base_port": 704,
//!   "queue_capacity": 512,
//!   "driver": "interrupt",
//!   "gus": { "audio_buffer": 16, "dma_interval": 0 }
//! }
//! ```

use crate::bus::PORT_MASK;
use crate::{PicoGusError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default depth of device command queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How the bus-facing context waits for cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Spin on both FIFOs
    #[default]
    Polling,
    /// One handler per FIFO, fired when a word arrives
    Interrupt,
}

impl DriverKind {
    /// Parse a driver name
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "polling" | "poll" => Some(DriverKind::Polling),
            "interrupt" | "irq" => Some(DriverKind::Interrupt),
            _ => None,
        }
    }

    /// Name as accepted by [`DriverKind::from_str`]
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Polling => "polling",
            DriverKind::Interrupt => "interrupt",
        }
    }

    /// Driver chosen when the configuration does not name one
    pub fn build_default() -> Self {
        if cfg!(feature = "irq") {
            DriverKind::Interrupt
        } else {
            DriverKind::Polling
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GUS tunables, applied through the same path as control registers 0x10/0x11
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GusConfig {
    /// Audio buffer size in samples (1-256)
    pub audio_buffer: u16,
    /// DMA interval in microseconds
    pub dma_interval: u8,
}

impl Default for GusConfig {
    fn default() -> Self {
        GusConfig {
            audio_buffer: 16,
            dma_interval: 0,
        }
    }
}

/// Boot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Identity string override
    pub identity: Option<String>,
    /// Base port override
    pub base_port: Option<u16>,
    /// Depth of the device command queue
    pub queue_capacity: usize,
    /// Dispatch driver
    pub driver: DriverKind,
    /// GUS tunables
    pub gus: GusConfig,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        FirmwareConfig {
            identity: None,
            base_port: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            driver: DriverKind::build_default(),
            gus: GusConfig::default(),
        }
    }
}

impl FirmwareConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FirmwareConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every value can be applied to the card
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Queue capacity is 0
    /// - Base port does not fit the 10-bit ISA decode
    /// - GUS audio buffer is outside 1-256
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(PicoGusError::ConfigError(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if let Some(port) = self.base_port {
            if port > PORT_MASK {
                return Err(PicoGusError::ConfigError(format!(
                    "base_port {port:#x} exceeds the 10-bit I/O range"
                )));
            }
        }
        if !(1..=256).contains(&self.gus.audio_buffer) {
            return Err(PicoGusError::ConfigError(format!(
                "gus.audio_buffer {} must be between 1 and 256",
                self.gus.audio_buffer
            )));
        }
        Ok(())
    }
}
