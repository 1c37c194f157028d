//! PicoGUS ISA bus dispatch core
//!
//! Firmware core for a card that impersonates legacy ISA peripherals. One
//! physical slot is multiplexed across several emulated device personalities,
//! exactly one of which is compiled into each firmware image.
//!
//! # Features
//! - Decoding of IOW/IOR bus words delivered by the bus capture program
//! - Wait-state aware dispatch: fast writes release the bus before any device
//!   work, slow writes and all reads hold the host until the answer is ready
//! - Out-of-band control protocol on ports 0x1D0-0x1D2 (unlock, identity
//!   string, base-port programming, device tuning, firmware update handoff)
//! - Six device personalities: GUS, OPL, MPU-401, Tandy, CMS and game port
//! - Lock-free single-producer/single-consumer command queues towards the
//!   rendering context
//! - Interchangeable interrupt-driven and polling dispatch drivers
//!
//! # Crate feature flags
//! - `gus`, `opl`, `mpu401`, `tandy` (default), `cms`, `joystick`: the device
//!   personality exposed as [`ActiveDevice`]. Exactly one must be enabled.
//! - `irq`: the simulator entry point uses the interrupt-driven driver by
//!   default instead of polling.
//!
//! # Quick start
//! ```
//! use picogus::bus::{Response, SimulatedBus};
//! use picogus::control::{CONTROL_PORT, DATA_PORT_HIGH, UNLOCK_MAGIC};
//! use picogus::device::Tandy;
//! use picogus::{Card, StagingUpdater};
//!
//! let (tandy, _renderer) = Tandy::with_queue(64).unwrap();
//! let mut card = Card::new(tandy, StagingUpdater::default(), "picogus v0.1.0");
//! let bus = SimulatedBus::new();
//!
//! bus.host_write(CONTROL_PORT, UNLOCK_MAGIC);
//! bus.host_write(CONTROL_PORT, 0x00); // select magic register
//! bus.host_read(DATA_PORT_HIGH);
//!
//! let (mut iow, mut ior) = bus.channels();
//! card.service_write(&mut iow);
//! card.service_write(&mut iow);
//! card.service_read(&mut ior);
//! assert_eq!(bus.last_read_response(), Some(Response::Data(0xDD)));
//! ```

#![warn(missing_docs)]

pub mod bus; // Bus words, responses and event sources
pub mod config; // Firmware configuration
pub mod control; // Control protocol state machine
pub mod device; // Device personalities
pub mod dispatch; // IOW/IOR dispatch core
pub mod driver; // Interrupt and polling adapters
pub mod personality; // Build-time device selection
pub mod queue; // SPSC command queues

/// Error types for card construction and host-side tooling
///
/// Nothing on the dispatch path returns an error; misuse of the bus is handled
/// by silent policies. These variants only surface while building a card,
/// allocating queues or loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum PicoGusError {
    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Command queue could not be created
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PicoGusError {
    /// Converts a String into `PicoGusError::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `QueueError`) where the
    /// failure has a known cause.
    fn from(msg: String) -> Self {
        PicoGusError::Other(msg)
    }
}

impl From<&str> for PicoGusError {
    /// Converts a string slice into `PicoGusError::Other`.
    fn from(msg: &str) -> Self {
        PicoGusError::Other(msg.to_string())
    }
}

/// Result type for card construction and tooling
pub type Result<T> = std::result::Result<T, PicoGusError>;

/// Identity string reported through control register 0x02 unless overridden
pub const FIRMWARE_IDENTITY: &str = concat!("picogus v", env!("CARGO_PKG_VERSION"));

// Public API exports
pub use bus::{BusChannel, BusTransaction, Response, ResponseSink, SimulatedBus};
pub use config::{DriverKind, FirmwareConfig};
pub use control::{ControlState, FirmwareStatus, FirmwareUpdater, StagingUpdater};
pub use device::{Device, DeviceKind, WriteTiming};
pub use dispatch::Card;
pub use driver::{DispatchLoop, DriverStats, InterruptDriver, PollingDriver};
pub use personality::{ActiveDevice, Personality};
pub use queue::{command_queue, CommandConsumer, CommandProducer};
