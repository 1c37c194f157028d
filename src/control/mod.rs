//! Out-of-band control protocol
//!
//! A three-port register interface that lives beside whatever device the card
//! is impersonating:
//!
//! | Port  | Write                              | Read               |
//! |-------|------------------------------------|--------------------|
//! | 0x1D0 | unlock (0xCC) / select register    | selected register  |
//! | 0x1D1 | data low byte                      | data low byte      |
//! | 0x1D2 | data high byte                     | data high byte     |
//!
//! 0x1D0 was chosen because nothing claims it in Ralf Brown's port list.

pub mod firmware;
mod protocol;
mod registers;

pub use firmware::{FirmwareStatus, FirmwareUpdater, StagingUpdater};
pub use registers::ControlRegister;

/// Select/unlock port
pub const CONTROL_PORT: u16 = 0x1D0;
/// Low byte of the 16-bit data register
pub const DATA_PORT_LOW: u16 = 0x1D1;
/// High byte of the 16-bit data register
pub const DATA_PORT_HIGH: u16 = 0x1D2;

/// Byte written to the control port to enable register selection
pub const UNLOCK_MAGIC: u8 = 0xCC;
/// Value of register 0x00
pub const CARD_MAGIC: u8 = 0xDD;
/// Value of register 0x01
pub const PROTOCOL_VERSION: u8 = 1;

/// Whether `port` is one of the three fixed control ports
#[inline(always)]
pub fn is_control_port(port: u16) -> bool {
    (CONTROL_PORT..=DATA_PORT_HIGH).contains(&port)
}

/// Control protocol state
///
/// Created once at boot and owned by the bus-facing context for the lifetime
/// of the firmware. Only the IOW path changes configuration; the IOR path only
/// advances the identity string cursor.
#[derive(Debug, Clone)]
pub struct ControlState {
    selected_register: u8,
    control_active: bool,
    base_port: u16,
    base_port_staging_low: u8,
    string_cursor: usize,
    firmware_update_active: bool,
    identity: Box<[u8]>,
}

impl ControlState {
    /// Boot state for a device whose compiled-in base port is `base_port`
    ///
    /// `identity` is streamed through register 0x02 followed by a 0x00
    /// terminator. Interior NUL bytes would end the stream early, so they are
    /// stripped.
    pub fn new(base_port: u16, identity: &str) -> Self {
        let identity = identity
            .bytes()
            .filter(|&b| b != 0)
            .collect::<Vec<u8>>()
            .into_boxed_slice();
        ControlState {
            selected_register: 0,
            control_active: false,
            base_port,
            base_port_staging_low: 0,
            string_cursor: 0,
            firmware_update_active: false,
            identity,
        }
    }

    /// Register most recently selected through the control port
    pub fn selected_register(&self) -> u8 {
        self.selected_register
    }

    /// Whether the unlock byte has been seen since the last relock
    pub fn is_active(&self) -> bool {
        self.control_active
    }

    /// Effective device base port
    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Low byte latched by the first half of a base-port write
    pub fn staged_low(&self) -> u8 {
        self.base_port_staging_low
    }

    /// Next identity string index to be read
    pub fn string_cursor(&self) -> usize {
        self.string_cursor
    }

    /// Whether firmware update mode has been entered (terminal until reset)
    pub fn firmware_update_active(&self) -> bool {
        self.firmware_update_active
    }

    /// Identity bytes, without the terminator
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// Override the base port outside of the bus protocol (boot configuration)
    pub(crate) fn set_base_port(&mut self, base_port: u16) {
        self.base_port = base_port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_state() {
        let state = ControlState::new(0x2C0, "picogus v1.0");
        assert!(!state.is_active());
        assert_eq!(state.selected_register(), 0);
        assert_eq!(state.base_port(), 0x2C0);
        assert_eq!(state.string_cursor(), 0);
        assert!(!state.firmware_update_active());
        assert_eq!(state.identity(), b"picogus v1.0");
    }

    #[test]
    fn test_identity_strips_interior_nul() {
        let state = ControlState::new(0x220, "ab\0cd");
        assert_eq!(state.identity(), b"abcd");
    }

    #[test]
    fn test_control_port_range() {
        assert!(is_control_port(0x1D0));
        assert!(is_control_port(0x1D2));
        assert!(!is_control_port(0x1D3));
        assert!(!is_control_port(0x1CF));
    }
}
