//! Control protocol state machine
//!
//! The IOW dispatcher drives [`ControlState::unlock`], [`ControlState::select`]
//! and the data writes; the IOR dispatcher drives the data reads. All
//! operations are infallible: misuse is absorbed by the silent policies
//! documented on each method.

use super::{ControlRegister, ControlState, FirmwareUpdater, CARD_MAGIC, PROTOCOL_VERSION};
use crate::device::Device;

impl ControlState {
    /// Handle the unlock byte on the control port
    ///
    /// Unlocking while already active is a no-op.
    pub fn unlock(&mut self) {
        if !self.control_active {
            tracing::debug!("control protocol unlocked");
        }
        self.control_active = true;
    }

    /// Select a control register
    ///
    /// Selecting 0x02 rewinds the identity string, 0x04 clears the staged low
    /// byte and 0xFF enters firmware update mode. Any index the compiled-in
    /// device does not recognize relocks the protocol so a confused driver
    /// resynchronizes by writing the unlock byte again.
    pub fn select<D: Device, U: FirmwareUpdater>(&mut self, index: u8, updater: &mut U) {
        self.selected_register = index;
        match ControlRegister::decode::<D>(index) {
            Some(ControlRegister::Identity) => self.string_cursor = 0,
            Some(ControlRegister::BasePort) => self.base_port_staging_low = 0,
            Some(ControlRegister::FirmwareUpdate) => {
                self.firmware_update_active = true;
                updater.stop();
            }
            Some(reg) => tracing::trace!(register = %reg, "control register selected"),
            None => {
                tracing::debug!(index, "unrecognized control register, relocking");
                self.control_active = false;
            }
        }
    }

    /// Write to the low data port
    ///
    /// Only the base port register has a low half; it is latched until the
    /// high half arrives.
    pub fn write_low(&mut self, value: u8) {
        if self.selected_register == ControlRegister::BASE_PORT {
            self.base_port_staging_low = value;
        }
    }

    /// Write to the high data port
    ///
    /// Completes a base-port write (and lets the device recompute anything
    /// derived from it), applies device tuning values, or streams a firmware
    /// byte.
    pub fn write_high<D: Device, U: FirmwareUpdater>(
        &mut self,
        value: u8,
        device: &mut D,
        updater: &mut U,
    ) {
        match ControlRegister::decode::<D>(self.selected_register) {
            Some(ControlRegister::BasePort) => {
                let port = u16::from(value) << 8 | u16::from(self.base_port_staging_low);
                tracing::debug!("base port changed to {port:#05x}");
                self.base_port = port;
                device.rebase(port);
            }
            Some(ControlRegister::Tuning(register)) => {
                tracing::debug!(register, value, "device tuning");
                device.tune(register, value);
            }
            Some(ControlRegister::FirmwareUpdate) => updater.write(value),
            _ => {}
        }
    }

    /// Read the low data port
    pub fn read_low<D: Device>(&self) -> u8 {
        match self.selected_register {
            ControlRegister::BASE_PORT if D::REPORTS_BASE_PORT => (self.base_port & 0xFF) as u8,
            ControlRegister::BASE_PORT => 0xFF,
            _ => 0x00,
        }
    }

    /// Read the high data port
    ///
    /// Register 0x02 streams the identity string one byte per read; after the
    /// 0x00 terminator has been returned the next read starts over.
    pub fn read_high<D: Device, U: FirmwareUpdater>(&mut self, updater: &U) -> u8 {
        match self.selected_register {
            ControlRegister::MAGIC => CARD_MAGIC,
            ControlRegister::PROTOCOL_VERSION => PROTOCOL_VERSION,
            ControlRegister::IDENTITY => self.next_identity_byte(),
            ControlRegister::DEVICE_TYPE => D::KIND.type_code(),
            ControlRegister::BASE_PORT if D::REPORTS_BASE_PORT => (self.base_port >> 8) as u8,
            ControlRegister::FIRMWARE_UPDATE => updater.status(),
            _ => 0xFF,
        }
    }

    fn next_identity_byte(&mut self) -> u8 {
        match self.identity.get(self.string_cursor) {
            Some(&byte) => {
                self.string_cursor += 1;
                byte
            }
            None => {
                self.string_cursor = 0;
                0x00
            }
        }
    }
}
