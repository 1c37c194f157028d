//! IOW/IOR dispatch core
//!
//! [`Card`] owns everything the bus-facing context needs: the control
//! protocol state, the compiled-in device and the firmware updater. Drivers
//! pop words from a [`BusChannel`] and hand them to [`Card::service_write`] /
//! [`Card::service_read`]; the dispatchers in [`iow`] and [`ior`] decide the
//! wait-state shape of the response and route the cycle.
//!
//! Nothing here allocates, locks or returns an error.

pub mod ior;
pub mod iow;

use crate::bus::{BusChannel, BusTransaction, Direction, Response, ResponseSink};
use crate::config::FirmwareConfig;
use crate::control::{ControlState, FirmwareUpdater, StagingUpdater};
use crate::device::Device;
use crate::FIRMWARE_IDENTITY;

/// The card as seen from the bus
pub struct Card<D, U = StagingUpdater> {
    control: ControlState,
    device: D,
    updater: U,
}

impl<D: Device, U: FirmwareUpdater> Card<D, U> {
    /// Boot a card at the device's default base port
    pub fn new(device: D, updater: U, identity: &str) -> Self {
        Card {
            control: ControlState::new(D::DEFAULT_BASE_PORT, identity),
            device,
            updater,
        }
    }

    /// Boot a card with the identity and base port from `config`
    pub fn from_config(device: D, updater: U, config: &FirmwareConfig) -> Self {
        let identity = config.identity.as_deref().unwrap_or(FIRMWARE_IDENTITY);
        let card = Self::new(device, updater, identity);
        match config.base_port {
            Some(port) => card.with_base_port(port),
            None => card,
        }
    }

    /// Move the device to `base_port` before the host gets a chance to
    pub fn with_base_port(mut self, base_port: u16) -> Self {
        tracing::debug!("boot base port {base_port:#05x}");
        self.control.set_base_port(base_port);
        self.device.rebase(base_port);
        self
    }

    /// Dispatch one decoded transaction, pushing its responses into `sink`
    #[inline]
    pub fn dispatch<S: ResponseSink>(&mut self, tx: BusTransaction, sink: &mut S) {
        match (tx.direction, tx.data) {
            (Direction::Write, Some(value)) => iow::handle_write(
                tx.port,
                value,
                &mut self.control,
                &mut self.device,
                &mut self.updater,
                sink,
            ),
            (Direction::Write, None) => sink.push(Response::Done),
            (Direction::Read, _) => ior::handle_read(
                tx.port,
                &mut self.control,
                &mut self.device,
                &self.updater,
                sink,
            ),
        }
    }

    /// Pop and service one IOW word; returns `false` if the FIFO was empty
    #[inline]
    pub fn service_write<C: BusChannel>(&mut self, iow: &mut C) -> bool {
        match iow.pop() {
            Some(word) => {
                let tx = BusTransaction::decode_write(word);
                self.dispatch(tx, iow);
                true
            }
            None => false,
        }
    }

    /// Pop and service one IOR word; returns `false` if the FIFO was empty
    #[inline]
    pub fn service_read<C: BusChannel>(&mut self, ior: &mut C) -> bool {
        match ior.pop() {
            Some(word) => {
                let tx = BusTransaction::decode_read(word);
                self.dispatch(tx, ior);
                true
            }
            None => false,
        }
    }

    /// Control protocol state
    pub fn control(&self) -> &ControlState {
        &self.control
    }

    /// Compiled-in device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Compiled-in device, mutably
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Firmware updater
    pub fn updater(&self) -> &U {
        &self.updater
    }

    /// Effective base port
    pub fn base_port(&self) -> u16 {
        self.control.base_port()
    }
}

impl<D: std::fmt::Debug, U: std::fmt::Debug> std::fmt::Debug for Card<D, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Card")
            .field("control", &self.control)
            .field("device", &self.device)
            .field("updater", &self.updater)
            .finish()
    }
}
