//! Firmware update handoff
//!
//! Selecting control register 0xFF puts the card into update mode: the
//! updater is told to stop and go idle, and every following write to the
//! high data port is a firmware byte. The host polls progress by reading the
//! high data port while 0xFF is selected.
//!
//! How the bytes reach flash is the updater's business; the control protocol
//! only knows the [`FirmwareUpdater`] contract.

/// Status codes reported through register 0xFF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FirmwareStatus {
    /// Update mode entered, no bytes received yet
    Idle = 0x00,
    /// Receiving image bytes
    Receiving = 0x01,
    /// Image exceeded the staging area; further bytes are ignored
    Error = 0xFF,
}

impl FirmwareStatus {
    /// Status byte as returned to the host
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Receiver of the firmware byte stream
///
/// Called from the bus-facing context, so every method must return quickly.
pub trait FirmwareUpdater {
    /// Stop normal operation and wait for image bytes
    fn stop(&mut self);

    /// Accept the next image byte
    fn write(&mut self, byte: u8);

    /// Status byte reported to the host
    fn status(&self) -> u8;
}

/// Default flash staging area: 2 MiB, the size of the on-board flash
pub const DEFAULT_STAGING_CAPACITY: usize = 2 * 1024 * 1024;

/// Updater that stages the image in RAM
///
/// The staging buffer is allocated once at construction and never grows past
/// its capacity, so entering update mode from the bus path does not allocate.
#[derive(Debug)]
pub struct StagingUpdater {
    image: Vec<u8>,
    capacity: usize,
    status: FirmwareStatus,
}

impl StagingUpdater {
    /// Create an updater with a staging area of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        StagingUpdater {
            image: Vec::with_capacity(capacity),
            capacity,
            status: FirmwareStatus::Idle,
        }
    }

    /// Bytes received so far
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Size of the staging area in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current status
    pub fn firmware_status(&self) -> FirmwareStatus {
        self.status
    }
}

impl Default for StagingUpdater {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STAGING_CAPACITY)
    }
}

impl FirmwareUpdater for StagingUpdater {
    fn stop(&mut self) {
        tracing::info!(capacity = self.capacity, "entering firmware update mode");
        self.image.clear();
        self.status = FirmwareStatus::Idle;
    }

    fn write(&mut self, byte: u8) {
        match self.status {
            FirmwareStatus::Error => {}
            _ if self.image.len() >= self.capacity => {
                tracing::warn!(capacity = self.capacity, "firmware image overflows staging area");
                self.status = FirmwareStatus::Error;
            }
            _ => {
                self.image.push(byte);
                self.status = FirmwareStatus::Receiving;
            }
        }
    }

    fn status(&self) -> u8 {
        self.status.code()
    }
}
