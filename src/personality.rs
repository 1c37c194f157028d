//! Build-time device selection
//!
//! Each firmware image carries exactly one personality, picked with a Cargo
//! feature. [`ActiveDevice`] names it so the rest of the firmware stays
//! generic, and [`Personality::build`] creates the device together with the
//! renderer that runs on the second context.
//!
//! ```sh
//! cargo build --no-default-features --features gus
//! ```

use crate::config::FirmwareConfig;
use crate::device::{
    Cms, CmsRenderer, Device, GamePort, Gus, JoystickFeed, MidiOut, Mpu401, NoRenderer, Opl,
    OplRenderer, Renderer, Tandy, TandyRenderer, TUNE_AUDIO_BUFFER, TUNE_DMA_INTERVAL,
};
use crate::Result;

const ENABLED_PERSONALITIES: usize = cfg!(feature = "gus") as usize
    + cfg!(feature = "opl") as usize
    + cfg!(feature = "mpu401") as usize
    + cfg!(feature = "tandy") as usize
    + cfg!(feature = "cms") as usize
    + cfg!(feature = "joystick") as usize;

const _: () = assert!(
    ENABLED_PERSONALITIES == 1,
    "enable exactly one personality feature: gus, opl, mpu401, tandy, cms or joystick"
);

/// Personality compiled into this image
#[cfg(feature = "gus")]
pub type ActiveDevice = Gus;
/// Personality compiled into this image
#[cfg(all(feature = "opl", not(feature = "gus")))]
pub type ActiveDevice = Opl;
/// Personality compiled into this image
#[cfg(all(feature = "mpu401", not(any(feature = "gus", feature = "opl"))))]
pub type ActiveDevice = Mpu401;
/// Personality compiled into this image
#[cfg(all(
    feature = "tandy",
    not(any(feature = "gus", feature = "opl", feature = "mpu401"))
))]
pub type ActiveDevice = Tandy;
/// Personality compiled into this image
#[cfg(all(
    feature = "cms",
    not(any(feature = "gus", feature = "opl", feature = "mpu401", feature = "tandy"))
))]
pub type ActiveDevice = Cms;
/// Personality compiled into this image
#[cfg(all(
    feature = "joystick",
    not(any(
        feature = "gus",
        feature = "opl",
        feature = "mpu401",
        feature = "tandy",
        feature = "cms"
    ))
))]
pub type ActiveDevice = GamePort;

/// A device that can be booted from a [`FirmwareConfig`]
pub trait Personality: Device + Sized {
    /// Rendering-side half
    type Renderer: Renderer + 'static;

    /// Create the device and its renderer
    fn build(config: &FirmwareConfig) -> Result<(Self, Self::Renderer)>;
}

impl Personality for Gus {
    type Renderer = NoRenderer;

    fn build(config: &FirmwareConfig) -> Result<(Self, Self::Renderer)> {
        let mut gus = Gus::new();
        // Same encoding as the host tool: size - 1
        let buffer = config.gus.audio_buffer.clamp(1, 256) - 1;
        gus.tune(TUNE_AUDIO_BUFFER, buffer as u8);
        gus.tune(TUNE_DMA_INTERVAL, config.gus.dma_interval);
        Ok((gus, NoRenderer))
    }
}

impl Personality for Opl {
    type Renderer = OplRenderer;

    fn build(config: &FirmwareConfig) -> Result<(Self, Self::Renderer)> {
        Opl::with_queue(config.queue_capacity)
    }
}

impl Personality for Mpu401 {
    type Renderer = MidiOut;

    fn build(config: &FirmwareConfig) -> Result<(Self, Self::Renderer)> {
        Mpu401::with_queue(config.queue_capacity)
    }
}

impl Personality for Tandy {
    type Renderer = TandyRenderer;

    fn build(config: &FirmwareConfig) -> Result<(Self, Self::Renderer)> {
        Tandy::with_queue(config.queue_capacity)
    }
}

impl Personality for Cms {
    type Renderer = CmsRenderer;

    fn build(config: &FirmwareConfig) -> Result<(Self, Self::Renderer)> {
        Cms::with_queue(config.queue_capacity)
    }
}

impl Personality for GamePort {
    type Renderer = JoystickFeed;

    fn build(_config: &FirmwareConfig) -> Result<(Self, Self::Renderer)> {
        Ok(GamePort::with_feed())
    }
}
