//! PC game port backed by a USB joystick
//!
//! A write at the base port fires four one-shot timers whose length is
//! proportional to the axis positions; the host measures them by reading the
//! port in a loop until each axis bit drops. Here the "time" is counted in
//! reads: an axis at position `n` stays high for `n + 1` reads.
//!
//! Axis positions and buttons are written only by the USB input context
//! through [`JoystickFeed`] and read by the bus side through atomics.

use super::{Device, DeviceKind, PortRole, PortSpan, ReadAccess, Renderer, WriteTiming};
use bitflags::bitflags;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const REGION: &[PortSpan] = &[PortSpan {
    start: 0,
    len: 1,
    role: PortRole::Data,
    write: Some(WriteTiming::Fast),
    read: ReadAccess::Device,
}];

bitflags! {
    /// Game port read-back bits
    ///
    /// Axis bits are 1 while the one-shot is running. Button bits are active
    /// low: 1 means released.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GamePortButtons: u8 {
        /// Joystick 1 X axis
        const AXIS_1X = 0x01;
        /// Joystick 1 Y axis
        const AXIS_1Y = 0x02;
        /// Joystick 2 X axis
        const AXIS_2X = 0x04;
        /// Joystick 2 Y axis
        const AXIS_2Y = 0x08;
        /// Joystick 1 button A
        const BUTTON_1A = 0x10;
        /// Joystick 1 button B
        const BUTTON_1B = 0x20;
        /// Joystick 2 button A
        const BUTTON_2A = 0x40;
        /// Joystick 2 button B
        const BUTTON_2B = 0x80;
    }
}

impl GamePortButtons {
    /// Every button released
    pub const RELEASED: GamePortButtons = GamePortButtons::BUTTON_1A
        .union(GamePortButtons::BUTTON_1B)
        .union(GamePortButtons::BUTTON_2A)
        .union(GamePortButtons::BUTTON_2B);
}

/// Centered axis position
pub const AXIS_CENTER: u8 = 127;

/// Joystick state shared between the USB context and the bus side
#[derive(Debug)]
pub struct JoystickInput {
    axes: [AtomicU8; 4],
    buttons: AtomicU8,
}

impl Default for JoystickInput {
    fn default() -> Self {
        JoystickInput {
            axes: [
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(AXIS_CENTER),
            ],
            buttons: AtomicU8::new(GamePortButtons::RELEASED.bits()),
        }
    }
}

impl JoystickInput {
    /// Position of axis `index` (1X, 1Y, 2X, 2Y)
    pub fn axis(&self, index: usize) -> u8 {
        self.axes[index & 3].load(Ordering::Relaxed)
    }

    /// Button nibble as read by the host (upper four bits, active low)
    pub fn buttons(&self) -> u8 {
        self.buttons.load(Ordering::Relaxed) & 0xF0
    }
}

/// A complete joystick report from the USB side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickReport {
    /// Axis positions 1X, 1Y, 2X, 2Y
    pub axes: [u8; 4],
    /// Pressed buttons (any of the `BUTTON_*` flags)
    pub pressed: GamePortButtons,
}

/// Writer handle for [`JoystickInput`], owned by the USB input context
///
/// Not `Clone`: the shared fields have exactly one writer.
#[derive(Debug)]
pub struct JoystickFeed {
    input: Arc<JoystickInput>,
    pending: Option<JoystickReport>,
}

impl JoystickFeed {
    /// Apply a report immediately
    pub fn publish(&mut self, report: JoystickReport) {
        for (axis, value) in self.input.axes.iter().zip(report.axes) {
            axis.store(value, Ordering::Relaxed);
        }
        let released = GamePortButtons::RELEASED.difference(report.pressed);
        self.input.buttons.store(released.bits(), Ordering::Relaxed);
    }

    /// Queue a report to be applied on the next [`Renderer::render`]
    ///
    /// Only the latest report is kept.
    pub fn submit(&mut self, report: JoystickReport) {
        self.pending = Some(report);
    }

    /// Shared state this feed writes
    pub fn input(&self) -> &Arc<JoystickInput> {
        &self.input
    }
}

impl Renderer for JoystickFeed {
    fn render(&mut self) -> usize {
        match self.pending.take() {
            Some(report) => {
                self.publish(report);
                1
            }
            None => 0,
        }
    }
}

/// Bus-facing half of the game port personality
#[derive(Debug)]
pub struct GamePort {
    input: Arc<JoystickInput>,
    /// Reads left before each axis bit drops
    countdown: [u16; 4],
}

impl GamePort {
    /// Create the port and the feed that drives it
    pub fn with_feed() -> (Self, JoystickFeed) {
        let input = Arc::new(JoystickInput::default());
        (
            GamePort {
                input: Arc::clone(&input),
                countdown: [0; 4],
            },
            JoystickFeed {
                input,
                pending: None,
            },
        )
    }
}

impl Device for GamePort {
    const KIND: DeviceKind = DeviceKind::GamePort;
    const DEFAULT_BASE_PORT: u16 = 0x201;
    const REGION: &'static [PortSpan] = REGION;
    const REPORTS_BASE_PORT: bool = false;

    fn write(&mut self, _offset: u16, _value: u8) {
        for (i, countdown) in self.countdown.iter_mut().enumerate() {
            *countdown = u16::from(self.input.axis(i)) + 1;
        }
    }

    fn read(&mut self, _offset: u16) -> u8 {
        let mut running = 0u8;
        for (i, countdown) in self.countdown.iter_mut().enumerate() {
            if *countdown > 0 {
                running |= 1 << i;
                *countdown -= 1;
            }
        }
        running | self.input.buttons()
    }
}
