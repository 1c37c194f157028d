//! Dispatch loop drivers
//!
//! Two interchangeable ways for the bus-facing context to feed the
//! [`Card`]:
//!
//! - [`InterruptDriver`]: one handler per FIFO, each servicing exactly one
//!   word when its "not empty" interrupt fires.
//! - [`PollingDriver`]: a busy loop checking both FIFOs.
//!
//! Both are thin adapters over [`Card::service_write`] and
//! [`Card::service_read`]; words are serviced in FIFO order within each
//! direction.

use crate::bus::BusChannel;
use crate::control::FirmwareUpdater;
use crate::device::Device;
use crate::dispatch::Card;
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters kept by both drivers
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriverStats {
    /// IOW words serviced
    pub writes: u64,
    /// IOR words serviced
    pub reads: u64,
}

impl DriverStats {
    /// Total words serviced
    pub fn total(&self) -> u64 {
        self.writes + self.reads
    }
}

/// Common interface of the dispatch drivers
pub trait DispatchLoop {
    /// Service every word currently queued, returning how many were handled
    fn dispatch_pending<D: Device, U: FirmwareUpdater>(&mut self, card: &mut Card<D, U>)
        -> usize;

    /// Counters since creation
    fn stats(&self) -> DriverStats;

    /// Service words until `stop` is raised
    ///
    /// Remaining words are drained after the flag is seen so no cycle queued
    /// before shutdown is left without a response.
    fn run_until<D: Device, U: FirmwareUpdater>(&mut self, card: &mut Card<D, U>, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            if self.dispatch_pending(card) == 0 {
                std::hint::spin_loop();
            }
        }
        self.dispatch_pending(card);
    }
}

/// Interrupt-driven adapter
///
/// On hardware each handler is bound to its FIFO's "not empty" interrupt.
/// [`DispatchLoop::dispatch_pending`] plays the interrupt controller: while
/// either FIFO has a word it raises the corresponding handler.
#[derive(Debug)]
pub struct InterruptDriver<W, R> {
    iow: W,
    ior: R,
    stats: DriverStats,
}

impl<W: BusChannel, R: BusChannel> InterruptDriver<W, R> {
    /// Bind the handlers to the (IOW, IOR) channels
    pub fn new(iow: W, ior: R) -> Self {
        InterruptDriver {
            iow,
            ior,
            stats: DriverStats::default(),
        }
    }

    /// IOW "not empty" handler: service exactly one word
    #[inline]
    pub fn on_iow_interrupt<D: Device, U: FirmwareUpdater>(&mut self, card: &mut Card<D, U>) -> bool {
        let serviced = card.service_write(&mut self.iow);
        if serviced {
            self.stats.writes += 1;
        }
        serviced
    }

    /// IOR "not empty" handler: service exactly one word
    #[inline]
    pub fn on_ior_interrupt<D: Device, U: FirmwareUpdater>(&mut self, card: &mut Card<D, U>) -> bool {
        let serviced = card.service_read(&mut self.ior);
        if serviced {
            self.stats.reads += 1;
        }
        serviced
    }
}

impl<W: BusChannel, R: BusChannel> DispatchLoop for InterruptDriver<W, R> {
    fn dispatch_pending<D: Device, U: FirmwareUpdater>(
        &mut self,
        card: &mut Card<D, U>,
    ) -> usize {
        let mut serviced = 0;
        loop {
            let before = serviced;
            if self.iow.has_event() && self.on_iow_interrupt(card) {
                serviced += 1;
            }
            if self.ior.has_event() && self.on_ior_interrupt(card) {
                serviced += 1;
            }
            if serviced == before {
                return serviced;
            }
        }
    }

    fn stats(&self) -> DriverStats {
        self.stats
    }
}

/// Polling adapter
#[derive(Debug)]
pub struct PollingDriver<W, R> {
    iow: W,
    ior: R,
    stats: DriverStats,
}

impl<W: BusChannel, R: BusChannel> PollingDriver<W, R> {
    /// Poll the (IOW, IOR) channels
    pub fn new(iow: W, ior: R) -> Self {
        PollingDriver {
            iow,
            ior,
            stats: DriverStats::default(),
        }
    }

    /// One pass over both FIFOs, servicing at most one word from each
    #[inline]
    pub fn poll_once<D: Device, U: FirmwareUpdater>(&mut self, card: &mut Card<D, U>) -> usize {
        let mut serviced = 0;
        if self.iow.has_event() && card.service_write(&mut self.iow) {
            self.stats.writes += 1;
            serviced += 1;
        }
        if self.ior.has_event() && card.service_read(&mut self.ior) {
            self.stats.reads += 1;
            serviced += 1;
        }
        serviced
    }
}

impl<W: BusChannel, R: BusChannel> DispatchLoop for PollingDriver<W, R> {
    fn dispatch_pending<D: Device, U: FirmwareUpdater>(
        &mut self,
        card: &mut Card<D, U>,
    ) -> usize {
        let mut serviced = 0;
        loop {
            match self.poll_once(card) {
                0 => return serviced,
                n => serviced += n,
            }
        }
    }

    fn stats(&self) -> DriverStats {
        self.stats
    }
}
