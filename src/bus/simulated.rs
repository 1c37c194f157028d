//! Host-side bus event source
//!
//! Stands in for the bus capture program: two FIFOs of encoded words (one per
//! direction) and a log of every response word pushed back. The handle is
//! cheaply clonable so a "host" thread can inject cycles while the dispatch
//! context drains them.

use super::{BusChannel, BusTransaction, Direction, Response, ResponseSink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Fifos {
    iow: VecDeque<u32>,
    ior: VecDeque<u32>,
    iow_responses: Vec<Response>,
    ior_responses: Vec<Response>,
}

/// In-memory bus shared between the host side and the dispatch side
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    fifos: Arc<Mutex<Fifos>>,
}

/// One direction of a [`SimulatedBus`], handed to a driver
#[derive(Debug, Clone)]
pub struct SimChannel {
    fifos: Arc<Mutex<Fifos>>,
    direction: Direction,
}

impl SimulatedBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an IOW cycle from the host
    pub fn host_write(&self, port: u16, value: u8) {
        let word = BusTransaction::write(port, value).encode();
        self.fifos.lock().iow.push_back(word);
    }

    /// Queue an IOR cycle from the host
    pub fn host_read(&self, port: u16) {
        let word = BusTransaction::read(port).encode();
        self.fifos.lock().ior.push_back(word);
    }

    /// Split into the (IOW, IOR) channels consumed by the dispatch side
    pub fn channels(&self) -> (SimChannel, SimChannel) {
        (
            SimChannel {
                fifos: Arc::clone(&self.fifos),
                direction: Direction::Write,
            },
            SimChannel {
                fifos: Arc::clone(&self.fifos),
                direction: Direction::Read,
            },
        )
    }

    /// Number of IOW cycles not yet serviced
    pub fn pending_writes(&self) -> usize {
        self.fifos.lock().iow.len()
    }

    /// Number of IOR cycles not yet serviced
    pub fn pending_reads(&self) -> usize {
        self.fifos.lock().ior.len()
    }

    /// Take every response pushed on the IOW side so far
    pub fn take_write_responses(&self) -> Vec<Response> {
        std::mem::take(&mut self.fifos.lock().iow_responses)
    }

    /// Take every response pushed on the IOR side so far
    pub fn take_read_responses(&self) -> Vec<Response> {
        std::mem::take(&mut self.fifos.lock().ior_responses)
    }

    /// Most recent terminal response on the IOR side
    pub fn last_read_response(&self) -> Option<Response> {
        self.fifos
            .lock()
            .ior_responses
            .iter()
            .rev()
            .copied()
            .find(|r| r.is_terminal())
    }

    /// Most recent terminal response on the IOW side
    pub fn last_write_response(&self) -> Option<Response> {
        self.fifos
            .lock()
            .iow_responses
            .iter()
            .rev()
            .copied()
            .find(|r| r.is_terminal())
    }

    /// Data bytes returned to the host, in order, ignoring reads that drove nothing
    pub fn read_data(&self) -> Vec<u8> {
        self.fifos
            .lock()
            .ior_responses
            .iter()
            .filter_map(|r| match r {
                Response::Data(v) => Some(*v),
                _ => None,
            })
            .collect()
    }
}

impl SimChannel {
    /// Direction served by this channel
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl ResponseSink for SimChannel {
    fn push(&mut self, response: Response) {
        let mut fifos = self.fifos.lock();
        match self.direction {
            Direction::Write => fifos.iow_responses.push(response),
            Direction::Read => fifos.ior_responses.push(response),
        }
    }
}

impl BusChannel for SimChannel {
    fn has_event(&self) -> bool {
        let fifos = self.fifos.lock();
        match self.direction {
            Direction::Write => !fifos.iow.is_empty(),
            Direction::Read => !fifos.ior.is_empty(),
        }
    }

    fn pop(&mut self) -> Option<u32> {
        let mut fifos = self.fifos.lock();
        match self.direction {
            Direction::Write => fifos.iow.pop_front(),
            Direction::Read => fifos.ior.pop_front(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_per_direction() {
        let bus = SimulatedBus::new();
        bus.host_write(0x220, 1);
        bus.host_write(0x221, 2);
        bus.host_read(0x388);

        let (mut iow, mut ior) = bus.channels();
        assert_eq!(iow.pop(), Some(BusTransaction::write(0x220, 1).encode()));
        assert_eq!(iow.pop(), Some(BusTransaction::write(0x221, 2).encode()));
        assert_eq!(iow.pop(), None);
        assert!(ior.has_event());
        assert_eq!(ior.pop(), Some(0x388));
        assert!(!ior.has_event());
    }

    #[test]
    fn test_responses_are_logged_per_direction() {
        let bus = SimulatedBus::new();
        let (mut iow, mut ior) = bus.channels();
        iow.push(Response::Hold);
        iow.push(Response::Done);
        ior.push(Response::Data(0x42));

        assert_eq!(bus.last_read_response(), Some(Response::Data(0x42)));
        assert_eq!(bus.read_data(), vec![0x42]);
        assert_eq!(
            bus.take_write_responses(),
            vec![Response::Hold, Response::Done]
        );
        assert!(bus.take_write_responses().is_empty());
    }
}
