use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use picogus::bus::{Response, SimulatedBus};
use picogus::control::{CONTROL_PORT, DATA_PORT_HIGH, DATA_PORT_LOW, UNLOCK_MAGIC};
use picogus::device::{Cms, Opl};
use picogus::{Card, DispatchLoop, InterruptDriver, PollingDriver, StagingUpdater};

/// Blocking `OUT`/`IN` from a host thread: wait for the terminal response
struct BlockingHost {
    bus: SimulatedBus,
}

impl BlockingHost {
    fn outb(&self, port: u16, value: u8) -> Vec<Response> {
        self.bus.host_write(port, value);
        wait_terminal(|| self.bus.take_write_responses())
    }

    fn inb(&self, port: u16) -> Vec<Response> {
        self.bus.host_read(port);
        wait_terminal(|| self.bus.take_read_responses())
    }
}

fn wait_terminal(mut take: impl FnMut() -> Vec<Response>) -> Vec<Response> {
    let mut responses = Vec::new();
    while !responses.iter().any(|r: &Response| r.is_terminal()) {
        responses.extend(take());
        thread::yield_now();
    }
    responses
}

fn host_session(host: &BlockingHost) -> Vec<Vec<Response>> {
    vec![
        host.outb(CONTROL_PORT, UNLOCK_MAGIC),
        host.outb(CONTROL_PORT, 0x00),
        host.inb(DATA_PORT_HIGH),
        host.outb(CONTROL_PORT, 0x04),
        host.inb(DATA_PORT_LOW),
        host.inb(DATA_PORT_HIGH),
        host.outb(0x388, 0x04),
        host.outb(0x389, 0x01),
        host.inb(0x388),
        host.outb(0x388, 0x20),
        host.outb(0x389, 0x21),
        host.inb(0x3AA),
    ]
}

fn expected_session() -> Vec<Vec<Response>> {
    vec![
        vec![Response::Hold, Response::Done],
        vec![Response::Hold, Response::Done],
        vec![Response::Hold, Response::Data(0xDD)],
        vec![Response::Hold, Response::Done],
        vec![Response::Hold, Response::Data(0x88)],
        vec![Response::Hold, Response::Data(0x03)],
        vec![Response::Done],
        vec![Response::Hold, Response::Done],
        vec![Response::Hold, Response::Data(0xC0)],
        vec![Response::Done],
        vec![Response::Hold, Response::Done],
        vec![Response::Done],
    ]
}

fn run_session<L>(make_driver: impl FnOnce(&SimulatedBus) -> L) -> (Vec<Vec<Response>>, Card<Opl>)
where
    L: DispatchLoop,
{
    let (opl, _renderer) = Opl::with_queue(16).unwrap();
    let mut card = Card::new(opl, StagingUpdater::with_capacity(8), "x");
    let bus = SimulatedBus::new();
    let mut driver = make_driver(&bus);
    let stop = Arc::new(AtomicBool::new(false));

    let host = {
        let bus = bus.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let responses = host_session(&BlockingHost { bus });
            stop.store(true, Ordering::Release);
            responses
        })
    };

    driver.run_until(&mut card, &stop);
    let responses = host.join().unwrap();
    assert_eq!(driver.stats().total(), responses.len() as u64);
    (responses, card)
}

#[test]
fn polling_driver_serves_a_live_host() {
    let (responses, card) = run_session(|bus| {
        let (iow, ior) = bus.channels();
        PollingDriver::new(iow, ior)
    });
    assert_eq!(responses, expected_session());
    assert_eq!(card.device().register(0x20), 0x21);
}

#[test]
fn interrupt_driver_serves_a_live_host() {
    let (responses, card) = run_session(|bus| {
        let (iow, ior) = bus.channels();
        InterruptDriver::new(iow, ior)
    });
    assert_eq!(responses, expected_session());
    assert_eq!(card.device().register(0x20), 0x21);
}

#[test]
fn writes_keep_fifo_order_within_a_burst() {
    let (cms, mut renderer) = Cms::with_queue(64).unwrap();
    let mut card = Card::new(cms, StagingUpdater::with_capacity(8), "x");
    let bus = SimulatedBus::new();
    // Address then data for registers 0..16 on chip 0
    for register in 0..16u8 {
        bus.host_write(0x221, register);
        bus.host_write(0x220, register.wrapping_mul(3));
    }
    let (iow, ior) = bus.channels();
    let mut driver = InterruptDriver::new(iow, ior);

    assert_eq!(driver.dispatch_pending(&mut card), 32);
    assert_eq!(bus.take_write_responses(), vec![Response::Done; 32]);

    picogus::device::Renderer::render(&mut renderer);
    for register in 0..16usize {
        assert_eq!(renderer.registers().regs[0][register], (register as u8).wrapping_mul(3));
    }
}
