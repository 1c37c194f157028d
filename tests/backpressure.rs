use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use picogus::bus::{BusTransaction, Response};
use picogus::device::{Cms, Opl, Renderer, Tandy};
use picogus::{Card, StagingUpdater};

fn write(card: &mut Card<impl picogus::Device>, port: u16, value: u8) -> Vec<Response> {
    let mut sink: Vec<Response> = Vec::new();
    card.dispatch(BusTransaction::write(port, value), &mut sink);
    sink
}

#[test]
fn full_tandy_queue_drops_newest_without_blocking() {
    let (tandy, mut renderer) = Tandy::with_queue(16).unwrap();
    let mut card = Card::new(tandy, StagingUpdater::with_capacity(8), "x");

    for i in 0..100u8 {
        // Latch bytes for tone 0 so the renderer state shows which survived
        assert_eq!(write(&mut card, 0x2C0, 0x80 | (i & 0x0F)), vec![Response::Done]);
    }
    assert_eq!(card.device().pending(), 16);
    assert_eq!(card.device().dropped(), 84);

    assert_eq!(renderer.render(), 16);
    assert_eq!(renderer.registers().tone[0] & 0x0F, 15, "sixteenth byte was the last kept");
    assert_eq!(renderer.render(), 0);
}

#[test]
fn opl_keeps_the_oldest_commands() {
    let (opl, mut renderer) = Opl::with_queue(16).unwrap();
    let mut card = Card::new(opl, StagingUpdater::with_capacity(8), "x");

    for i in 0..32u8 {
        write(&mut card, 0x388, 0xA0 + i);
        assert_eq!(write(&mut card, 0x389, i + 1), vec![Response::Hold, Response::Done]);
    }
    assert_eq!(card.device().dropped(), 16);
    // The bus-side shadow still sees every write
    assert_eq!(card.device().register(0xA0 + 31), 32);

    assert_eq!(renderer.render(), 16);
    for i in 0..16u8 {
        assert_eq!(renderer.register(0xA0 + i), i + 1);
    }
    for i in 16..32u8 {
        assert_eq!(renderer.register(0xA0 + i), 0);
    }
}

#[test]
fn queue_recovers_once_drained() {
    let (cms, mut renderer) = Cms::with_queue(4).unwrap();
    let mut card = Card::new(cms, StagingUpdater::with_capacity(8), "x");

    for value in 0..8 {
        write(&mut card, 0x220, value);
    }
    assert_eq!(card.device().dropped(), 4);
    assert_eq!(renderer.render(), 4);

    write(&mut card, 0x221, 0x05);
    write(&mut card, 0x220, 0x77);
    assert_eq!(renderer.render(), 2);
    assert_eq!(renderer.registers().regs[0][5], 0x77);
    assert_eq!(card.device().dropped(), 4);
}

#[test]
fn renderer_on_another_thread_accounts_for_every_write() {
    const WRITES: u32 = 20_000;

    let (tandy, mut renderer) = Tandy::with_queue(64).unwrap();
    let mut card = Card::new(tandy, StagingUpdater::with_capacity(8), "x");
    let stop = Arc::new(AtomicBool::new(false));

    let render_thread = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut consumed = 0usize;
            while !stop.load(Ordering::Acquire) {
                match renderer.render() {
                    0 => thread::yield_now(),
                    n => consumed += n,
                }
            }
            consumed + renderer.render()
        })
    };

    for i in 0..WRITES {
        write(&mut card, 0x2C0, i as u8);
    }
    stop.store(true, Ordering::Release);

    let consumed = render_thread.join().unwrap();
    assert_eq!(consumed as u32 + card.device().dropped(), WRITES);
    assert_eq!(card.device().pending(), 0);
}
