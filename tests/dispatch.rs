use picogus::bus::{BusTransaction, Response, SimulatedBus, PORT_MASK};
use picogus::control::{
    is_control_port, CONTROL_PORT, DATA_PORT_HIGH, DATA_PORT_LOW, UNLOCK_MAGIC,
};
use picogus::device::{
    Cms, GamePort, GamePortButtons, Gus, JoystickReport, Mpu401, Opl, Renderer, Tandy,
};
use picogus::{Card, Device, StagingUpdater};

fn responses<D: Device>(card: &mut Card<D>, txs: &[BusTransaction]) -> Vec<Vec<Response>> {
    txs.iter()
        .map(|&tx| {
            let mut sink: Vec<Response> = Vec::new();
            card.dispatch(tx, &mut sink);
            sink
        })
        .collect()
}

fn assert_one_terminal(per_event: &[Vec<Response>]) {
    for responses in per_event {
        let terminals = responses.iter().filter(|r| r.is_terminal()).count();
        assert_eq!(terminals, 1, "exactly one terminal response in {responses:?}");
        assert!(responses.len() <= 2, "at most one hold in {responses:?}");
        assert!(responses.last().is_some_and(|r| r.is_terminal()));
    }
}

/// Snapshot of everything the control protocol exposes
fn control_snapshot<D: Device>(card: &Card<D>) -> (bool, u8, u16, u8, usize, bool) {
    let control = card.control();
    (
        control.is_active(),
        control.selected_register(),
        control.base_port(),
        control.staged_low(),
        control.string_cursor(),
        control.firmware_update_active(),
    )
}

/// Write and read every port the card does not claim, returning how many
/// ports it does claim
fn sweep_unclaimed_ports<D: Device>(card: &mut Card<D>) -> usize {
    let before = control_snapshot(card);
    let mut claimed = 0;
    for port in 0..=PORT_MASK {
        if is_control_port(port) {
            continue;
        }
        if card.device().decode(port, card.base_port()).is_some() {
            claimed += 1;
            continue;
        }
        for tx in [BusTransaction::write(port, 0xCC), BusTransaction::read(port)] {
            let mut sink: Vec<Response> = Vec::new();
            card.dispatch(tx, &mut sink);
            assert_eq!(sink, vec![Response::Done], "{tx:?} is not claimed");
        }
    }
    assert_eq!(control_snapshot(card), before);
    claimed
}

#[test]
fn unclaimed_ports_are_noops_for_every_personality() {
    let mut gus = Card::new(Gus::new(), StagingUpdater::with_capacity(8), "x");
    assert_eq!(sweep_unclaimed_ports(&mut gus), 32);

    let (opl, mut opl_renderer) = Opl::with_queue(8).unwrap();
    let mut opl = Card::new(opl, StagingUpdater::with_capacity(8), "x");
    assert_eq!(sweep_unclaimed_ports(&mut opl), 2);
    assert_eq!(opl_renderer.render(), 0);

    let (mpu, mut midi) = Mpu401::with_queue(8).unwrap();
    let mut mpu = Card::new(mpu, StagingUpdater::with_capacity(8), "x");
    assert_eq!(sweep_unclaimed_ports(&mut mpu), 2);
    assert_eq!(midi.render(), 0);

    let (tandy, mut tandy_renderer) = Tandy::with_queue(8).unwrap();
    let mut tandy = Card::new(tandy, StagingUpdater::with_capacity(8), "x");
    assert_eq!(sweep_unclaimed_ports(&mut tandy), 1);
    assert_eq!(tandy_renderer.render(), 0);

    let (cms, mut cms_renderer) = Cms::with_queue(8).unwrap();
    let mut cms = Card::new(cms, StagingUpdater::with_capacity(8), "x");
    assert_eq!(sweep_unclaimed_ports(&mut cms), 9);
    assert_eq!(cms_renderer.render(), 0);

    let (port, _feed) = GamePort::with_feed();
    let mut game_port = Card::new(port, StagingUpdater::with_capacity(8), "x");
    assert_eq!(sweep_unclaimed_ports(&mut game_port), 1);
}

#[test]
fn unclaimed_ports_stay_noops_while_unlocked() {
    let mut gus = Card::new(Gus::new(), StagingUpdater::with_capacity(8), "x");
    let mut sink: Vec<Response> = Vec::new();
    gus.dispatch(BusTransaction::write(CONTROL_PORT, UNLOCK_MAGIC), &mut sink);
    gus.dispatch(BusTransaction::write(CONTROL_PORT, 0x04), &mut sink);
    assert!(gus.control().is_active());
    assert_eq!(sweep_unclaimed_ports(&mut gus), 32);
    assert!(gus.control().is_active());
}

#[test]
fn every_event_gets_one_terminal_response() {
    let (opl, _renderer) = Opl::with_queue(8).unwrap();
    let mut card = Card::new(opl, StagingUpdater::with_capacity(8), "x");
    let txs = [
        BusTransaction::write(CONTROL_PORT, UNLOCK_MAGIC),
        BusTransaction::write(CONTROL_PORT, 0x02),
        BusTransaction::read(DATA_PORT_HIGH),
        BusTransaction::read(DATA_PORT_LOW),
        BusTransaction::write(DATA_PORT_LOW, 0x12),
        BusTransaction::write(0x388, 0x04),
        BusTransaction::write(0x389, 0x21),
        BusTransaction::read(0x388),
        BusTransaction::read(0x389),
        BusTransaction::write(0x123, 0x00),
        BusTransaction::write(CONTROL_PORT, 0xFF),
        BusTransaction::write(DATA_PORT_HIGH, 0x00),
    ];
    let per_event = responses(&mut card, &txs);
    assert_one_terminal(&per_event);
    assert_eq!(per_event[7], vec![Response::Hold, Response::Data(0xC0)]);
}

#[test]
fn gus_fast_and_slow_offsets() {
    let mut card = Card::new(Gus::new(), StagingUpdater::with_capacity(8), "x");
    for port in [0x248, 0x24B, 0x342, 0x343, 0x344] {
        let mut sink: Vec<Response> = Vec::new();
        card.dispatch(BusTransaction::write(port, 0), &mut sink);
        assert_eq!(sink, vec![Response::Done], "port {port:#x} is fast");
    }
    for port in [0x240, 0x246, 0x249, 0x345, 0x347, 0x34F] {
        let mut sink: Vec<Response> = Vec::new();
        card.dispatch(BusTransaction::write(port, 0), &mut sink);
        assert_eq!(sink, vec![Response::Hold, Response::Done], "port {port:#x} is slow");
    }
}

#[test]
fn gus_dram_through_the_bus() {
    let mut card = Card::new(Gus::new(), StagingUpdater::with_capacity(8), "x");
    let mut sink: Vec<Response> = Vec::new();
    let writes = [
        (0x343, 0x43),
        (0x344, 0x00),
        (0x345, 0x10), // address low word 0x1000
        (0x343, 0x44),
        (0x345, 0x00),
        (0x347, 0x5A),
    ];
    for (port, value) in writes {
        card.dispatch(BusTransaction::write(port, value), &mut sink);
    }
    assert_eq!(card.device().peek(0x1000), 0x5A);

    sink.clear();
    card.dispatch(BusTransaction::read(0x347), &mut sink);
    assert_eq!(sink, vec![Response::Hold, Response::Data(0x5A)]);
}

#[test]
fn cms_sentinel_does_not_touch_state() {
    let (cms, _renderer) = Cms::with_queue(8).unwrap();
    let mut card = Card::new(cms, StagingUpdater::with_capacity(8), "x");
    let per_event = responses(
        &mut card,
        &[
            BusTransaction::write(0x227, 0x42),
            BusTransaction::read(0x224),
            BusTransaction::read(0x22B),
            BusTransaction::write(0x224, 0x99),
            BusTransaction::read(0x22A),
        ],
    );
    assert_eq!(
        per_event,
        vec![
            vec![Response::Done],
            vec![Response::Hold, Response::Data(0x7F)],
            vec![Response::Hold, Response::Data(0x42)],
            vec![Response::Done],
            vec![Response::Hold, Response::Data(0x42)],
        ]
    );
}

#[test]
fn mpu401_uart_session() {
    let (mpu, mut midi) = Mpu401::with_queue(16).unwrap();
    let mut card = Card::new(mpu, StagingUpdater::with_capacity(8), "x");
    let per_event = responses(
        &mut card,
        &[
            BusTransaction::read(0x331),
            BusTransaction::write(0x331, 0xFF),
            BusTransaction::read(0x331),
            BusTransaction::read(0x330),
            BusTransaction::write(0x331, 0x3F),
            BusTransaction::read(0x330),
            BusTransaction::write(0x330, 0xC0),
            BusTransaction::write(0x330, 0x05),
        ],
    );
    assert_one_terminal(&per_event);
    assert_eq!(per_event[0], vec![Response::Hold, Response::Data(0xBF)]);
    assert_eq!(per_event[2], vec![Response::Hold, Response::Data(0x3F)]);
    assert_eq!(per_event[3], vec![Response::Hold, Response::Data(0xFE)]);
    assert_eq!(per_event[5], vec![Response::Hold, Response::Data(0xFE)]);
    assert_eq!(per_event[6], vec![Response::Hold, Response::Done]);

    midi.render();
    assert_eq!(midi.sent(), &[0xC0, 0x05]);
}

#[test]
fn game_port_one_shot_over_the_bus() {
    let (port, mut feed) = GamePort::with_feed();
    feed.publish(JoystickReport {
        axes: [1, 0, 0, 0],
        pressed: GamePortButtons::BUTTON_1B,
    });
    let mut card = Card::new(port, StagingUpdater::with_capacity(8), "x");
    let bus = SimulatedBus::new();
    let (mut iow, mut ior) = bus.channels();

    bus.host_write(0x201, 0xFF);
    card.service_write(&mut iow);
    for _ in 0..3 {
        bus.host_read(0x201);
        card.service_read(&mut ior);
    }
    assert_eq!(bus.take_write_responses(), vec![Response::Done]);
    assert_eq!(bus.read_data(), vec![0xDF, 0xD1, 0xD0]);
}
