//! `picogus-sim`: boot the compiled-in personality on a simulated ISA bus and
//! probe it the way the host configuration tool does.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use picogus::bus::{Response, SimulatedBus};
use picogus::control::{CONTROL_PORT, DATA_PORT_HIGH, DATA_PORT_LOW, UNLOCK_MAGIC};
use picogus::device::Renderer;
use picogus::{
    ActiveDevice, Card, DispatchLoop, Device, DriverKind, FirmwareConfig, InterruptDriver,
    Personality, PicoGusError, PollingDriver, StagingUpdater,
};
use tracing::Level;

/// Upper bound on identity string reads, in case the terminator never comes
const MAX_IDENTITY_LEN: usize = 256;
/// Writes sent to the device region to exercise the renderer
const DEVICE_BURST: usize = 64;

/// Parsed command-line arguments.
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<String>,
    set_port: Option<u16>,
    driver: Option<DriverKind>,
    verbose: bool,
    quiet: bool,
    show_help: bool,
}

impl CliArgs {
    fn parse() -> Self {
        let mut args = Self::default();
        let mut iter = env::args().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => args.show_help = true,
                "--verbose" | "-v" => args.verbose = true,
                "--quiet" | "-q" => args.quiet = true,
                "--config" => match iter.next() {
                    Some(path) => args.config_path = Some(path),
                    None => {
                        eprintln!("--config requires a file path");
                        args.show_help = true;
                    }
                },
                "--set-port" => match iter.next().as_deref().and_then(parse_port) {
                    Some(port) => args.set_port = Some(port),
                    None => {
                        eprintln!("--set-port requires a hex port between 0 and 3ff");
                        args.show_help = true;
                    }
                },
                "--driver" => match iter.next().as_deref().and_then(DriverKind::from_str) {
                    Some(driver) => args.driver = Some(driver),
                    None => {
                        eprintln!("--driver requires polling or interrupt");
                        args.show_help = true;
                    }
                },
                _ if arg.starts_with('-') => {
                    eprintln!("Unknown flag: {}", arg);
                    args.show_help = true;
                }
                _ => {
                    eprintln!("Unexpected argument: {}", arg);
                    args.show_help = true;
                }
            }
        }

        args
    }

    fn print_help() {
        eprintln!(
            "Usage:\n  picogus-sim [--config <file.json>] [--set-port <hex>] [--driver <kind>]\n\n\
             Flags:\n\
             \x20 --config <file>      Load firmware configuration (JSON)\n\
             \x20 --set-port <hex>     Program a new base port through the control protocol\n\
             \x20 --driver <kind>      Dispatch driver: polling (default) or interrupt\n\
             \x20 -v, --verbose        Log every control protocol step\n\
             \x20 -q, --quiet          Only log warnings and errors\n\
             \x20 -h, --help           Show this help\n\n\
             The personality is chosen at build time:\n\
             \x20 cargo run --no-default-features --features gus -- --set-port 240\n"
        );
    }
}

fn parse_port(value: &str) -> Option<u16> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16)
        .ok()
        .filter(|&port| port <= picogus::bus::PORT_MASK)
}

/// Host side of the simulated bus: issues one cycle at a time and lets the
/// driver service it before looking at the response, like a real `IN`/`OUT`.
struct Host<'a, L, D: Device> {
    bus: &'a SimulatedBus,
    driver: &'a mut L,
    card: &'a mut Card<D>,
}

impl<L: DispatchLoop, D: Device> Host<'_, L, D> {
    fn outb(&mut self, port: u16, value: u8) {
        self.bus.host_write(port, value);
        self.driver.dispatch_pending(&mut *self.card);
        self.bus.take_write_responses();
    }

    fn inb(&mut self, port: u16) -> Option<u8> {
        self.bus.host_read(port);
        self.driver.dispatch_pending(&mut *self.card);
        match self.bus.take_read_responses().last() {
            Some(&Response::Data(value)) => Some(value),
            _ => None,
        }
    }

    fn read_register(&mut self, register: u8) -> Option<u8> {
        self.outb(CONTROL_PORT, register);
        self.inb(DATA_PORT_HIGH)
    }

    fn read_base_port(&mut self) -> Option<u16> {
        self.outb(CONTROL_PORT, 0x04);
        let low = self.inb(DATA_PORT_LOW)?;
        let high = self.inb(DATA_PORT_HIGH)?;
        Some(u16::from(high) << 8 | u16::from(low))
    }

    fn read_identity(&mut self) -> String {
        self.outb(CONTROL_PORT, 0x02);
        let mut bytes = Vec::new();
        while bytes.len() < MAX_IDENTITY_LEN {
            match self.inb(DATA_PORT_HIGH) {
                Some(0) | None => break,
                Some(byte) => bytes.push(byte),
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[derive(Debug, Default)]
struct ProbeReport {
    version: u8,
    identity: String,
    type_code: u8,
    base_port: Option<u16>,
    reprogrammed: Option<u16>,
    device_writes: usize,
}

fn probe<L: DispatchLoop, D: Device>(
    bus: &SimulatedBus,
    driver: &mut L,
    card: &mut Card<D>,
    set_port: Option<u16>,
) -> picogus::Result<ProbeReport> {
    let mut host = Host { bus, driver, card };

    host.outb(CONTROL_PORT, UNLOCK_MAGIC);
    match host.read_register(0x00) {
        Some(0xDD) => {}
        other => {
            return Err(format!("card not detected (magic read {other:02x?})").into())
        }
    }

    let mut report = ProbeReport {
        version: host.read_register(0x01).unwrap_or(0xFF),
        identity: host.read_identity(),
        type_code: host.read_register(0x03).unwrap_or(0xFF),
        ..ProbeReport::default()
    };
    report.base_port = host.read_base_port().filter(|_| D::REPORTS_BASE_PORT);

    if let Some(port) = set_port {
        host.outb(CONTROL_PORT, 0x04);
        host.outb(DATA_PORT_LOW, (port & 0xFF) as u8);
        host.outb(DATA_PORT_HIGH, (port >> 8) as u8);
        report.reprogrammed = host.read_base_port().filter(|_| D::REPORTS_BASE_PORT);
    }

    let base = host.card.base_port();
    if let Some(span) = D::REGION.iter().find(|span| span.write.is_some()) {
        for i in 0..DEVICE_BURST {
            host.outb(base.wrapping_add(span.start), i as u8);
        }
        report.device_writes = DEVICE_BURST;
    }

    Ok(report)
}

fn run(args: CliArgs) -> picogus::Result<()> {
    let mut config = match &args.config_path {
        Some(path) => FirmwareConfig::from_json_file(path)?,
        None => FirmwareConfig::default(),
    };
    if let Some(driver) = args.driver {
        config.driver = driver;
    }

    let (device, mut renderer) = ActiveDevice::build(&config)?;
    let mut card = Card::from_config(device, StagingUpdater::default(), &config);
    let kind = <ActiveDevice as Device>::KIND;
    tracing::info!(
        personality = %kind,
        driver = %config.driver,
        "booted {} at {:#05x}",
        card.control().identity().escape_ascii(),
        card.base_port()
    );

    let stop = Arc::new(AtomicBool::new(false));
    let render_stop = Arc::clone(&stop);
    let render_thread = thread::spawn(move || {
        let mut consumed = 0usize;
        while !render_stop.load(Ordering::Acquire) {
            match renderer.render() {
                0 => thread::sleep(Duration::from_micros(200)),
                n => consumed += n,
            }
        }
        consumed + renderer.render()
    });

    let bus = SimulatedBus::new();
    let (iow, ior) = bus.channels();
    let (report, stats) = match config.driver {
        DriverKind::Polling => {
            let mut driver = PollingDriver::new(iow, ior);
            let report = probe(&bus, &mut driver, &mut card, args.set_port);
            (report, driver.stats())
        }
        DriverKind::Interrupt => {
            let mut driver = InterruptDriver::new(iow, ior);
            let report = probe(&bus, &mut driver, &mut card, args.set_port);
            (report, driver.stats())
        }
    };

    stop.store(true, Ordering::Release);
    let consumed = render_thread
        .join()
        .map_err(|_| PicoGusError::from("render thread panicked"))?;
    let report = report?;

    println!("\n=== PicoGUS Probe ===");
    println!("Identity:          {}", report.identity);
    println!("Protocol version:  {}", report.version);
    println!("Personality:       {} (type {:#04x})", kind, report.type_code);
    match report.base_port {
        Some(port) => println!("Base port:         {:#05x}", port),
        None => println!("Base port:         fixed"),
    }
    if let Some(port) = report.reprogrammed {
        println!("Reprogrammed to:   {:#05x}", port);
    }
    println!("Driver:            {}", config.driver);
    println!("Bus cycles:        {} writes, {} reads", stats.writes, stats.reads);
    println!(
        "Renderer:          {} of {} device writes consumed",
        consumed, report.device_writes
    );

    Ok(())
}

fn main() -> picogus::Result<()> {
    let args = CliArgs::parse();
    if args.show_help {
        CliArgs::print_help();
        return Ok(());
    }

    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("240"), Some(0x240));
        assert_eq!(parse_port("0x388"), Some(0x388));
        assert_eq!(parse_port("400"), None);
        assert_eq!(parse_port("zz"), None);
    }

    #[test]
    fn test_probe_active_device() {
        let config = FirmwareConfig::default();
        let (device, _renderer) = ActiveDevice::build(&config).unwrap();
        let mut card = Card::new(device, StagingUpdater::with_capacity(16), "sim");
        let bus = SimulatedBus::new();
        let (iow, ior) = bus.channels();
        let mut driver = PollingDriver::new(iow, ior);

        let report = probe(&bus, &mut driver, &mut card, Some(0x300)).unwrap();
        assert_eq!(report.identity, "sim");
        assert_eq!(report.version, 1);
        assert_eq!(report.type_code, <ActiveDevice as Device>::KIND.type_code());
        assert_eq!(card.base_port(), 0x300);
    }

    #[test]
    fn test_probe_leaves_no_responses_behind() {
        let (tandy, _renderer) = picogus::device::Tandy::with_queue(16).unwrap();
        let mut card = Card::new(tandy, StagingUpdater::with_capacity(16), "sim");
        let bus = SimulatedBus::new();
        let (iow, ior) = bus.channels();
        let mut driver = InterruptDriver::new(iow, ior);

        let report = probe(&bus, &mut driver, &mut card, None).unwrap();
        assert_eq!(report.base_port, Some(0x2C0));
        assert!(driver.stats().total() > DEVICE_BURST as u64);
        assert!(bus.take_write_responses().is_empty());
        assert!(bus.take_read_responses().is_empty());
    }
}
