//! Gravis UltraSound register interface
//!
//! The GUS decodes two 16-port windows: `base..base+0x10` and
//! `base+0x100..base+0x110`. Address decoding compares `(port >> 4) | 0x10`
//! against the same key computed from the base port, which is how the card
//! matches both windows with one comparison.
//!
//! Port map relative to the base port:
//!
//! | Offset | Write                          | Read                 | Timing |
//! |--------|--------------------------------|----------------------|--------|
//! | 0x000  | mix control                    |                      | slow   |
//! | 0x006  |                                | IRQ status           |        |
//! | 0x008  | AdLib timer register select    | AdLib timer status   | fast   |
//! | 0x009  | AdLib timer data               |                      | slow   |
//! | 0x00B  | IRQ/DMA control latch          |                      | fast   |
//! | 0x102  | voice select                   | voice select         | fast   |
//! | 0x103  | register select                | register select      | fast   |
//! | 0x104  | register data low              | register data low    | fast   |
//! | 0x105  | register data high (commits)   | register data high   | slow   |
//! | 0x107  | DRAM poke                      | DRAM peek            | slow   |
//!
//! Everything else inside the windows is a slow write and reads 0xFF.

use super::{lookup, Device, DeviceKind, PortRole, PortSpan, ReadAccess, WriteTiming};

const fn span(start: u16, len: u16, role: PortRole, write: WriteTiming) -> PortSpan {
    PortSpan {
        start,
        len,
        role,
        write: Some(write),
        read: ReadAccess::Device,
    }
}

const REGION: &[PortSpan] = &[
    span(0x000, 8, PortRole::Control, WriteTiming::Slow),
    span(0x008, 1, PortRole::Address, WriteTiming::Fast),
    span(0x009, 2, PortRole::Data, WriteTiming::Slow),
    span(0x00B, 1, PortRole::Control, WriteTiming::Fast),
    span(0x00C, 4, PortRole::Control, WriteTiming::Slow),
    span(0x100, 2, PortRole::Control, WriteTiming::Slow),
    span(0x102, 2, PortRole::Address, WriteTiming::Fast),
    span(0x104, 1, PortRole::Data, WriteTiming::Fast),
    span(0x105, 2, PortRole::Data, WriteTiming::Slow),
    span(0x107, 1, PortRole::Memory, WriteTiming::Slow),
    span(0x108, 8, PortRole::Control, WriteTiming::Slow),
];

/// Onboard DRAM size
pub const DRAM_SIZE: usize = 1024 * 1024;

/// Audio buffer tuning register (value is size - 1)
pub const TUNE_AUDIO_BUFFER: u8 = 0x10;
/// DMA interval tuning register
pub const TUNE_DMA_INTERVAL: u8 = 0x11;

const DEFAULT_AUDIO_BUFFER: u16 = 16;

const REG_DRAM_ADDR_LOW: u8 = 0x43;
const REG_DRAM_ADDR_HIGH: u8 = 0x44;
const REG_RESET: u8 = 0x4C;
const REG_ACTIVE_VOICES: u8 = 0x4E;

const VOICES: usize = 32;
const VOICE_REGISTERS: usize = 0x10;
const GLOBAL_BASE: u8 = 0x40;
const GLOBAL_REGISTERS: usize = 0x20;

/// Gravis UltraSound personality
#[derive(Clone)]
pub struct Gus {
    port_key: u16,
    mix_control: u8,
    irq_dma_control: u8,
    irq_status: u8,
    timer_select: u8,
    timer_status: u8,
    voice: u8,
    register: u8,
    data_low: u8,
    voices: Box<[[u16; VOICE_REGISTERS]; VOICES]>,
    globals: [u16; GLOBAL_REGISTERS],
    active_voices: u8,
    dram: Box<[u8]>,
    audio_buffer: u16,
    dma_interval: u8,
}

impl Default for Gus {
    fn default() -> Self {
        Self::new()
    }
}

impl Gus {
    /// Card at its default base port, freshly reset
    pub fn new() -> Self {
        let mut gus = Gus {
            port_key: port_key(Self::DEFAULT_BASE_PORT),
            mix_control: 0x0B,
            irq_dma_control: 0,
            irq_status: 0,
            timer_select: 0,
            timer_status: 0,
            voice: 0,
            register: 0,
            data_low: 0,
            voices: Box::new([[0; VOICE_REGISTERS]; VOICES]),
            globals: [0; GLOBAL_REGISTERS],
            active_voices: 14,
            dram: vec![0; DRAM_SIZE].into_boxed_slice(),
            audio_buffer: DEFAULT_AUDIO_BUFFER,
            dma_interval: 0,
        };
        gus.reset();
        gus
    }

    /// Master reset through global register 0x4C
    pub fn reset(&mut self) {
        for voice in self.voices.iter_mut() {
            *voice = [0; VOICE_REGISTERS];
            // Voice control: stopped
            voice[0x00] = 0x0300;
        }
        self.irq_status = 0;
        self.timer_status = 0;
        self.active_voices = 14;
    }

    /// Address comparison key derived from the base port
    pub fn port_key(&self) -> u16 {
        self.port_key
    }

    /// Mix control register
    pub fn mix_control(&self) -> u8 {
        self.mix_control
    }

    /// IRQ/DMA control latch (0x00B)
    pub fn irq_dma_control(&self) -> u8 {
        self.irq_dma_control
    }

    /// Number of voices the card is rendering (14-32)
    pub fn active_voices(&self) -> u8 {
        self.active_voices
    }

    /// Audio buffer size in samples
    pub fn audio_buffer(&self) -> u16 {
        self.audio_buffer
    }

    /// DMA interval in microseconds
    pub fn dma_interval(&self) -> u8 {
        self.dma_interval
    }

    /// Voice register `register` (0x00-0x0F) of voice `voice`
    pub fn voice_register(&self, voice: u8, register: u8) -> u16 {
        self.voices[usize::from(voice) % VOICES][usize::from(register) % VOICE_REGISTERS]
    }

    /// Byte at `address` in onboard DRAM
    pub fn peek(&self, address: u32) -> u8 {
        self.dram[address as usize % DRAM_SIZE]
    }

    fn dram_address(&self) -> usize {
        let low = usize::from(self.global(REG_DRAM_ADDR_LOW));
        let high = usize::from(self.global(REG_DRAM_ADDR_HIGH) >> 8) & 0x0F;
        (high << 16 | low) % DRAM_SIZE
    }

    fn global(&self, register: u8) -> u16 {
        self.globals[usize::from(register - GLOBAL_BASE)]
    }

    /// Value of the currently selected register
    fn selected(&self) -> u16 {
        // Reads select the register with bit 7 set
        match self.register & 0x7F {
            r if usize::from(r) < VOICE_REGISTERS => self.voice_register(self.voice, r),
            r if (GLOBAL_BASE..GLOBAL_BASE + GLOBAL_REGISTERS as u8).contains(&r) => self.global(r),
            _ => 0xFFFF,
        }
    }

    fn commit(&mut self, value: u16) {
        let register = self.register;
        match register {
            r if usize::from(r) < VOICE_REGISTERS => {
                self.voices[usize::from(self.voice) % VOICES][usize::from(r)] = value;
            }
            r if (GLOBAL_BASE..GLOBAL_BASE + GLOBAL_REGISTERS as u8).contains(&r) => {
                self.globals[usize::from(r - GLOBAL_BASE)] = value;
                let byte = (value >> 8) as u8;
                match r {
                    REG_RESET if byte & 0x01 == 0 => {
                        tracing::debug!("gus master reset");
                        self.reset();
                    }
                    REG_ACTIVE_VOICES => self.active_voices = (byte & 0x1F).max(13) + 1,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn write_timer_data(&mut self, value: u8) {
        if self.timer_select != 0x04 {
            return;
        }
        if value & 0x80 != 0 {
            self.timer_status = 0;
            return;
        }
        if value & 0x01 != 0 && value & 0x40 == 0 {
            self.timer_status |= 0xC0;
        }
        if value & 0x02 != 0 && value & 0x20 == 0 {
            self.timer_status |= 0xA0;
        }
    }
}

impl std::fmt::Debug for Gus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gus")
            .field("port_key", &format_args!("{:#x}", self.port_key))
            .field("voice", &self.voice)
            .field("register", &self.register)
            .field("active_voices", &self.active_voices)
            .field("audio_buffer", &self.audio_buffer)
            .field("dma_interval", &self.dma_interval)
            .finish_non_exhaustive()
    }
}

fn port_key(base_port: u16) -> u16 {
    (base_port >> 4) | 0x10
}

impl Device for Gus {
    const KIND: DeviceKind = DeviceKind::Gus;
    const DEFAULT_BASE_PORT: u16 = 0x240;
    const REGION: &'static [PortSpan] = REGION;
    const TUNING_REGISTERS: &'static [u8] = &[TUNE_AUDIO_BUFFER, TUNE_DMA_INTERVAL];

    fn decode(&self, port: u16, base_port: u16) -> Option<(u16, &'static PortSpan)> {
        if port_key(port) != self.port_key {
            return None;
        }
        let offset = port.wrapping_sub(base_port) & 0x10F;
        lookup(REGION, offset).map(|span| (offset, span))
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            0x000 => self.mix_control = value,
            0x008 => self.timer_select = value,
            0x009 => self.write_timer_data(value),
            0x00B => self.irq_dma_control = value,
            0x102 => self.voice = value & 0x1F,
            0x103 => self.register = value,
            0x104 => self.data_low = value,
            0x105 => self.commit(u16::from(value) << 8 | u16::from(self.data_low)),
            0x107 => {
                let address = self.dram_address();
                self.dram[address] = value;
            }
            _ => {}
        }
    }

    fn read(&mut self, offset: u16) -> u8 {
        match offset {
            0x006 => self.irq_status,
            0x008 => self.timer_status,
            0x102 => self.voice,
            0x103 => self.register,
            0x104 => (self.selected() & 0xFF) as u8,
            0x105 => (self.selected() >> 8) as u8,
            0x107 => self.dram[self.dram_address()],
            _ => 0xFF,
        }
    }

    fn rebase(&mut self, base_port: u16) {
        self.port_key = port_key(base_port);
    }

    fn tune(&mut self, register: u8, value: u8) {
        match register {
            TUNE_AUDIO_BUFFER => self.audio_buffer = u16::from(value) + 1,
            TUNE_DMA_INTERVAL => self.dma_interval = value,
            _ => {}
        }
    }
}
