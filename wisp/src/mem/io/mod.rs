use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::cpu::check_bit_const;
use crate::mem::Noted;

pub mod timers;

use timers::TimerRegisters;

/// Used to write a new byte into an existing byte where one or more of the bits are read-only.
/// The `mask` should have writable bits set and read-only bits unset. E.g. if the bottom input is
/// read-only, the mask should be 0xF0.
pub fn selective_write(existing: &mut u8, mask: u8, new: u8) {
    let masked_existing = *existing & (!mask);
    let masked_new = new & mask;
    *existing = masked_existing | masked_new;
}

/// The eight inputs of the handheld. The discriminants are the bits used in a [`Keys`] set: the
/// directions occupy the low nibble (in the order of the joypad register's lines) and the buttons
/// the high nibble.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    Right = 0x01,
    Left = 0x02,
    Up = 0x04,
    Down = 0x08,
    A = 0x10,
    B = 0x20,
    Select = 0x40,
    Start = 0x80,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
    ];
}

/// A snapshot of the held inputs, as reported by a key source once per step. Besides the eight
/// buttons, a key source can ask the emulator to power off.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    pressed: u8,
    quit: bool,
}

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a set of keys that only requests that the emulator stops.
    pub fn quit() -> Self {
        Self {
            pressed: 0,
            quit: true,
        }
    }

    pub fn with(mut self, button: Button) -> Self {
        self.press(button);
        self
    }

    pub fn press(&mut self, button: Button) {
        self.pressed |= button as u8;
    }

    pub fn release(&mut self, button: Button) {
        self.pressed &= !(button as u8);
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed & button as u8 != 0
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    fn directions(&self) -> u8 {
        self.pressed & 0x0F
    }

    fn buttons(&self) -> u8 {
        self.pressed >> 4
    }
}

/// The number of register writes that the audio queue can hold between two drains. A single
/// instruction writes at most two bytes.
const AUDIO_QUEUE_LEN: usize = 8;

/// The number of serial bytes that can be held between two drains.
const SERIAL_QUEUE_LEN: usize = 4;

/// The memory-mapped registers that are not owned by the display: the joypad, the serial port,
/// the timers, the interrupt flags, and the audio registers.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoRegisters {
    /// ADDR FF00, bits 4 and 5. A cleared bit selects a set of inputs.
    joypad_select: u8,
    /// The inputs reported by the last poll.
    keys: Keys,
    /// ADDR FF01
    serial_data: u8,
    /// ADDR FF02
    serial_control: u8,
    /// ADDR FF04, FF05, FF06, FF07
    pub timers: TimerRegisters,
    /// ADDR FF0F
    /// Bits 0-4 request the vblank, STAT, timer, serial, and joypad interrupts, respectively.
    interrupt_flags: u8,
    /// ADDR FF10-FF3F
    audio: AudioRegisters,
    /// Writes to the audio registers that haven't been handed to the audio sink yet.
    audio_writes: heapless::Vec<(u16, u8), AUDIO_QUEUE_LEN>,
    /// Bytes shifted out of the serial port that haven't been handed to the serial sink yet.
    serial_out: heapless::Vec<u8, SERIAL_QUEUE_LEN>,
}

impl Default for IoRegisters {
    fn default() -> Self {
        Self {
            joypad_select: 0x30,
            keys: Keys::default(),
            serial_data: 0,
            serial_control: 0,
            timers: TimerRegisters::new(),
            interrupt_flags: 0,
            audio: AudioRegisters::default(),
            audio_writes: heapless::Vec::new(),
            serial_out: heapless::Vec::new(),
        }
    }
}

impl IoRegisters {
    /// The registers as the boot ROM leaves them.
    pub fn post_boot() -> Self {
        Self {
            timers: TimerRegisters::post_boot(),
            audio: AudioRegisters::post_boot(),
            ..Self::default()
        }
    }

    /// Advances the timers by the given number of cycles.
    pub(crate) fn tick(&mut self, cycles: u16) {
        if self.timers.tick(cycles) {
            self.request_interrupt(InterruptFlag::Timer);
        }
    }

    pub(crate) fn request_interrupt(&mut self, flag: InterruptFlag) {
        self.interrupt_flags |= flag as u8;
    }

    pub(crate) fn interrupt_flags(&self) -> u8 {
        self.interrupt_flags
    }

    /// Replaces the held inputs. Any input that was not held before raises the joypad interrupt.
    pub(crate) fn set_keys(&mut self, keys: Keys) {
        let newly_pressed = keys.pressed & !self.keys.pressed;
        self.keys = keys;
        if newly_pressed != 0 {
            trace!(target: "wisp::event", "Joypad press: 0b{newly_pressed:0>8b}");
            self.request_interrupt(InterruptFlag::Joypad);
        }
    }

    pub(crate) fn drain_audio_writes(&mut self) -> impl Iterator<Item = (u16, u8)> {
        let writes = std::mem::take(&mut self.audio_writes);
        writes.into_iter()
    }

    pub(crate) fn drain_serial(&mut self) -> impl Iterator<Item = u8> {
        let bytes = std::mem::take(&mut self.serial_out);
        bytes.into_iter()
    }

    fn read_joypad(&self) -> u8 {
        let mut lines = 0x0F;
        if !check_bit_const::<4>(self.joypad_select) {
            lines &= !self.keys.directions();
        }
        if !check_bit_const::<5>(self.joypad_select) {
            lines &= !self.keys.buttons();
        }
        0xC0 | self.joypad_select | lines
    }

    /// Starts (and immediately completes) a serial transfer. There is never a link partner, so
    /// the byte shifted in is always 0xFF.
    fn transfer_serial(&mut self) {
        let byte = self.serial_data;
        debug!(target: "wisp::serial", "Serial transfer: 0x{byte:0>2X}");
        if self.serial_out.push(byte).is_err() {
            warn!("Serial queue is full, dropping byte 0x{byte:0>2X}");
        }
        self.serial_data = 0xFF;
        self.serial_control &= 0x7F;
        self.request_interrupt(InterruptFlag::Serial);
    }

    pub(crate) fn read_byte(&self, index: u16) -> u8 {
        match index {
            0xFF00 => self.read_joypad(),
            0xFF01 => self.serial_data,
            0xFF02 => 0x7E | self.serial_control,
            0xFF04..=0xFF07 => self.timers.read_byte(index),
            0xFF0F => 0xE0 | self.interrupt_flags,
            0xFF10..=0xFF3F => self.audio.read_byte(index),
            _ => {
                trace!("Read from unmapped I/O register 0x{index:0>4X}");
                0xFF
            }
        }
    }

    pub(crate) fn write_byte(&mut self, index: u16, value: u8) {
        match index {
            0xFF00 => selective_write(&mut self.joypad_select, 0b0011_0000, value),
            0xFF01 => self.serial_data = value,
            0xFF02 => {
                self.serial_control = value & 0x81;
                if self.serial_control == 0x81 {
                    self.transfer_serial();
                }
            }
            0xFF04..=0xFF07 => {
                if self.timers.write_byte(index, value) {
                    self.request_interrupt(InterruptFlag::Timer);
                }
            }
            // Top three bits are ignored because there are only 5 types of interrupts
            0xFF0F => self.interrupt_flags = 0x1F & value,
            0xFF10..=0xFF3F => {
                self.audio.write_byte(index, value);
                if self.audio_writes.push((index, value)).is_err() {
                    warn!("Audio queue is full, dropping write to 0x{index:0>4X}");
                }
            }
            _ => trace!("Write of 0x{value:0>2X} to unmapped I/O register 0x{index:0>4X}"),
        }
    }
}

/// The interrupt request bits, in priority order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptFlag {
    VBlank = 0b1,
    Lcd = 0b10,
    Timer = 0b100,
    Serial = 0b1000,
    Joypad = 0b1_0000,
}

/// The sound registers. Sound is not synthesized, but the registers are modelled so that games
/// read back what the hardware would return and so that writes can be forwarded to an audio sink.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
struct AudioRegisters {
    /// The volume control for the amplifier
    /// This register is at FF24
    master_volume: u8,

    /// The control for the panning of each channel
    /// This register is at FF25
    panning: u8,

    /// The master control for audio. Only bit 7 is writable; bits 0-3 report which channels are
    /// on.
    /// This register is at FF26
    master_control: u8,

    /// FF10-FF14: sweep, length and duty, volume and envelope, period low, period high and
    /// control.
    ch1: [u8; 5],

    /// FF16-FF19: length and duty, volume and envelope, period low, period high and control.
    ch2: [u8; 4],

    /// FF1A-FF1E: DAC enable, length timer, output level, period low, period high and control.
    ch3: [u8; 5],

    /// FF30-FF3F
    ch3_wave_form: [u8; 0x10],

    /// FF20-FF23: length timer, volume and envelope, frequency and randomness, control.
    ch4: [u8; 4],

    #[serde(skip)]
    noted: Noted,
}

/// Bits that always read back as 1 for each register from FF10 through FF2F. Write-only registers
/// read back as 0xFF.
const AUDIO_READ_MASKS: [u8; 0x20] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // unused, NR21-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // unused, NR41-NR44
    0x00, 0x00, 0x70, // NR50-NR52
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // unused
];

impl AudioRegisters {
    fn post_boot() -> Self {
        Self {
            master_volume: 0x77,
            panning: 0xF3,
            master_control: 0xF1,
            ch1: [0x80, 0xBF, 0xF3, 0xFF, 0xBF],
            ch2: [0x3F, 0x00, 0xFF, 0xBF],
            ch3: [0x7F, 0xFF, 0x9F, 0xFF, 0xBF],
            ch4: [0xFF, 0x00, 0x00, 0xBF],
            ..Self::default()
        }
    }

    fn register(&mut self, index: u16) -> Option<&mut u8> {
        Some(match index {
            0xFF10..=0xFF14 => &mut self.ch1[(index - 0xFF10) as usize],
            0xFF16..=0xFF19 => &mut self.ch2[(index - 0xFF16) as usize],
            0xFF1A..=0xFF1E => &mut self.ch3[(index - 0xFF1A) as usize],
            0xFF20..=0xFF23 => &mut self.ch4[(index - 0xFF20) as usize],
            0xFF24 => &mut self.master_volume,
            0xFF25 => &mut self.panning,
            0xFF26 => &mut self.master_control,
            n @ 0xFF30..=0xFF3F => &mut self.ch3_wave_form[(n - 0xFF30) as usize],
            _ => return None,
        })
    }

    fn read_byte(&self, index: u16) -> u8 {
        let value = match index {
            0xFF10..=0xFF14 => self.ch1[(index - 0xFF10) as usize],
            0xFF16..=0xFF19 => self.ch2[(index - 0xFF16) as usize],
            0xFF1A..=0xFF1E => self.ch3[(index - 0xFF1A) as usize],
            0xFF20..=0xFF23 => self.ch4[(index - 0xFF20) as usize],
            0xFF24 => self.master_volume,
            0xFF25 => self.panning,
            0xFF26 => self.master_control,
            n @ 0xFF30..=0xFF3F => return self.ch3_wave_form[(n - 0xFF30) as usize],
            _ => 0xFF,
        };
        value | AUDIO_READ_MASKS[((index - 0xFF10) & 0x1F) as usize]
    }

    fn write_byte(&mut self, index: u16, val: u8) {
        if self.noted.first() {
            debug!("Sound synthesis is not emulated; audio register writes are only forwarded");
        }
        match index {
            // NOTE: The channel status bits are read-only
            0xFF26 => selective_write(&mut self.master_control, 0x80, val),
            _ => match self.register(index) {
                Some(reg) => *reg = val,
                None => trace!("Write to unused audio register 0x{index:0>4X}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Button;
    use super::IoRegisters;
    use super::Keys;

    // Tests the various traits of the joypad.
    //  - The bottom nibble is read only
    //  - The default position of the bottom 4 bits is 1
    //  - Pressing an allowed button should switch the cooresponding bit to 0
    //  - "mode" selection (for bits 4 and 5) works similarly, 0 == selected
    //   - If no mode is selected, the bottom nibble is read as 0xF
    //  - The top two bits are ignored.
    #[test]
    fn joypad_tests() {
        let mut io = IoRegisters::default();
        // Initially, no input mode should be selected
        assert_eq!(io.read_byte(0xFF00), 0xFF);
        // Top two bits should be unaffected, both modes should be on, bottom nibble should be
        // unaffected
        io.write_byte(0xFF00, 0);
        assert_eq!(io.read_byte(0xFF00), 0xCF);

        // Select no modes and ensure that no button press is registered
        io.write_byte(0xFF00, 0xFF);
        for button in Button::ALL {
            io.set_keys(Keys::new().with(button));
            assert_eq!(io.read_byte(0xFF00), 0xFF);
        }

        // Select only the directions and ensure that only those presses are registered
        io.write_byte(0xFF00, 0xEF);
        for button in Button::ALL {
            io.set_keys(Keys::new().with(button));
            let expected = match button as u8 {
                n @ 0x01..=0x08 => 0x0F & !n,
                _ => 0x0F,
            };
            assert_eq!(io.read_byte(0xFF00), 0xE0 | expected, "{button:?}");
        }

        // Select only the buttons
        io.write_byte(0xFF00, 0xDF);
        for button in Button::ALL {
            io.set_keys(Keys::new().with(button));
            let expected = match button as u8 {
                n @ 0x10..=0x80 => 0x0F & !(n >> 4),
                _ => 0x0F,
            };
            assert_eq!(io.read_byte(0xFF00), 0xD0 | expected, "{button:?}");
        }
    }

    #[test]
    fn joypad_interrupt_on_new_press() {
        let mut io = IoRegisters::default();
        io.set_keys(Keys::new().with(Button::Start));
        assert_eq!(io.interrupt_flags() & 0x10, 0x10);
        io.write_byte(0xFF0F, 0);
        // Holding a key does not raise the interrupt again
        io.set_keys(Keys::new().with(Button::Start));
        assert_eq!(io.interrupt_flags(), 0);
        io.set_keys(Keys::new());
        assert_eq!(io.interrupt_flags(), 0);
    }

    #[test]
    fn serial_transfer() {
        let mut io = IoRegisters::default();
        io.write_byte(0xFF01, b'P');
        assert_eq!(io.read_byte(0xFF02), 0x7E);
        io.write_byte(0xFF02, 0x81);
        assert_eq!(io.drain_serial().collect::<Vec<_>>(), vec![b'P']);
        assert_eq!(io.read_byte(0xFF01), 0xFF);
        assert_eq!(io.read_byte(0xFF02), 0x7F);
        assert_eq!(io.interrupt_flags(), 0x08);
        // Internal clock not selected, nothing is sent
        io.write_byte(0xFF02, 0x80);
        assert_eq!(io.drain_serial().count(), 0);
    }

    #[test]
    fn interrupt_flags_read_with_top_bits_set() {
        let mut io = IoRegisters::default();
        io.write_byte(0xFF0F, 0xFF);
        assert_eq!(io.read_byte(0xFF0F), 0xFF);
        assert_eq!(io.interrupt_flags(), 0x1F);
        io.write_byte(0xFF0F, 0x00);
        assert_eq!(io.read_byte(0xFF0F), 0xE0);
    }

    #[test]
    fn audio_registers() {
        let mut io = IoRegisters::post_boot();
        assert_eq!(io.read_byte(0xFF26), 0xF1);
        assert_eq!(io.read_byte(0xFF24), 0x77);
        // Write-only period registers read back as 0xFF
        io.write_byte(0xFF13, 0x12);
        assert_eq!(io.read_byte(0xFF13), 0xFF);
        // Unused bits read back as 1
        io.write_byte(0xFF10, 0x00);
        assert_eq!(io.read_byte(0xFF10), 0x80);
        io.write_byte(0xFF30, 0xAB);
        assert_eq!(io.read_byte(0xFF30), 0xAB);
        assert_eq!(io.read_byte(0xFF27), 0xFF);
        let writes: Vec<_> = io.drain_audio_writes().collect();
        assert_eq!(writes, vec![(0xFF13, 0x12), (0xFF10, 0x00), (0xFF30, 0xAB)]);
        assert_eq!(io.drain_audio_writes().count(), 0);
    }
}
