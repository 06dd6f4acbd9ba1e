use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

/// The divider and timer registers. DIV is the upper byte of a free-running 16-bit counter that
/// advances once per cycle. TIMA advances whenever the counter bit selected by TAC falls from one
/// to zero, which gives the four documented timer frequencies.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRegisters {
    /// The internal counter. ADDR FF04 reads the upper byte.
    system_counter: u16,
    /// ADDR FF05
    /// The counter that is updated at the frequency specified by the TAC. Overflows trigger resets
    /// to the value in the timer modulo and then an interupt is requested.
    timer_counter: u8,
    /// ADDR FF06
    /// When the timer counter overflows, it resets to the value in this register.
    timer_modulo: u8,
    /// ADDR FF07
    timer_control: TimerControl,
}

impl Display for TimerRegisters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Timers {{")?;
        writeln!(f, "  DIV: 0x{:0>2X}", self.divider())?;
        writeln!(f, "  DIV counter: 0x{:0>2X}", self.system_counter as u8)?;
        writeln!(f, "  TIMA: 0x{:0>2X}", self.timer_counter)?;
        writeln!(f, "  TMA: 0x{:0>2X}", self.timer_modulo)?;
        writeln!(f, "  TAC: {:?}", self.timer_control)?;
        write!(f, "}}")
    }
}

/// Models the timer control (TAC) register, which controls how frequently the timer counter is
/// incremented. There is a variant for each frequency and the disabled state.
///
/// The data in `Disabled` tracks the clock select bits that were written to the register when
/// disabled. Without it, the register can not be properly read as part of the memory map.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerControl {
    Disabled(u8),
    /// Increments once every 1024 cycles (4096 Hz).
    Slowest,
    /// Increments once every 256 cycles (16384 Hz), i.e. as often as DIV.
    Slow,
    /// Increments once every 64 cycles (65536 Hz).
    Fast,
    /// Increments once every 16 cycles (262144 Hz).
    Fastest,
}

impl TimerRegisters {
    pub(super) fn new() -> Self {
        Self {
            system_counter: 0,
            timer_counter: 0,
            timer_modulo: 0,
            timer_control: TimerControl::Disabled(0),
        }
    }

    /// The state of the registers after the boot ROM hands control to the cartridge.
    pub(super) fn post_boot() -> Self {
        Self {
            system_counter: 0xABCC,
            ..Self::new()
        }
    }

    pub fn divider(&self) -> u8 {
        (self.system_counter >> 8) as u8
    }

    /// Advances the timers by the given number of cycles. Returns `true` if the timer counter
    /// overflowed and a timer interrupt should be requested.
    pub(super) fn tick(&mut self, cycles: u16) -> bool {
        let mut digest = false;
        for _ in 0..cycles {
            let before = self.timer_input();
            self.system_counter = self.system_counter.wrapping_add(1);
            if before && !self.timer_input() {
                digest |= self.inc_timer_counter();
            }
        }
        digest
    }

    /// The counter bit that the TIMA increment is wired to, gated by the TAC enable bit.
    fn timer_input(&self) -> bool {
        let bit = match self.timer_control {
            TimerControl::Disabled(_) => return false,
            TimerControl::Slowest => 9,
            TimerControl::Slow => 7,
            TimerControl::Fast => 5,
            TimerControl::Fastest => 3,
        };
        self.system_counter & (1 << bit) != 0
    }

    fn inc_timer_counter(&mut self) -> bool {
        match self.timer_counter.checked_add(1) {
            Some(val) => {
                self.timer_counter = val;
                false
            }
            // `None` indicates there was an overflow, so the modulo is loaded and an interrupt
            // needs to be requested.
            None => {
                trace!(target: "wisp::event", "Timer overflow, reloading 0x{:0>2X}", self.timer_modulo);
                self.timer_counter = self.timer_modulo;
                true
            }
        }
    }

    // NOTE: This method is also called when the STOP instruction is called.
    pub(super) fn reset(&mut self) -> bool {
        // Writing to the div resets the whole counter, which can cause a falling edge on the
        // timer input.
        let digest = if self.timer_input() {
            self.inc_timer_counter()
        } else {
            false
        };
        self.system_counter = 0;
        digest
    }

    pub(super) fn read_byte(&self, index: u16) -> u8 {
        match index {
            0xFF04 => self.divider(),
            0xFF05 => self.timer_counter,
            0xFF06 => self.timer_modulo,
            _ => 0xF8 | self.timer_control.as_byte(),
        }
    }

    pub(super) fn write_byte(&mut self, index: u16, value: u8) -> bool {
        match index {
            0xFF04 => return self.reset(),
            0xFF05 => self.timer_counter = value,
            0xFF06 => self.timer_modulo = value,
            _ => self.timer_control = TimerControl::from_byte(value),
        }
        false
    }
}

impl TimerControl {
    fn from_byte(byte: u8) -> Self {
        // We only care about the first 3 bits.
        match byte & 0b0000_0111 {
            0b101 => Self::Fastest,
            0b110 => Self::Fast,
            0b111 => Self::Slow,
            0b100 => Self::Slowest,
            byte => Self::Disabled(byte),
        }
    }

    fn as_byte(&self) -> u8 {
        match self {
            Self::Disabled(byte) => *byte,
            Self::Slowest => 0b100,
            Self::Slow => 0b111,
            Self::Fast => 0b110,
            Self::Fastest => 0b101,
        }
    }
}

#[cfg(test)]
mod test {
    use super::TimerRegisters;

    #[test]
    fn divider_register() {
        let mut regs = TimerRegisters::new();
        assert!(!regs.tick(255));
        assert_eq!(regs.divider(), 0);
        assert!(!regs.tick(1));
        assert_eq!(regs.divider(), 1);
        // We want to tick right up until the register wraps. At no point should there be an
        // interupt request since the timer counter is disabled
        assert!((0..254).all(|_| !regs.tick(256)));
        assert_eq!(regs.divider(), 0xFF);
        assert!(!regs.tick(256));
        assert_eq!(regs.divider(), 0);
    }

    #[test]
    fn divider_write_resets() {
        let mut regs = TimerRegisters::new();
        regs.tick(0x1234);
        assert_ne!(regs.read_byte(0xFF04), 0);
        regs.write_byte(0xFF04, 0xAB);
        assert_eq!(regs.read_byte(0xFF04), 0);
        // The internal counter was reset too
        regs.tick(255);
        assert_eq!(regs.read_byte(0xFF04), 0);
    }

    #[test]
    fn registers_read_back() {
        let mut regs = TimerRegisters::new();
        regs.write_byte(0xFF05, 0x12);
        regs.write_byte(0xFF06, 0x34);
        regs.write_byte(0xFF07, 0x05);
        assert_eq!(regs.read_byte(0xFF05), 0x12);
        assert_eq!(regs.read_byte(0xFF06), 0x34);
        assert_eq!(regs.read_byte(0xFF07), 0xFD);
        regs.write_byte(0xFF07, 0x02);
        assert_eq!(regs.read_byte(0xFF07), 0xFA);
    }

    #[test]
    fn timer_frequencies() {
        for (tac, period) in [(0x04, 1024), (0x05, 16), (0x06, 64), (0x07, 256)] {
            let mut regs = TimerRegisters::new();
            regs.write_byte(0xFF07, tac);
            assert!(!regs.tick(period - 1));
            assert_eq!(regs.read_byte(0xFF05), 0, "TAC 0x{tac:0>2X}");
            assert!(!regs.tick(1));
            assert_eq!(regs.read_byte(0xFF05), 1, "TAC 0x{tac:0>2X}");
            assert!(!regs.tick(period * 10));
            assert_eq!(regs.read_byte(0xFF05), 11, "TAC 0x{tac:0>2X}");
        }
    }

    #[test]
    fn timer_overflow_reloads_modulo() {
        let mut regs = TimerRegisters::new();
        regs.write_byte(0xFF06, 10);
        regs.write_byte(0xFF05, 0xFF);
        regs.write_byte(0xFF07, 0x05);
        assert!(!regs.tick(15));
        assert!(regs.tick(1));
        assert_eq!(regs.read_byte(0xFF05), 10);
        assert!(!regs.tick(16));
        assert_eq!(regs.read_byte(0xFF05), 11);
    }

    #[test]
    fn disabled_timer_holds() {
        let mut regs = TimerRegisters::new();
        regs.write_byte(0xFF07, 0x01);
        assert!(!regs.tick(4096));
        assert_eq!(regs.read_byte(0xFF05), 0);
    }
}
