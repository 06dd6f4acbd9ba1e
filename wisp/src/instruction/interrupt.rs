use crate::mem::io::InterruptFlag;

/// An interrupt dispatch. The discriminant is the address of the handler.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
#[repr(u16)]
pub enum InterruptOp {
    #[display("VBlank")]
    VBlank = 0x0040,
    #[display("LCD")]
    LCD = 0x0048,
    #[display("Timer")]
    Timer = 0x0050,
    #[display("Serial")]
    Serial = 0x0058,
    #[display("Joypad")]
    Joypad = 0x0060,
}

impl InterruptOp {
    /// Interrupts in the order the hardware services them.
    pub const PRIORITY: [InterruptOp; 5] = [
        InterruptOp::VBlank,
        InterruptOp::LCD,
        InterruptOp::Timer,
        InterruptOp::Serial,
        InterruptOp::Joypad,
    ];

    /// Picks the highest-priority interrupt out of a set of pending IE & IF bits.
    pub fn from_pending(pending: u8) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|op| pending & op.flag() as u8 != 0)
    }

    pub const fn flag(self) -> InterruptFlag {
        match self {
            InterruptOp::VBlank => InterruptFlag::VBlank,
            InterruptOp::LCD => InterruptFlag::Lcd,
            InterruptOp::Timer => InterruptFlag::Timer,
            InterruptOp::Serial => InterruptFlag::Serial,
            InterruptOp::Joypad => InterruptFlag::Joypad,
        }
    }

    pub const fn vector(self) -> u16 {
        self as u16
    }

    /// Dispatching takes five M-cycles: two waits, two stack pushes, and the jump.
    pub const fn length(&self) -> u8 {
        20
    }
}

#[cfg(test)]
mod tests {
    use super::InterruptOp;

    #[test]
    fn priority_order() {
        assert_eq!(InterruptOp::from_pending(0), None);
        assert_eq!(InterruptOp::from_pending(0x1F), Some(InterruptOp::VBlank));
        assert_eq!(InterruptOp::from_pending(0x1E), Some(InterruptOp::LCD));
        assert_eq!(InterruptOp::from_pending(0x14), Some(InterruptOp::Timer));
        assert_eq!(InterruptOp::from_pending(0x18), Some(InterruptOp::Serial));
        assert_eq!(InterruptOp::from_pending(0x10), Some(InterruptOp::Joypad));
        assert_eq!(InterruptOp::Timer.vector(), 0x50);
    }
}
