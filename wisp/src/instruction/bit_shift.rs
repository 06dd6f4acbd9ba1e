use super::*;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum BitShiftOp {
    #[display("RLC {_0}")]
    Rlc(RegOrPointer),
    #[display("RLCA")]
    Rlca,
    #[display("RRC {_0}")]
    Rrc(RegOrPointer),
    #[display("RRCA")]
    Rrca,
    #[display("RL {_0}")]
    Rl(RegOrPointer),
    #[display("RLA")]
    Rla,
    #[display("RR {_0}")]
    Rr(RegOrPointer),
    #[display("RRA")]
    Rra,
    #[display("SLA {_0}")]
    Sla(RegOrPointer),
    #[display("SRA {_0}")]
    Sra(RegOrPointer),
    #[display("SWAP {_0}")]
    Swap(RegOrPointer),
    #[display("SRL {_0}")]
    Srl(RegOrPointer),
}

impl BitShiftOp {
    pub(crate) fn execute<M: MemoryLikeExt>(self, cpu: &mut Cpu, mem: &mut M) {
        let carry_in = cpu.f.c as u8;
        match self.operand() {
            // The accumulator forms always clear Z.
            None => {
                let (a, carry) = self.shift(cpu.a.0, carry_in);
                cpu.a.0 = a;
                cpu.f.set_for_byte_shift_op(false, carry);
            }
            Some(reg) => {
                let mut carry = false;
                let byte = cpu.update_byte(reg, mem, |byte| {
                    let (new, c) = self.shift(*byte, carry_in);
                    carry = c;
                    *byte = new;
                });
                cpu.f.set_for_byte_shift_op(byte == 0, carry);
            }
        }
    }

    fn operand(self) -> Option<RegOrPointer> {
        match self {
            BitShiftOp::Rlca | BitShiftOp::Rrca | BitShiftOp::Rla | BitShiftOp::Rra => None,
            BitShiftOp::Rlc(reg)
            | BitShiftOp::Rrc(reg)
            | BitShiftOp::Rl(reg)
            | BitShiftOp::Rr(reg)
            | BitShiftOp::Sla(reg)
            | BitShiftOp::Sra(reg)
            | BitShiftOp::Swap(reg)
            | BitShiftOp::Srl(reg) => Some(reg),
        }
    }

    /// Produces the shifted byte and the bit that was shifted out.
    fn shift(self, byte: u8, carry: u8) -> (u8, bool) {
        match self {
            BitShiftOp::Rlc(_) | BitShiftOp::Rlca => rotate_left(byte, carry),
            BitShiftOp::Rrc(_) | BitShiftOp::Rrca => rotate_right(byte, carry),
            BitShiftOp::Rl(_) | BitShiftOp::Rla => rotate_left_through_carry(byte, carry),
            BitShiftOp::Rr(_) | BitShiftOp::Rra => rotate_right_through_carry(byte, carry),
            BitShiftOp::Sla(_) => (byte << 1, byte & 0x80 != 0),
            BitShiftOp::Sra(_) => ((byte >> 1) | (byte & 0x80), byte & 1 != 0),
            BitShiftOp::Swap(_) => (byte.rotate_left(4), false),
            BitShiftOp::Srl(_) => (byte >> 1, byte & 1 != 0),
        }
    }

    /// Returns the number of ticks to will take to complete this instruction.
    pub fn length(&self) -> u8 {
        match self {
            BitShiftOp::Rlca | BitShiftOp::Rrca | BitShiftOp::Rla | BitShiftOp::Rra => 4,
            BitShiftOp::Rlc(RegOrPointer::Pointer)
            | BitShiftOp::Rrc(RegOrPointer::Pointer)
            | BitShiftOp::Rl(RegOrPointer::Pointer)
            | BitShiftOp::Rr(RegOrPointer::Pointer)
            | BitShiftOp::Sla(RegOrPointer::Pointer)
            | BitShiftOp::Sra(RegOrPointer::Pointer)
            | BitShiftOp::Swap(RegOrPointer::Pointer)
            | BitShiftOp::Srl(RegOrPointer::Pointer) => 16,
            _ => 8,
        }
    }

    /// Returns the size of the bytes to took to construct this instruction
    pub const fn size(&self) -> u8 {
        match self {
            BitShiftOp::Rlca | BitShiftOp::Rrca | BitShiftOp::Rla | BitShiftOp::Rra => 1,
            _ => 2,
        }
    }
}

fn rotate_left(byte: u8, _carry: u8) -> (u8, bool) {
    (byte.rotate_left(1), byte & 0x80 != 0)
}

fn rotate_right(byte: u8, _carry: u8) -> (u8, bool) {
    (byte.rotate_right(1), byte & 1 != 0)
}

fn rotate_left_through_carry(byte: u8, carry: u8) -> (u8, bool) {
    ((byte << 1) | carry, byte & 0x80 != 0)
}

fn rotate_right_through_carry(byte: u8, carry: u8) -> (u8, bool) {
    ((byte >> 1) | (carry << 7), byte & 1 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations() {
        assert_eq!(rotate_left(0x85, 0), (0x0B, true));
        assert_eq!(rotate_right(0x01, 0), (0x80, true));
        assert_eq!(rotate_left_through_carry(0x80, 0), (0x00, true));
        assert_eq!(rotate_left_through_carry(0x00, 1), (0x01, false));
        assert_eq!(rotate_right_through_carry(0x01, 0), (0x00, true));
        assert_eq!(rotate_right_through_carry(0x00, 1), (0x80, false));
    }

    #[test]
    fn shifts() {
        let reg = RegOrPointer::Pointer;
        assert_eq!(BitShiftOp::Sla(reg).shift(0x81, 0), (0x02, true));
        assert_eq!(BitShiftOp::Sra(reg).shift(0x81, 0), (0xC0, true));
        assert_eq!(BitShiftOp::Srl(reg).shift(0x80, 1), (0x40, false));
        assert_eq!(BitShiftOp::Swap(reg).shift(0xAB, 1), (0xBA, false));
    }
}
