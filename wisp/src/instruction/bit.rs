use super::*;

/// The single-bit operations in 0xCB40..0xCC00.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{op} {bit}, {reg}")]
pub struct BitOp {
    pub bit: u8,
    pub reg: RegOrPointer,
    pub op: BitOpInner,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum BitOpInner {
    #[display("BIT")]
    Bit,
    #[display("RES")]
    Res,
    #[display("SET")]
    Set,
}

impl BitOp {
    pub(crate) fn execute<M: MemoryLikeExt>(self, cpu: &mut Cpu, mem: &mut M) {
        let BitOp { bit, reg, op } = self;
        debug_assert!(bit < 8);
        let mask = 0x1 << bit;
        match op {
            BitOpInner::Bit => {
                let byte = cpu.copy_byte(mem, reg);
                cpu.f.z = byte & mask == 0;
                cpu.f.n = false;
                cpu.f.h = true;
            }
            BitOpInner::Res => {
                cpu.update_byte(reg, mem, |byte| *byte &= !mask);
            }
            BitOpInner::Set => {
                cpu.update_byte(reg, mem, |byte| *byte |= mask);
            }
        }
    }

    /// Returns the number of ticks to will take to complete this instruction.
    pub fn length(&self) -> u8 {
        match (self.op, self.reg) {
            (_, RegOrPointer::Reg(_)) => 8,
            // BIT only reads from memory
            (BitOpInner::Bit, RegOrPointer::Pointer) => 12,
            (_, RegOrPointer::Pointer) => 16,
        }
    }

    /// Returns the size of the bytes to took to construct this instruction
    pub const fn size(&self) -> u8 {
        2
    }
}
