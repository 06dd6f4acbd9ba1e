use crate::cpu::Cpu;
use crate::cpu::Flags;
use crate::mem::MemoryLikeExt;

use derive_more::From;
use derive_more::IsVariant;

mod arithmetic;
mod bit;
mod bit_shift;
mod control;
mod interrupt;
mod jump;
mod load;

pub use arithmetic::*;
pub use bit::*;
pub use bit_shift::*;
pub use control::*;
pub use interrupt::*;
pub use jump::*;
pub use load::*;

/// A decoded operation. Every instruction knows how many bytes it was decoded from (`size`) and
/// how many cycles it takes to execute (`length`).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum Instruction {
    #[display("{_0}")]
    Load(LoadOp),
    #[display("{_0}")]
    ControlOp(ControlOp),
    #[display("{_0}")]
    Jump(JumpOp),
    #[display("{_0}")]
    Arithmetic(ArithmeticOp),
    /// Includes the RLA, RLCA, RRA, RRCA ops, the only shifting ops that are not prefixed.
    #[display("{_0}")]
    BitShift(BitShiftOp),
    #[display("{_0}")]
    Bit(BitOp),
    #[display("DAA")]
    Daa,
    /// Set Carry.
    #[display("SCF")]
    Scf,
    /// ComPLement accumulator.
    #[display("CPL")]
    Cpl,
    /// CompLement carry flag.
    #[display("CCF")]
    Ccf,
    /// Disable interupts
    #[display("DI")]
    Di,
    /// Enable interupts
    #[display("EI")]
    Ei,
    /// Used for the eleven unused op codes. Executing one of these locks up the hardware.
    #[display("ILLEGAL 0x{_0:0>2X}")]
    Illegal(u8),
}

impl Instruction {
    /// Performs the operation. The PC must already point past the instruction.
    pub(crate) fn execute<M: MemoryLikeExt>(self, cpu: &mut Cpu, mem: &mut M) {
        match self {
            Instruction::Load(op) => op.execute(cpu, mem),
            Instruction::ControlOp(op) => op.execute(cpu, mem),
            Instruction::Jump(op) => op.execute(cpu, mem),
            Instruction::Arithmetic(op) => op.execute(cpu, mem),
            Instruction::BitShift(op) => op.execute(cpu, mem),
            Instruction::Bit(op) => op.execute(cpu, mem),
            Instruction::Daa => {
                let a = to_bcd(cpu.a.0, &mut cpu.f);
                cpu.a.0 = a;
            }
            Instruction::Scf => {
                cpu.f.n = false;
                cpu.f.h = false;
                cpu.f.c = true;
            }
            Instruction::Cpl => {
                cpu.a = !cpu.a;
                cpu.f.n = true;
                cpu.f.h = true;
            }
            Instruction::Ccf => {
                cpu.f.n = false;
                cpu.f.h = false;
                cpu.f.c = !cpu.f.c;
            }
            Instruction::Di => cpu.disable_interupts(),
            // The IME is set after the following instruction
            Instruction::Ei => cpu.to_set_ime = true,
            // `Cpu::step` refuses these before they are executed.
            Instruction::Illegal(_) => {}
        }
    }

    /// Returns the number of ticks to will take to complete this instruction.
    /// Takes a reference to the CPU in order to determine if this instruction will pass any
    /// conditions.
    pub fn length(&self, cpu: &Cpu) -> u8 {
        match self {
            Instruction::Load(op) => op.length(),
            Instruction::ControlOp(op) => op.length(),
            Instruction::Jump(op) => op.length(cpu),
            Instruction::Arithmetic(op) => op.length(),
            Instruction::BitShift(op) => op.length(),
            Instruction::Bit(op) => op.length(),
            Instruction::Daa
            | Instruction::Scf
            | Instruction::Cpl
            | Instruction::Ccf
            | Instruction::Di
            | Instruction::Ei
            | Instruction::Illegal(_) => 4,
        }
    }

    /// Returns the size of the bytes to took to construct this instruction
    pub const fn size(&self) -> u8 {
        match self {
            Instruction::Load(op) => op.size(),
            Instruction::ControlOp(op) => op.size(),
            Instruction::Jump(op) => op.size(),
            Instruction::Arithmetic(op) => op.size(),
            Instruction::BitShift(op) => op.size(),
            Instruction::Bit(op) => op.size(),
            Instruction::Daa
            | Instruction::Scf
            | Instruction::Cpl
            | Instruction::Ccf
            | Instruction::Di
            | Instruction::Ei
            | Instruction::Illegal(_) => 1,
        }
    }
}

/// The operand of an ALU operation: either a register (or the byte HL points to) or an immediate.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, From, derive_more::Display)]
#[display("{_variant}")]
pub enum SomeByte {
    #[display("{_0}")]
    Referenced(RegOrPointer),
    #[display("0x{_0:0>2X}")]
    Direct(u8),
}

impl SomeByte {
    fn read<M: MemoryLikeExt>(self, cpu: &Cpu, mem: &M) -> u8 {
        match self {
            SomeByte::Referenced(reg) => cpu.copy_byte(mem, reg),
            SomeByte::Direct(byte) => byte,
        }
    }

    /// Register operands take 4 cycles, while memory and immediate operands take 8.
    const fn length(&self) -> u8 {
        match self {
            SomeByte::Referenced(RegOrPointer::Reg(_)) => 4,
            _ => 8,
        }
    }

    const fn size(&self) -> u8 {
        match self {
            SomeByte::Direct(_) => 2,
            SomeByte::Referenced(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum WideReg {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL")]
    HL,
    #[display("SP")]
    SP,
}

/// The register pairs that PUSH and POP work with.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum WideRegWithoutSP {
    #[display("BC")]
    BC,
    #[display("DE")]
    DE,
    #[display("HL")]
    HL,
    #[display("AF")]
    AF,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum Condition {
    #[display("Z")]
    Zero,
    #[display("NZ")]
    NotZero,
    #[display("C")]
    Carry,
    #[display("NC")]
    NotCarry,
}

impl Condition {
    pub fn passed(&self, cpu: &Cpu) -> bool {
        match self {
            Condition::Zero => cpu.zero_flag(),
            Condition::NotZero => !cpu.zero_flag(),
            Condition::Carry => cpu.carry_flag(),
            Condition::NotCarry => !cpu.carry_flag(),
        }
    }
}

/// There are special operations for loading into the A register, so it is easier to have a special
/// enum for the unique types of pointers they use.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum LoadAPointer {
    /// Use the BC register
    #[display("BC")]
    BC,
    /// Use the DE register
    #[display("DE")]
    DE,
    /// Use the HL register and increment after performing the operation
    #[display("HL+")]
    Hli,
    /// Use the HL register and decrement after performing the operation
    #[display("HL-")]
    Hld,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum HalfRegister {
    #[display("A")]
    A,
    #[display("B")]
    B,
    #[display("C")]
    C,
    #[display("D")]
    D,
    #[display("E")]
    E,
    #[display("H")]
    H,
    #[display("L")]
    L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From, IsVariant, derive_more::Display)]
#[display("{_variant}")]
pub enum RegOrPointer {
    #[display("{_0}")]
    Reg(HalfRegister),
    #[display("(HL)")]
    Pointer,
}

/// Takes a byte that is in standard binary representation and converts it to binary coded decimal.
fn to_bcd(mut val: u8, flags: &mut Flags) -> u8 {
    if !flags.n {
        // after an addition, adjust if (half-)carry occurred or if result is out of bounds
        if flags.c || val > 0x99 {
            val = val.wrapping_add(0x60);
            flags.c = true;
        }
        if flags.h || (val & 0x0f) > 0x09 {
            val = val.wrapping_add(0x6);
        }
    } else {
        if flags.c {
            val = val.wrapping_sub(0x60);
        }
        if flags.h {
            val = val.wrapping_sub(0x6);
        }
    }
    flags.z = val == 0;
    flags.h = false;
    val
}
