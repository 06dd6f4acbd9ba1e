use super::*;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum ControlOp {
    #[display("HALT")]
    Halt,
    #[display("NOOP")]
    Noop,
    /// STOP is followed by a byte which the hardware ignores.
    #[display("STOP 0x{_0:0>2X}")]
    Stop(u8),
}

impl ControlOp {
    pub(crate) fn execute<M: MemoryLikeExt>(self, cpu: &mut Cpu, mem: &mut M) {
        match self {
            ControlOp::Noop => {}
            ControlOp::Halt => cpu.halt(mem),
            ControlOp::Stop(_) => cpu.stop(),
        }
    }

    /// Returns the number of ticks to will take to complete this instruction.
    pub fn length(&self) -> u8 {
        4
    }

    /// Returns the size of the bytes to took to construct this instruction
    pub const fn size(&self) -> u8 {
        match self {
            ControlOp::Noop | ControlOp::Halt => 1,
            ControlOp::Stop(_) => 2,
        }
    }
}
