use super::*;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum LoadOp {
    /// Used for opcodes in 0x40..0x80, save for 0x76 (HALT).
    #[display("LD {dest}, {src}")]
    Basic {
        dest: RegOrPointer,
        src: RegOrPointer,
    },
    /// Used for opcodes 0x_1 in 0x00..0x40
    #[display("LD {_0}, 0x{_1:0>4X}")]
    Direct16(WideReg, u16),
    /// Used for opcodes 0x_6 and 0x_E
    #[display("LD {_0}, 0x{_1:0>2X}")]
    Direct(RegOrPointer, u8),
    /// Used for opcodes 0x_A
    #[display("LD A, ({_0})")]
    LoadIntoA(LoadAPointer),
    /// Used for opcodes 0x_2
    #[display("LD ({_0}), A")]
    StoreFromA(LoadAPointer),
    /// Opcode: 0x08
    /// Store SP & $FF at address n16 and SP >> 8 at address n16 + 1.
    #[display("LD (0x{_0:0>4X}), SP")]
    StoreSP(u16),
    /// Opcode: 0xF9
    #[display("LD SP, HL")]
    HLIntoSP,
    /// Opcode: 0xF8
    /// Add the signed value e8 to SP and store the result in HL.
    #[display("LD HL, SP{_0:+}")]
    SPIntoHL(i8),
    /// Used for opcodes 0x_1 in 0xC0..0x100
    #[display("POP {_0}")]
    Pop(WideRegWithoutSP),
    /// Used for opcodes 0x_5 in 0xC0..0x100
    #[display("PUSH {_0}")]
    Push(WideRegWithoutSP),
    /// Used for opcode 0xE0
    #[display("LDH (0xFF{_0:0>2X}), A")]
    StoreHigh(u8),
    /// Used for opcode 0xF0
    #[display("LDH A, (0xFF{_0:0>2X})")]
    LoadHigh(u8),
    /// Used for opcode 0xE2
    #[display("LD (C), A")]
    Ldhca,
    /// Used for opcode 0xF2
    #[display("LD A, (C)")]
    Ldhac,
    /// Used for opcode 0xEA
    #[display("LD (0x{ptr:0>4X}), A")]
    StoreA { ptr: u16 },
    /// Used for opcode 0xFA
    #[display("LD A, (0x{ptr:0>4X})")]
    LoadA { ptr: u16 },
}

impl LoadOp {
    pub(crate) fn execute<M: MemoryLikeExt>(self, cpu: &mut Cpu, mem: &mut M) {
        match self {
            LoadOp::Basic { dest, src } => {
                let byte = cpu.copy_byte(mem, src);
                cpu.write_byte(dest, mem, byte);
            }
            LoadOp::Direct16(reg, val) => cpu.write_wide_reg(reg, val),
            LoadOp::Direct(reg, val) => cpu.write_byte(reg, mem, val),
            LoadOp::LoadIntoA(ptr) => {
                let index = cpu.a_pointer(ptr);
                cpu.a.0 = mem.read_byte(index);
            }
            LoadOp::StoreFromA(ptr) => {
                let index = cpu.a_pointer(ptr);
                mem.write_byte(index, cpu.a.0)
            }
            LoadOp::StoreSP(ptr) => {
                let [hi, lo] = cpu.sp.0.to_be_bytes();
                mem.write_byte(ptr, lo);
                mem.write_byte(ptr.wrapping_add(1), hi);
            }
            LoadOp::HLIntoSP => cpu.sp.0 = cpu.ptr(),
            LoadOp::SPIntoHL(offset) => {
                let val = cpu.sp_plus(offset);
                cpu.set_ptr(val);
            }
            LoadOp::Pop(reg) => {
                let val = cpu.pop(mem);
                cpu.write_wide_reg_without_sp(reg, val);
            }
            LoadOp::Push(reg) => {
                let val = cpu.read_wide_reg_without_sp(reg);
                cpu.push(mem, val);
            }
            LoadOp::StoreHigh(val) => mem.write_byte(u16::from_be_bytes([0xFF, val]), cpu.a.0),
            LoadOp::LoadHigh(val) => cpu.a.0 = mem.read_byte(u16::from_be_bytes([0xFF, val])),
            LoadOp::Ldhca => mem.write_byte(u16::from_be_bytes([0xFF, cpu.c.0]), cpu.a.0),
            LoadOp::Ldhac => cpu.a.0 = mem.read_byte(u16::from_be_bytes([0xFF, cpu.c.0])),
            LoadOp::StoreA { ptr } => mem.write_byte(ptr, cpu.a.0),
            LoadOp::LoadA { ptr } => cpu.a.0 = mem.read_byte(ptr),
        }
    }

    /// Returns the number of ticks to will take to complete this instruction.
    pub fn length(&self) -> u8 {
        match self {
            LoadOp::Basic {
                dest: RegOrPointer::Pointer,
                ..
            }
            | LoadOp::Basic {
                src: RegOrPointer::Pointer,
                ..
            } => 8,
            LoadOp::Basic { .. } => 4,
            LoadOp::Direct16(_, _) => 12,
            LoadOp::Direct(RegOrPointer::Pointer, _) => 12,
            LoadOp::Direct(_, _) => 8,
            LoadOp::LoadIntoA(_) => 8,
            LoadOp::StoreFromA(_) => 8,
            LoadOp::StoreSP(_) => 20,
            LoadOp::HLIntoSP => 8,
            LoadOp::SPIntoHL(_) => 12,
            LoadOp::Pop(_) => 12,
            LoadOp::Push(_) => 16,
            LoadOp::StoreHigh(_) => 12,
            LoadOp::LoadHigh(_) => 12,
            LoadOp::Ldhca => 8,
            LoadOp::Ldhac => 8,
            LoadOp::StoreA { .. } => 16,
            LoadOp::LoadA { .. } => 16,
        }
    }

    /// Returns the size of the bytes to took to construct this instruction
    pub const fn size(&self) -> u8 {
        match self {
            LoadOp::Basic { .. } => 1,
            LoadOp::Direct16(_, _) => 3,
            LoadOp::Direct(_, _) => 2,
            LoadOp::LoadIntoA(_) => 1,
            LoadOp::StoreFromA(_) => 1,
            LoadOp::StoreSP(_) => 3,
            LoadOp::HLIntoSP => 1,
            LoadOp::SPIntoHL(_) => 2,
            LoadOp::Pop(_) => 1,
            LoadOp::Push(_) => 1,
            LoadOp::StoreHigh(_) => 2,
            LoadOp::LoadHigh(_) => 2,
            LoadOp::Ldhca => 1,
            LoadOp::Ldhac => 1,
            LoadOp::StoreA { .. } => 3,
            LoadOp::LoadA { .. } => 3,
        }
    }
}
