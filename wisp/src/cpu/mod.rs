use std::num::Wrapping;
use std::ops::Index;
use std::ops::IndexMut;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::trace;

use crate::error::ExecError;
use crate::instruction::HalfRegister;
use crate::instruction::Instruction;
use crate::instruction::InterruptOp;
use crate::instruction::LoadAPointer;
use crate::instruction::RegOrPointer;
use crate::instruction::WideReg;
use crate::instruction::WideRegWithoutSP;
use crate::lookup::parse_instruction;
use crate::mem::MemoryLike;
use crate::mem::MemoryLikeExt;


/// Address of the IF register.
const INTERRUPT_FLAGS: u16 = 0xFF0F;
/// Address of the IE register.
const INTERRUPT_ENABLE: u16 = 0xFFFF;

#[derive(Debug, Hash, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[display(
    "CPU {{ A=0x{:0>2X} F={} B=0x{:0>2X} C=0x{:0>2X} D=0x{:0>2X} E=0x{:0>2X} H=0x{:0>2X} L=0x{:0>2X} SP=0x{:0>4X} PC=0x{:0>4X} IME={} State={} }}",
    a,
    f,
    b,
    c,
    d,
    e,
    h,
    l,
    sp,
    pc,
    ime,
    state
)]
pub struct Cpu {
    pub a: Wrapping<u8>,
    pub f: Flags,
    pub b: Wrapping<u8>,
    pub c: Wrapping<u8>,
    pub d: Wrapping<u8>,
    pub e: Wrapping<u8>,
    pub h: Wrapping<u8>,
    pub l: Wrapping<u8>,
    /// The SP register
    pub sp: Wrapping<u16>,
    /// The PC register
    pub pc: Wrapping<u16>,
    pub ime: bool,
    /// Set by EI. The IME is raised once the instruction after EI has run.
    pub to_set_ime: bool,
    /// Once the gameboy has halted, the PC no longer moves. Each step costs 4 cycles until an
    /// enabled interrupt is requested.
    pub state: CpuState,
    /// Set when HALT runs with the IME off while an interrupt is already pending. The next
    /// fetch fails to increment the PC, so the byte after HALT is read twice.
    pub halt_bug: bool,
    /// Cleared when the host asks to quit. An unpowered CPU does nothing.
    pub powered: bool,
}

#[derive(
    Debug, Default, Hash, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize,
)]
pub enum CpuState {
    #[default]
    Running,
    Halted,
    Stopped,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, derive_more::Display, Serialize, Deserialize,
)]
#[display(
    "Flags(Z={} N={} H={} C={})",
    *z as u8,
    *n as u8,
    *h as u8,
    *c as u8
)]
pub struct Flags {
    /// The zero flag
    pub z: bool,
    /// The substraction flag
    pub n: bool,
    /// The half-carry flag
    pub h: bool,
    /// The full carry flag
    pub c: bool,
}

impl From<u8> for Flags {
    fn from(value: u8) -> Self {
        Self {
            z: check_bit_const::<7>(value),
            n: check_bit_const::<6>(value),
            h: check_bit_const::<5>(value),
            c: check_bit_const::<4>(value),
        }
    }
}

impl Flags {
    /// Loads the flags from the F register. The low nibble is dropped.
    pub fn set_from_byte(&mut self, val: u8) {
        *self = val.into();
    }

    pub fn set_for_byte_shift_op(&mut self, z: bool, c: bool) {
        self.z = z;
        self.n = false;
        self.h = false;
        self.c = c;
    }

    /// The F register. The low nibble always reads 0.
    pub fn as_byte(&self) -> u8 {
        bool_to_mask::<7>(self.z)
            | bool_to_mask::<6>(self.n)
            | bool_to_mask::<5>(self.h)
            | bool_to_mask::<4>(self.c)
    }
}

const fn bit_select<const B: u8>() -> u8 {
    const {
        match B {
            n @ 0..=7 => 0x1 << n,
            _ => panic!("You must select between the 0th and 7th bit!"),
        }
    }
}

const fn bool_to_mask<const B: u8>(val: bool) -> u8 {
    (val as u8) << B
}

pub const fn check_bit_const<const B: u8>(src: u8) -> bool {
    (src & bit_select::<B>()) == bit_select::<B>()
}

/// A view of memory used to decode the instruction fetched right after the halt bug. The PC
/// failed to increment past the opcode, so every operand byte is read one address early.
struct HaltBugView<'a> {
    mem: &'a dyn MemoryLike,
    pc: u16,
}

impl MemoryLike for HaltBugView<'_> {
    fn read_byte(&self, addr: u16) -> u8 {
        if addr > self.pc {
            self.mem.read_byte(addr - 1)
        } else {
            self.mem.read_byte(addr)
        }
    }

    fn write_byte(&mut self, _addr: u16, _val: u8) {}
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Constructs a CPU in the state that the boot ROM leaves it in.
    pub fn new() -> Self {
        Self {
            a: Wrapping(0x01),
            f: Flags::from(0xB0),
            b: Wrapping(0x00),
            c: Wrapping(0x13),
            d: Wrapping(0x00),
            e: Wrapping(0xD8),
            h: Wrapping(0x01),
            l: Wrapping(0x4D),
            sp: Wrapping(0xFFFE),
            pc: Wrapping(0x0100),
            ime: false,
            to_set_ime: false,
            state: CpuState::Running,
            halt_bug: false,
            powered: true,
        }
    }

    /// Get the top four bits of the F register
    pub fn flags(&self) -> &Flags {
        &self.f
    }

    /// Returns the value of the Z flag
    pub fn zero_flag(&self) -> bool {
        self.f.z
    }

    /// Returns the value of the N flag
    pub fn subtraction_flag(&self) -> bool {
        self.f.n
    }

    /// Returns the value of the H flag
    pub fn half_carry_flag(&self) -> bool {
        self.f.h
    }

    /// Returns the value of the C flag
    pub fn carry_flag(&self) -> bool {
        self.f.c
    }

    pub fn is_halted(&self) -> bool {
        !matches!(self.state, CpuState::Running)
    }

    pub fn power_off(&mut self) {
        self.powered = false;
    }

    /// Decodes the instruction at the PC without running it.
    pub fn read_op(&self, mem: &impl MemoryLike) -> Instruction {
        parse_instruction(mem, self.pc.0)
    }

    /// Fetches, decodes, and executes one instruction. Returns the number of cycles that it
    /// took. A halted (or stopped) CPU does nothing for 4 cycles.
    pub fn step<M: MemoryLikeExt>(&mut self, mem: &mut M) -> Result<u8, ExecError> {
        if self.is_halted() || !self.powered {
            return Ok(4);
        }
        let pc = self.pc.0;
        let (instr, advance) = if std::mem::take(&mut self.halt_bug) {
            let view = HaltBugView { mem: &*mem, pc };
            let instr = parse_instruction(&view, pc);
            (instr, instr.size() - 1)
        } else {
            let instr = parse_instruction(&*mem, pc);
            (instr, instr.size())
        };
        if let Instruction::Illegal(op) = instr {
            return Err(ExecError::IllegalOpcode { op, pc });
        }
        trace!(target: "wisp::instr", "0x{pc:0>4X}: {instr}");
        let cycles = instr.length(self);
        let enable_after = std::mem::take(&mut self.to_set_ime);
        self.pc += Wrapping(advance as u16);
        instr.execute(self, mem);
        if enable_after && instr != Instruction::Di {
            self.ime = true;
        }
        Ok(cycles)
    }

    /// Checks for requested interrupts. Any enabled request wakes a halted CPU. If the IME is
    /// set, the highest-priority request is dispatched and the number of cycles spent doing so
    /// is returned.
    pub fn service_interrupt<M: MemoryLikeExt>(&mut self, mem: &mut M) -> Option<u8> {
        let flags = mem.read_byte(INTERRUPT_FLAGS);
        let pending = mem.read_byte(INTERRUPT_ENABLE) & flags & 0x1F;
        if pending == 0 {
            return None;
        }
        if self.is_halted() {
            debug!(target: "wisp::event", "CPU woken by pending interrupts 0x{pending:0>2X}");
            self.state = CpuState::Running;
        }
        if !self.ime {
            return None;
        }
        let op = InterruptOp::from_pending(pending)?;
        debug!(target: "wisp::event", "Servicing {op} interrupt from 0x{:0>4X}", self.pc.0);
        self.ime = false;
        self.to_set_ime = false;
        mem.write_byte(INTERRUPT_FLAGS, flags & !(op.flag() as u8));
        let pc = self.pc.0;
        self.push(mem, pc);
        self.pc.0 = op.vector();
        Some(op.length())
    }

    pub(crate) fn halt<M: MemoryLikeExt>(&mut self, mem: &M) {
        let pending = mem.read_byte(INTERRUPT_ENABLE) & mem.read_byte(INTERRUPT_FLAGS) & 0x1F;
        if !self.ime && pending != 0 {
            debug!(target: "wisp::event", "HALT bug at 0x{:0>4X}", self.pc.0);
            self.halt_bug = true;
        } else {
            self.state = CpuState::Halted;
        }
    }

    pub(crate) fn stop(&mut self) {
        debug!(target: "wisp::event", "CPU stopped at 0x{:0>4X}", self.pc.0);
        self.state = CpuState::Stopped;
    }

    pub(crate) fn enable_interupts(&mut self) {
        self.ime = true;
    }

    pub(crate) fn disable_interupts(&mut self) {
        self.ime = false;
        self.to_set_ime = false;
    }

    pub fn ptr(&self) -> u16 {
        u16::from_be_bytes([self.h.0, self.l.0])
    }

    pub(crate) fn set_ptr(&mut self, val: u16) {
        let [h, l] = val.to_be_bytes().map(Wrapping);
        self.h = h;
        self.l = l;
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a.0, self.f.as_byte()])
    }

    fn write_af(&mut self, val: u16) {
        let [a, f] = val.to_be_bytes();
        self.a = Wrapping(a);
        self.f.set_from_byte(f);
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b.0, self.c.0])
    }

    fn write_bc(&mut self, val: u16) {
        let [b, c] = val.to_be_bytes().map(Wrapping);
        self.b = b;
        self.c = c;
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d.0, self.e.0])
    }

    fn write_de(&mut self, val: u16) {
        let [d, e] = val.to_be_bytes().map(Wrapping);
        self.d = d;
        self.e = e;
    }

    pub(crate) fn read_wide_reg(&self, reg: WideReg) -> u16 {
        match reg {
            WideReg::BC => self.bc(),
            WideReg::DE => self.de(),
            WideReg::HL => self.ptr(),
            WideReg::SP => self.sp.0,
        }
    }

    pub(crate) fn write_wide_reg(&mut self, reg: WideReg, val: u16) {
        match reg {
            WideReg::BC => self.write_bc(val),
            WideReg::DE => self.write_de(val),
            WideReg::HL => self.set_ptr(val),
            WideReg::SP => self.sp = Wrapping(val),
        }
    }

    pub(crate) fn read_wide_reg_without_sp(&self, reg: WideRegWithoutSP) -> u16 {
        match reg {
            WideRegWithoutSP::BC => self.bc(),
            WideRegWithoutSP::DE => self.de(),
            WideRegWithoutSP::HL => self.ptr(),
            WideRegWithoutSP::AF => self.af(),
        }
    }

    pub(crate) fn write_wide_reg_without_sp(&mut self, reg: WideRegWithoutSP, val: u16) {
        match reg {
            WideRegWithoutSP::BC => self.write_bc(val),
            WideRegWithoutSP::DE => self.write_de(val),
            WideRegWithoutSP::HL => self.set_ptr(val),
            WideRegWithoutSP::AF => self.write_af(val),
        }
    }

    /// Resolves the address used by the special A loads, applying the post-increment or
    /// post-decrement of HL.
    pub(crate) fn a_pointer(&mut self, ptr: LoadAPointer) -> u16 {
        match ptr {
            LoadAPointer::BC => self.bc(),
            LoadAPointer::DE => self.de(),
            LoadAPointer::Hli => {
                let addr = self.ptr();
                self.set_ptr(addr.wrapping_add(1));
                addr
            }
            LoadAPointer::Hld => {
                let addr = self.ptr();
                self.set_ptr(addr.wrapping_sub(1));
                addr
            }
        }
    }

    /// Computes SP plus a signed offset. Used by both `ADD SP, e` and `LD HL, SP+e`, which set
    /// the flags from the unsigned addition of the low byte.
    pub(crate) fn sp_plus(&mut self, offset: i8) -> u16 {
        let sp = self.sp.0;
        let byte = offset as u8;
        self.f = Flags {
            z: false,
            n: false,
            h: (sp & 0x0F) + (byte as u16 & 0x0F) > 0x0F,
            c: (sp & 0xFF) + byte as u16 > 0xFF,
        };
        sp.wrapping_add_signed(offset as i16)
    }

    pub(crate) fn jump_relative(&mut self, offset: i8) {
        self.pc.0 = self.pc.0.wrapping_add_signed(offset as i16);
    }

    pub(crate) fn call<M: MemoryLike>(&mut self, mem: &mut M, dest: u16) {
        let pc = self.pc.0;
        self.push(mem, pc);
        self.pc.0 = dest;
    }

    pub(crate) fn push<M: MemoryLike>(&mut self, mem: &mut M, val: u16) {
        let [hi, lo] = val.to_be_bytes();
        self.sp -= Wrapping(1);
        mem.write_byte(self.sp.0, hi);
        self.sp -= Wrapping(1);
        mem.write_byte(self.sp.0, lo);
    }

    pub(crate) fn pop<M: MemoryLike>(&mut self, mem: &M) -> u16 {
        let lo = mem.read_byte(self.sp.0);
        self.sp += Wrapping(1);
        let hi = mem.read_byte(self.sp.0);
        self.sp += Wrapping(1);
        u16::from_be_bytes([hi, lo])
    }

    pub fn copy_byte(&self, mem: &impl MemoryLike, reg: RegOrPointer) -> u8 {
        match reg {
            RegOrPointer::Reg(reg) => self[reg].0,
            RegOrPointer::Pointer => mem.read_byte(self.ptr()),
        }
    }

    pub(crate) fn update_byte(
        &mut self,
        reg: RegOrPointer,
        mem: &mut impl MemoryLikeExt,
        update: impl FnOnce(&mut u8),
    ) -> u8 {
        match reg {
            RegOrPointer::Reg(reg) => {
                update(&mut self[reg].0);
                self[reg].0
            }
            RegOrPointer::Pointer => mem.update_byte(self.ptr(), update),
        }
    }

    /// Stores the given byte into either an (half) register or into the MemoryMap using the HL
    /// register as an index.
    pub(crate) fn write_byte(&mut self, reg: RegOrPointer, mem: &mut impl MemoryLike, val: u8) {
        match reg {
            RegOrPointer::Reg(reg) => self[reg].0 = val,
            RegOrPointer::Pointer => mem.write_byte(self.ptr(), val),
        }
    }
}

impl Index<HalfRegister> for Cpu {
    type Output = Wrapping<u8>;

    fn index(&self, index: HalfRegister) -> &Self::Output {
        match index {
            HalfRegister::A => &self.a,
            HalfRegister::B => &self.b,
            HalfRegister::C => &self.c,
            HalfRegister::D => &self.d,
            HalfRegister::E => &self.e,
            HalfRegister::H => &self.h,
            HalfRegister::L => &self.l,
        }
    }
}

impl IndexMut<HalfRegister> for Cpu {
    fn index_mut(&mut self, index: HalfRegister) -> &mut Self::Output {
        match index {
            HalfRegister::A => &mut self.a,
            HalfRegister::B => &mut self.b,
            HalfRegister::C => &mut self.c,
            HalfRegister::D => &mut self.d,
            HalfRegister::E => &mut self.e,
            HalfRegister::H => &mut self.h,
            HalfRegister::L => &mut self.l,
        }
    }
}
