use super::*;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, derive_more::Display)]
#[display("{_variant}")]
pub enum ArithmeticOp {
    #[display("ADD A, {_0}")]
    Add(SomeByte),
    #[display("ADD HL, {_0}")]
    Add16(WideReg),
    #[display("ADD SP, {_0}")]
    AddSP(i8),
    #[display("ADC A, {_0}")]
    Adc(SomeByte),
    #[display("SUB A, {_0}")]
    Sub(SomeByte),
    #[display("SBC A, {_0}")]
    Sbc(SomeByte),
    #[display("AND A, {_0}")]
    And(SomeByte),
    #[display("XOR A, {_0}")]
    Xor(SomeByte),
    #[display("OR A, {_0}")]
    Or(SomeByte),
    #[display("CP A, {_0}")]
    Cp(SomeByte),
    #[display("INC {_0}")]
    Inc(RegOrPointer),
    #[display("INC {_0}")]
    Inc16(WideReg),
    #[display("DEC {_0}")]
    Dec(RegOrPointer),
    #[display("DEC {_0}")]
    Dec16(WideReg),
}

fn addition_operation(val: &mut u8, op: u8, carry_in: bool, flags: &mut Flags) {
    let carry_in = carry_in as u8;
    let (a, c1) = val.overflowing_add(op);
    let (a, c2) = a.overflowing_add(carry_in);
    flags.z = a == 0;
    flags.n = false;
    flags.h = (*val & 0x0F) + (op & 0x0F) + carry_in > 0x0F;
    flags.c = c1 | c2;
    *val = a;
}

fn subtraction_operation(val: &mut u8, op: u8, carry_in: bool, flags: &mut Flags) {
    let carry_in = carry_in as u8;
    let (a, c1) = val.overflowing_sub(op);
    let (a, c2) = a.overflowing_sub(carry_in);
    flags.z = a == 0;
    flags.n = true;
    flags.h = (*val & 0x0F) < (op & 0x0F) + carry_in;
    flags.c = c1 | c2;
    *val = a;
}

impl ArithmeticOp {
    pub(crate) fn execute<M: MemoryLikeExt>(self, cpu: &mut Cpu, mem: &mut M) {
        match self {
            ArithmeticOp::Add(byte) => {
                let byte = byte.read(cpu, mem);
                addition_operation(&mut cpu.a.0, byte, false, &mut cpu.f);
            }
            ArithmeticOp::Adc(byte) => {
                let byte = byte.read(cpu, mem);
                let carry = cpu.f.c;
                addition_operation(&mut cpu.a.0, byte, carry, &mut cpu.f);
            }
            ArithmeticOp::Sub(byte) => {
                let byte = byte.read(cpu, mem);
                subtraction_operation(&mut cpu.a.0, byte, false, &mut cpu.f);
            }
            ArithmeticOp::Sbc(byte) => {
                let byte = byte.read(cpu, mem);
                let carry = cpu.f.c;
                subtraction_operation(&mut cpu.a.0, byte, carry, &mut cpu.f);
            }
            ArithmeticOp::Cp(byte) => {
                let byte = byte.read(cpu, mem);
                let mut a = cpu.a.0;
                subtraction_operation(&mut a, byte, false, &mut cpu.f);
            }
            ArithmeticOp::And(byte) => {
                let byte = byte.read(cpu, mem);
                cpu.a.0 &= byte;
                cpu.f = Flags {
                    z: cpu.a.0 == 0,
                    n: false,
                    h: true,
                    c: false,
                };
            }
            ArithmeticOp::Xor(byte) => {
                let byte = byte.read(cpu, mem);
                cpu.a.0 ^= byte;
                cpu.f = Flags {
                    z: cpu.a.0 == 0,
                    ..Flags::default()
                };
            }
            ArithmeticOp::Or(byte) => {
                let byte = byte.read(cpu, mem);
                cpu.a.0 |= byte;
                cpu.f = Flags {
                    z: cpu.a.0 == 0,
                    ..Flags::default()
                };
            }
            ArithmeticOp::Inc(reg) => {
                let mut h = false;
                let val = cpu.update_byte(reg, mem, |byte| {
                    h = *byte & 0x0F == 0x0F;
                    *byte = byte.wrapping_add(1);
                });
                cpu.f.z = val == 0;
                cpu.f.n = false;
                cpu.f.h = h;
            }
            ArithmeticOp::Dec(reg) => {
                let mut h = false;
                let val = cpu.update_byte(reg, mem, |byte| {
                    h = *byte & 0x0F == 0x00;
                    *byte = byte.wrapping_sub(1);
                });
                cpu.f.z = val == 0;
                cpu.f.n = true;
                cpu.f.h = h;
            }
            ArithmeticOp::Add16(reg) => {
                let value = cpu.read_wide_reg(reg);
                let ptr = cpu.ptr();
                cpu.f.h = (ptr & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
                let (ptr, carry) = ptr.overflowing_add(value);
                cpu.set_ptr(ptr);
                cpu.f.n = false;
                cpu.f.c = carry;
            }
            ArithmeticOp::AddSP(offset) => cpu.sp.0 = cpu.sp_plus(offset),
            ArithmeticOp::Inc16(reg) => {
                let val = cpu.read_wide_reg(reg).wrapping_add(1);
                cpu.write_wide_reg(reg, val);
            }
            ArithmeticOp::Dec16(reg) => {
                let val = cpu.read_wide_reg(reg).wrapping_sub(1);
                cpu.write_wide_reg(reg, val);
            }
        }
    }

    /// Returns the number of ticks to will take to complete this instruction.
    pub fn length(&self) -> u8 {
        match self {
            ArithmeticOp::Add(byte)
            | ArithmeticOp::Adc(byte)
            | ArithmeticOp::Sub(byte)
            | ArithmeticOp::Sbc(byte)
            | ArithmeticOp::And(byte)
            | ArithmeticOp::Xor(byte)
            | ArithmeticOp::Or(byte)
            | ArithmeticOp::Cp(byte) => byte.length(),
            ArithmeticOp::Inc(RegOrPointer::Pointer) => 12,
            ArithmeticOp::Inc(RegOrPointer::Reg(_)) => 4,
            ArithmeticOp::Dec(RegOrPointer::Pointer) => 12,
            ArithmeticOp::Dec(RegOrPointer::Reg(_)) => 4,
            ArithmeticOp::Add16(_) => 8,
            ArithmeticOp::Inc16(_) => 8,
            ArithmeticOp::Dec16(_) => 8,
            ArithmeticOp::AddSP(_) => 16,
        }
    }

    /// Returns the size of the bytes to took to construct this instruction
    pub const fn size(&self) -> u8 {
        match self {
            ArithmeticOp::Add(byte)
            | ArithmeticOp::Adc(byte)
            | ArithmeticOp::Sub(byte)
            | ArithmeticOp::Sbc(byte)
            | ArithmeticOp::And(byte)
            | ArithmeticOp::Xor(byte)
            | ArithmeticOp::Or(byte)
            | ArithmeticOp::Cp(byte) => byte.size(),
            ArithmeticOp::AddSP(_) => 2,
            ArithmeticOp::Add16(_)
            | ArithmeticOp::Inc(_)
            | ArithmeticOp::Dec(_)
            | ArithmeticOp::Inc16(_)
            | ArithmeticOp::Dec16(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{addition_operation, subtraction_operation};
    use crate::cpu::Flags;

    #[test]
    fn half_carry_on_addition() {
        let mut flags = Flags::default();
        let mut val = 0x0F;
        addition_operation(&mut val, 0x01, false, &mut flags);
        assert_eq!(val, 0x10);
        assert!(flags.h);
        assert!(!flags.c);
        assert!(!flags.z);

        let mut val = 0xFF;
        addition_operation(&mut val, 0x01, false, &mut flags);
        assert_eq!(val, 0x00);
        assert!(flags.h);
        assert!(flags.c);
        assert!(flags.z);

        let mut val = 0x0E;
        addition_operation(&mut val, 0x01, true, &mut flags);
        assert_eq!(val, 0x10);
        assert!(flags.h);
    }

    #[test]
    fn half_carry_on_subtraction() {
        let mut flags = Flags::default();
        let mut val = 0x10;
        subtraction_operation(&mut val, 0x01, false, &mut flags);
        assert_eq!(val, 0x0F);
        assert!(flags.h);
        assert!(!flags.c);
        assert!(flags.n);

        let mut val = 0x00;
        subtraction_operation(&mut val, 0x01, false, &mut flags);
        assert_eq!(val, 0xFF);
        assert!(flags.h);
        assert!(flags.c);

        let mut val = 0x01;
        subtraction_operation(&mut val, 0x00, true, &mut flags);
        assert_eq!(val, 0x00);
        assert!(!flags.h);
        assert!(flags.z);
    }
}
