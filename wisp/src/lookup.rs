//! The opcode tables. Decoding is a pair of 256-entry lookups: one for the primary opcodes and one
//! for those following the 0xCB prefix. Each entry reads whatever immediates it needs from the
//! bytes after the opcode.

use array_concat::concat_arrays;

use crate::instruction::*;
use crate::mem::MemoryLike;

type OpArray<const N: usize> = [fn(&dyn MemoryLike, u16) -> Instruction; N];

/// Decodes the instruction at `pc`. The eleven unused opcodes decode to [`Instruction::Illegal`].
pub fn parse_instruction(mem: &dyn MemoryLike, pc: u16) -> Instruction {
    OP_LOOKUP[mem.read_byte(pc) as usize](mem, pc)
}

/// Decodes the instruction that follows a 0xCB prefix. `pc` is the address of the byte after the
/// prefix.
pub fn parse_prefixed_instruction(mem: &dyn MemoryLike, pc: u16) -> Instruction {
    PREFIXED_OP_LOOKUP[mem.read_byte(pc) as usize](mem, pc)
}

fn imm8(mem: &dyn MemoryLike, pc: u16) -> u8 {
    mem.read_byte(pc.wrapping_add(1))
}

fn imm16(mem: &dyn MemoryLike, pc: u16) -> u16 {
    u16::from_le_bytes([
        mem.read_byte(pc.wrapping_add(1)),
        mem.read_byte(pc.wrapping_add(2)),
    ])
}

enum InnerRegOrPointer {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    Pointer,
}

impl InnerRegOrPointer {
    const fn convert(self) -> RegOrPointer {
        match self {
            InnerRegOrPointer::A => RegOrPointer::Reg(HalfRegister::A),
            InnerRegOrPointer::B => RegOrPointer::Reg(HalfRegister::B),
            InnerRegOrPointer::C => RegOrPointer::Reg(HalfRegister::C),
            InnerRegOrPointer::D => RegOrPointer::Reg(HalfRegister::D),
            InnerRegOrPointer::E => RegOrPointer::Reg(HalfRegister::E),
            InnerRegOrPointer::H => RegOrPointer::Reg(HalfRegister::H),
            InnerRegOrPointer::L => RegOrPointer::Reg(HalfRegister::L),
            InnerRegOrPointer::Pointer => RegOrPointer::Pointer,
        }
    }
}

// More specific arms must come before the general ones that would also match them.
macro_rules! define_op {
    (ILLEGAL) => {
        |mem, pc| Instruction::Illegal(mem.read_byte(pc))
    };
    (DAA) => {
        |_, _| Instruction::Daa
    };
    (SCF) => {
        |_, _| Instruction::Scf
    };
    (CPL) => {
        |_, _| Instruction::Cpl
    };
    (CCF) => {
        |_, _| Instruction::Ccf
    };
    (NOOP) => {
        |_, _| Instruction::ControlOp(ControlOp::Noop)
    };
    (STOP) => {
        |mem, pc| Instruction::ControlOp(ControlOp::Stop(imm8(mem, pc)))
    };
    (DI) => {
        |_, _| Instruction::Di
    };
    (EI) => {
        |_, _| Instruction::Ei
    };
    (PREFIX) => {
        |mem, pc| parse_prefixed_instruction(mem, pc.wrapping_add(1))
    };
    /* --- Jumps --- */
    (JR) => {
        |mem, pc| Instruction::Jump(JumpOp::Relative(imm8(mem, pc) as i8))
    };
    (JR, $r: ident) => {
        |mem, pc| Instruction::Jump(JumpOp::ConditionalRelative(Condition::$r, imm8(mem, pc) as i8))
    };
    (JP) => {
        |mem, pc| Instruction::Jump(JumpOp::Absolute(imm16(mem, pc)))
    };
    (JP, HL) => {
        |_, _| Instruction::Jump(JumpOp::JumpToHL)
    };
    (JP, $r: ident) => {
        |mem, pc| Instruction::Jump(JumpOp::ConditionalAbsolute(Condition::$r, imm16(mem, pc)))
    };
    (CALL) => {
        |mem, pc| Instruction::Jump(JumpOp::Call(imm16(mem, pc)))
    };
    (CALL, $r: ident) => {
        |mem, pc| Instruction::Jump(JumpOp::ConditionalCall(Condition::$r, imm16(mem, pc)))
    };
    (RET) => {
        |_, _| Instruction::Jump(JumpOp::Return)
    };
    (RETI) => {
        |_, _| Instruction::Jump(JumpOp::ReturnAndEnable)
    };
    (RET, $r: ident) => {
        |_, _| Instruction::Jump(JumpOp::ConditionalReturn(Condition::$r))
    };
    (RST, $v: ident) => {
        |_, _| Instruction::Jump(JumpOp::$v)
    };
    /* --- Arithmetic --- */
    (ADD, SP) => {
        |mem, pc| Instruction::Arithmetic(ArithmeticOp::AddSP(imm8(mem, pc) as i8))
    };
    (ALU, $op: ident) => {
        |mem, pc| Instruction::Arithmetic(ArithmeticOp::$op(SomeByte::Direct(imm8(mem, pc))))
    };
    (ALU, $op: ident, $r: ident) => {
        |_, _| Instruction::Arithmetic(ArithmeticOp::$op(InnerRegOrPointer::$r.convert().into()))
    };
    (ADD16, $r: ident) => {
        |_, _| Instruction::Arithmetic(ArithmeticOp::Add16(WideReg::$r))
    };
    (INC, $r: ident) => {
        |_, _| Instruction::Arithmetic(ArithmeticOp::Inc(InnerRegOrPointer::$r.convert()))
    };
    (INC16, $r: ident) => {
        |_, _| Instruction::Arithmetic(ArithmeticOp::Inc16(WideReg::$r))
    };
    (DEC, $r: ident) => {
        |_, _| Instruction::Arithmetic(ArithmeticOp::Dec(InnerRegOrPointer::$r.convert()))
    };
    (DEC16, $r: ident) => {
        |_, _| Instruction::Arithmetic(ArithmeticOp::Dec16(WideReg::$r))
    };
    /* --- Loads --- */
    (LD, Pointer, Pointer,) => {
        |_, _| Instruction::ControlOp(ControlOp::Halt)
    };
    (LD, $r1: ident, $r2: ident,) => {
        |_, _| {
            Instruction::Load(LoadOp::Basic {
                dest: InnerRegOrPointer::$r1.convert(),
                src: InnerRegOrPointer::$r2.convert(),
            })
        }
    };
    (LD, HL, SP) => {
        |mem, pc| Instruction::Load(LoadOp::SPIntoHL(imm8(mem, pc) as i8))
    };
    (LD, SP, HL) => {
        |_, _| Instruction::Load(LoadOp::HLIntoSP)
    };
    (LD, A, $r: ident) => {
        |_, _| Instruction::Load(LoadOp::LoadIntoA(LoadAPointer::$r))
    };
    (LD, $r: ident, A) => {
        |_, _| Instruction::Load(LoadOp::StoreFromA(LoadAPointer::$r))
    };
    (LD, $r: ident) => {
        |mem, pc| Instruction::Load(LoadOp::Direct(InnerRegOrPointer::$r.convert(), imm8(mem, pc)))
    };
    (LD16, $r: ident) => {
        |mem, pc| Instruction::Load(LoadOp::Direct16(WideReg::$r, imm16(mem, pc)))
    };
    (StoreSP) => {
        |mem, pc| Instruction::Load(LoadOp::StoreSP(imm16(mem, pc)))
    };
    (LoadA) => {
        |mem, pc| Instruction::Load(LoadOp::LoadA { ptr: imm16(mem, pc) })
    };
    (StoreA) => {
        |mem, pc| Instruction::Load(LoadOp::StoreA { ptr: imm16(mem, pc) })
    };
    (LoadHigh) => {
        |mem, pc| Instruction::Load(LoadOp::LoadHigh(imm8(mem, pc)))
    };
    (StoreHigh) => {
        |mem, pc| Instruction::Load(LoadOp::StoreHigh(imm8(mem, pc)))
    };
    (LDHCA) => {
        |_, _| Instruction::Load(LoadOp::Ldhca)
    };
    (LDHAC) => {
        |_, _| Instruction::Load(LoadOp::Ldhac)
    };
    (POP, $r: ident) => {
        |_, _| Instruction::Load(LoadOp::Pop(WideRegWithoutSP::$r))
    };
    (PUSH, $r: ident) => {
        |_, _| Instruction::Load(LoadOp::Push(WideRegWithoutSP::$r))
    };
    /* --- Shifts and the prefixed ops --- */
    (RLCA) => {
        |_, _| Instruction::BitShift(BitShiftOp::Rlca)
    };
    (RLA) => {
        |_, _| Instruction::BitShift(BitShiftOp::Rla)
    };
    (RRCA) => {
        |_, _| Instruction::BitShift(BitShiftOp::Rrca)
    };
    (RRA) => {
        |_, _| Instruction::BitShift(BitShiftOp::Rra)
    };
    (SHIFT, $op: ident, $r: ident) => {
        |_, _| Instruction::BitShift(BitShiftOp::$op(InnerRegOrPointer::$r.convert()))
    };
    (BIT, $op: ident, $b: literal, $r: ident) => {
        |_, _| {
            Instruction::Bit(BitOp {
                bit: $b,
                reg: InnerRegOrPointer::$r.convert(),
                op: BitOpInner::$op,
            })
        }
    };
}

/// Builds runs of eight ops that differ only in their register operand, in opcode order.
macro_rules! define_op_chunk {
    (LD) => {{
        const OPS: OpArray<0x40> = concat_arrays!(
            define_op_chunk!(LD, B),
            define_op_chunk!(LD, C),
            define_op_chunk!(LD, D),
            define_op_chunk!(LD, E),
            define_op_chunk!(LD, H),
            define_op_chunk!(LD, L),
            define_op_chunk!(LD, Pointer),
            define_op_chunk!(LD, A)
        );
        OPS
    }};
    (BIT, $op: ident) => {{
        const OPS: OpArray<0x40> = concat_arrays!(
            define_op_chunk!(BIT, $op, 0),
            define_op_chunk!(BIT, $op, 1),
            define_op_chunk!(BIT, $op, 2),
            define_op_chunk!(BIT, $op, 3),
            define_op_chunk!(BIT, $op, 4),
            define_op_chunk!(BIT, $op, 5),
            define_op_chunk!(BIT, $op, 6),
            define_op_chunk!(BIT, $op, 7)
        );
        OPS
    }};
    (BIT, $op: ident, $i: literal) => {{
        const OPS: OpArray<0x08> = [
            define_op!(BIT, $op, $i, B),
            define_op!(BIT, $op, $i, C),
            define_op!(BIT, $op, $i, D),
            define_op!(BIT, $op, $i, E),
            define_op!(BIT, $op, $i, H),
            define_op!(BIT, $op, $i, L),
            define_op!(BIT, $op, $i, Pointer),
            define_op!(BIT, $op, $i, A),
        ];
        OPS
    }};
    (LD, $r: ident) => {{
        const OPS: OpArray<8> = [
            define_op!(LD, $r, B,),
            define_op!(LD, $r, C,),
            define_op!(LD, $r, D,),
            define_op!(LD, $r, E,),
            define_op!(LD, $r, H,),
            define_op!(LD, $r, L,),
            define_op!(LD, $r, Pointer,),
            define_op!(LD, $r, A,),
        ];
        OPS
    }};
    ($kind: ident, $op: ident) => {{
        const OPS: OpArray<8> = [
            define_op!($kind, $op, B),
            define_op!($kind, $op, C),
            define_op!($kind, $op, D),
            define_op!($kind, $op, E),
            define_op!($kind, $op, H),
            define_op!($kind, $op, L),
            define_op!($kind, $op, Pointer),
            define_op!($kind, $op, A),
        ];
        OPS
    }};
}

macro_rules! define_op_lookup_table {
    () => {
        concat_arrays!(
            define_op_lookup_table!(CHUNK_ONE),
            define_op_lookup_table!(CHUNK_TWO),
            define_op_lookup_table!(CHUNK_THREE),
            define_op_lookup_table!(CHUNK_FOUR)
        )
    };
    (PREFIXED) => {
        concat_arrays!(
            define_op_chunk!(SHIFT, Rlc),
            define_op_chunk!(SHIFT, Rrc),
            define_op_chunk!(SHIFT, Rl),
            define_op_chunk!(SHIFT, Rr),
            define_op_chunk!(SHIFT, Sla),
            define_op_chunk!(SHIFT, Sra),
            define_op_chunk!(SHIFT, Swap),
            define_op_chunk!(SHIFT, Srl),
            define_op_chunk!(BIT, Bit),
            define_op_chunk!(BIT, Res),
            define_op_chunk!(BIT, Set)
        )
    };
    // The top and bottom quarters of the table are irregular. They are written as columns (one
    // entry per high nibble), then transposed into rows and concatenated.
    (CHUNK_ONE) => {{
        const TO_TRANSPOSED: [OpArray<4>; 0x10] = [
            [
                define_op!(NOOP),
                define_op!(STOP),
                define_op!(JR, NotZero),
                define_op!(JR, NotCarry),
            ],
            [
                define_op!(LD16, BC),
                define_op!(LD16, DE),
                define_op!(LD16, HL),
                define_op!(LD16, SP),
            ],
            [
                define_op!(LD, BC, A),
                define_op!(LD, DE, A),
                define_op!(LD, Hli, A),
                define_op!(LD, Hld, A),
            ],
            [
                define_op!(INC16, BC),
                define_op!(INC16, DE),
                define_op!(INC16, HL),
                define_op!(INC16, SP),
            ],
            [
                define_op!(INC, B),
                define_op!(INC, D),
                define_op!(INC, H),
                define_op!(INC, Pointer),
            ],
            [
                define_op!(DEC, B),
                define_op!(DEC, D),
                define_op!(DEC, H),
                define_op!(DEC, Pointer),
            ],
            [
                define_op!(LD, B),
                define_op!(LD, D),
                define_op!(LD, H),
                define_op!(LD, Pointer),
            ],
            [
                define_op!(RLCA),
                define_op!(RLA),
                define_op!(DAA),
                define_op!(SCF),
            ],
            [
                define_op!(StoreSP),
                define_op!(JR),
                define_op!(JR, Zero),
                define_op!(JR, Carry),
            ],
            [
                define_op!(ADD16, BC),
                define_op!(ADD16, DE),
                define_op!(ADD16, HL),
                define_op!(ADD16, SP),
            ],
            [
                define_op!(LD, A, BC),
                define_op!(LD, A, DE),
                define_op!(LD, A, Hli),
                define_op!(LD, A, Hld),
            ],
            [
                define_op!(DEC16, BC),
                define_op!(DEC16, DE),
                define_op!(DEC16, HL),
                define_op!(DEC16, SP),
            ],
            [
                define_op!(INC, C),
                define_op!(INC, E),
                define_op!(INC, L),
                define_op!(INC, A),
            ],
            [
                define_op!(DEC, C),
                define_op!(DEC, E),
                define_op!(DEC, L),
                define_op!(DEC, A),
            ],
            [
                define_op!(LD, C),
                define_op!(LD, E),
                define_op!(LD, L),
                define_op!(LD, A),
            ],
            [
                define_op!(RRCA),
                define_op!(RRA),
                define_op!(CPL),
                define_op!(CCF),
            ],
        ];
        const TRANSPOSED: [OpArray<16>; 4] = transpose!(TO_TRANSPOSED);
        const CHUNK: OpArray<0x40> =
            concat_arrays!(TRANSPOSED[0], TRANSPOSED[1], TRANSPOSED[2], TRANSPOSED[3]);
        CHUNK
    }};
    (CHUNK_TWO) => {
        define_op_chunk!(LD)
    };
    (CHUNK_THREE) => {{
        const CHUNK: OpArray<0x40> = concat_arrays!(
            define_op_chunk!(ALU, Add),
            define_op_chunk!(ALU, Adc),
            define_op_chunk!(ALU, Sub),
            define_op_chunk!(ALU, Sbc),
            define_op_chunk!(ALU, And),
            define_op_chunk!(ALU, Xor),
            define_op_chunk!(ALU, Or),
            define_op_chunk!(ALU, Cp)
        );
        CHUNK
    }};
    (CHUNK_FOUR) => {{
        const TO_TRANSPOSED: [OpArray<4>; 0x10] = [
            [
                define_op!(RET, NotZero),
                define_op!(RET, NotCarry),
                define_op!(StoreHigh),
                define_op!(LoadHigh),
            ],
            [
                define_op!(POP, BC),
                define_op!(POP, DE),
                define_op!(POP, HL),
                define_op!(POP, AF),
            ],
            [
                define_op!(JP, NotZero),
                define_op!(JP, NotCarry),
                define_op!(LDHCA),
                define_op!(LDHAC),
            ],
            [
                define_op!(JP),
                define_op!(ILLEGAL),
                define_op!(ILLEGAL),
                define_op!(DI),
            ],
            [
                define_op!(CALL, NotZero),
                define_op!(CALL, NotCarry),
                define_op!(ILLEGAL),
                define_op!(ILLEGAL),
            ],
            [
                define_op!(PUSH, BC),
                define_op!(PUSH, DE),
                define_op!(PUSH, HL),
                define_op!(PUSH, AF),
            ],
            [
                define_op!(ALU, Add),
                define_op!(ALU, Sub),
                define_op!(ALU, And),
                define_op!(ALU, Or),
            ],
            [
                define_op!(RST, RST00),
                define_op!(RST, RST10),
                define_op!(RST, RST20),
                define_op!(RST, RST30),
            ],
            [
                define_op!(RET, Zero),
                define_op!(RET, Carry),
                define_op!(ADD, SP),
                define_op!(LD, HL, SP),
            ],
            [
                define_op!(RET),
                define_op!(RETI),
                define_op!(JP, HL),
                define_op!(LD, SP, HL),
            ],
            [
                define_op!(JP, Zero),
                define_op!(JP, Carry),
                define_op!(StoreA),
                define_op!(LoadA),
            ],
            [
                define_op!(PREFIX),
                define_op!(ILLEGAL),
                define_op!(ILLEGAL),
                define_op!(EI),
            ],
            [
                define_op!(CALL, Zero),
                define_op!(CALL, Carry),
                define_op!(ILLEGAL),
                define_op!(ILLEGAL),
            ],
            [
                define_op!(CALL),
                define_op!(ILLEGAL),
                define_op!(ILLEGAL),
                define_op!(ILLEGAL),
            ],
            [
                define_op!(ALU, Adc),
                define_op!(ALU, Sbc),
                define_op!(ALU, Xor),
                define_op!(ALU, Cp),
            ],
            [
                define_op!(RST, RST08),
                define_op!(RST, RST18),
                define_op!(RST, RST28),
                define_op!(RST, RST38),
            ],
        ];
        const TRANSPOSED: [OpArray<16>; 4] = transpose!(TO_TRANSPOSED);
        const CHUNK: OpArray<0x40> =
            concat_arrays!(TRANSPOSED[0], TRANSPOSED[1], TRANSPOSED[2], TRANSPOSED[3]);
        CHUNK
    }};
}

macro_rules! transpose {
    ($arr: ident) => {{
        const TRANSPOSED: [OpArray<16>; 4] = [
            transpose!($arr, 0),
            transpose!($arr, 1),
            transpose!($arr, 2),
            transpose!($arr, 3),
        ];
        TRANSPOSED
    }};
    ($arr: ident, $i: literal) => {{
        const INNER: OpArray<16> = [
            $arr[0][$i],
            $arr[1][$i],
            $arr[2][$i],
            $arr[3][$i],
            $arr[4][$i],
            $arr[5][$i],
            $arr[6][$i],
            $arr[7][$i],
            $arr[8][$i],
            $arr[9][$i],
            $arr[10][$i],
            $arr[11][$i],
            $arr[12][$i],
            $arr[13][$i],
            $arr[14][$i],
            $arr[15][$i],
        ];
        INNER
    }};
}

// TODO: Remove the allows once array_concat stops emitting unexpected cfgs
#[allow(unexpected_cfgs)]
static OP_LOOKUP: OpArray<0x100> = define_op_lookup_table!();
#[allow(unexpected_cfgs)]
static PREFIXED_OP_LOOKUP: OpArray<0x100> = define_op_lookup_table!(PREFIXED);
