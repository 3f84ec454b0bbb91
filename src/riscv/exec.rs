//! Instruction executors. Each arm reads its inputs, computes the result
//! with exact RV32IMF semantics, writes its outputs and advances the PC by
//! 4 unless it is a taken branch, a jump or a trap.

use crate::errors::SimulationFault;
use crate::riscv::instruction::Instruction;
use crate::riscv::state::State;
use crate::utils::{sign_extend_byte, sign_extend_half, EXPONENT_MASK, FRACTION_MASK, SIGN_MASK};

/// Environment the `ecall` executor dispatches into. The driver provides
/// the implementation (console, file table, halt).
pub trait SyscallHandler {
    fn ecall(&mut self, state: &mut State) -> Result<(), SimulationFault>;
}

pub fn execute(
    inst: &Instruction,
    state: &mut State,
    env: &mut dyn SyscallHandler,
) -> Result<(), SimulationFault> {
    use Instruction::*;
    let pc = state.xregs.pc();

    macro_rules! x {
        ($r:expr) => {
            state.xregs.read($r)
        };
    }
    macro_rules! f {
        ($r:expr) => {
            state.fregs.read($r)
        };
    }

    match *inst {
        // ---------- R-type ----------
        Add { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1).wrapping_add(x!(rs2))),
        Sub { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1).wrapping_sub(x!(rs2))),
        Sll { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1) << (x!(rs2) & 0x1f)),
        Slt { rd, rs1, rs2 } => {
            state.xregs.write(rd, ((x!(rs1) as i32) < (x!(rs2) as i32)) as u32)
        }
        Sltu { rd, rs1, rs2 } => state.xregs.write(rd, (x!(rs1) < x!(rs2)) as u32),
        Xor { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1) ^ x!(rs2)),
        Srl { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1) >> (x!(rs2) & 0x1f)),
        Sra { rd, rs1, rs2 } => {
            state.xregs.write(rd, ((x!(rs1) as i32) >> (x!(rs2) & 0x1f)) as u32)
        }
        Or { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1) | x!(rs2)),
        And { rd, rs1, rs2 } => state.xregs.write(rd, x!(rs1) & x!(rs2)),

        // ---------- M extension ----------
        Mul { rd, rs1, rs2 } => {
            let res = (x!(rs1) as i32 as i64).wrapping_mul(x!(rs2) as i32 as i64);
            state.xregs.write(rd, res as u32);
        }
        Mulh { rd, rs1, rs2 } => {
            let res = (x!(rs1) as i32 as i64).wrapping_mul(x!(rs2) as i32 as i64);
            state.xregs.write(rd, (res >> 32) as u32);
        }
        Mulhsu { rd, rs1, rs2 } => {
            let res = (x!(rs1) as i32 as i64).wrapping_mul(x!(rs2) as u64 as i64);
            state.xregs.write(rd, (res >> 32) as u32);
        }
        Mulhu { rd, rs1, rs2 } => {
            let res = (x!(rs1) as u64).wrapping_mul(x!(rs2) as u64);
            state.xregs.write(rd, (res >> 32) as u32);
        }
        Div { rd, rs1, rs2 } => {
            let num = x!(rs1) as i32;
            let den = x!(rs2) as i32;
            let val = if den == 0 {
                -1
            } else if num == i32::MIN && den == -1 {
                i32::MIN
            } else {
                num.wrapping_div(den)
            };
            state.xregs.write(rd, val as u32);
        }
        Divu { rd, rs1, rs2 } => {
            let den = x!(rs2);
            let val = if den == 0 { u32::MAX } else { x!(rs1).wrapping_div(den) };
            state.xregs.write(rd, val);
        }
        Rem { rd, rs1, rs2 } => {
            let num = x!(rs1) as i32;
            let den = x!(rs2) as i32;
            let val = if den == 0 {
                num
            } else if num == i32::MIN && den == -1 {
                0
            } else {
                num.wrapping_rem(den)
            };
            state.xregs.write(rd, val as u32);
        }
        Remu { rd, rs1, rs2 } => {
            let den = x!(rs2);
            let val = if den == 0 { x!(rs1) } else { x!(rs1).wrapping_rem(den) };
            state.xregs.write(rd, val);
        }

        // ---------- I-type ----------
        Addi { rd, rs1, imm } => state.xregs.write(rd, x!(rs1).wrapping_add(imm as u32)),
        Slti { rd, rs1, imm } => state.xregs.write(rd, ((x!(rs1) as i32) < imm) as u32),
        Sltiu { rd, rs1, imm } => state.xregs.write(rd, (x!(rs1) < imm as u32) as u32),
        Xori { rd, rs1, imm } => state.xregs.write(rd, x!(rs1) ^ imm as u32),
        Ori { rd, rs1, imm } => state.xregs.write(rd, x!(rs1) | imm as u32),
        Andi { rd, rs1, imm } => state.xregs.write(rd, x!(rs1) & imm as u32),
        Slli { rd, rs1, shamt } => state.xregs.write(rd, x!(rs1) << (shamt & 0x1f)),
        Srli { rd, rs1, shamt } => state.xregs.write(rd, x!(rs1) >> (shamt & 0x1f)),
        Srai { rd, rs1, shamt } => {
            state.xregs.write(rd, ((x!(rs1) as i32) >> (shamt & 0x1f)) as u32)
        }

        // ---------- loads ----------
        Lb { rd, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.memory.load_byte_unsigned(a)?;
            state.xregs.write(rd, sign_extend_byte(v) as u32);
        }
        Lh { rd, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.memory.load_half_unsigned(a)?;
            state.xregs.write(rd, sign_extend_half(v) as u32);
        }
        Lw { rd, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.memory.load_word(a)?;
            state.xregs.write(rd, v);
        }
        Lbu { rd, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.memory.load_byte_unsigned(a)?;
            state.xregs.write(rd, v);
        }
        Lhu { rd, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.memory.load_half_unsigned(a)?;
            state.xregs.write(rd, v);
        }
        Flw { rd, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.memory.load_word(a)?;
            state.fregs.write_bits(rd, v);
        }

        // ---------- stores ----------
        Sb { rs2, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            state.memory.store_byte(a, x!(rs2))?;
        }
        Sh { rs2, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            state.memory.store_half(a, x!(rs2))?;
        }
        Sw { rs2, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            state.memory.store_word(a, x!(rs2))?;
        }
        Fsw { rs2, rs1, imm } => {
            let a = x!(rs1).wrapping_add(imm as u32);
            let v = state.fregs.read_bits(rs2);
            state.memory.store_word(a, v)?;
        }

        // ---------- branches (offset relative to the fetched PC) ----------
        Beq { rs1, rs2, imm } if x!(rs1) == x!(rs2) => {
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Bne { rs1, rs2, imm } if x!(rs1) != x!(rs2) => {
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Blt { rs1, rs2, imm } if (x!(rs1) as i32) < (x!(rs2) as i32) => {
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Bge { rs1, rs2, imm } if (x!(rs1) as i32) >= (x!(rs2) as i32) => {
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Bltu { rs1, rs2, imm } if x!(rs1) < x!(rs2) => {
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Bgeu { rs1, rs2, imm } if x!(rs1) >= x!(rs2) => {
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Beq { .. } | Bne { .. } | Blt { .. } | Bge { .. } | Bltu { .. } | Bgeu { .. } => {}

        // ---------- jumps ----------
        Jal { rd, imm } => {
            state.xregs.write(rd, pc.wrapping_add(4));
            state.xregs.set_pc(pc.wrapping_add(imm as u32));
            return Ok(());
        }
        Jalr { rd, rs1, imm } => {
            let target = x!(rs1).wrapping_add(imm as u32) & !1;
            state.xregs.write(rd, pc.wrapping_add(4));
            state.xregs.set_pc(target);
            return Ok(());
        }

        // ---------- U-type ----------
        Lui { rd, imm } => state.xregs.write(rd, (imm as u32) << 12),
        Auipc { rd, imm } => state.xregs.write(rd, pc.wrapping_add((imm as u32) << 12)),

        // ---------- system ----------
        Fence => {}
        Ecall => env.ecall(state)?,
        Ebreak => return Err(SimulationFault::Breakpoint),

        // ---------- F fused multiply-add ----------
        FmaddS { rd, rs1, rs2, rs3 } => state.fregs.write(rd, f!(rs1).mul_add(f!(rs2), f!(rs3))),
        FmsubS { rd, rs1, rs2, rs3 } => state.fregs.write(rd, f!(rs1).mul_add(f!(rs2), -f!(rs3))),
        FnmsubS { rd, rs1, rs2, rs3 } => {
            state.fregs.write(rd, (-f!(rs1)).mul_add(f!(rs2), f!(rs3)))
        }
        FnmaddS { rd, rs1, rs2, rs3 } => {
            state.fregs.write(rd, (-f!(rs1)).mul_add(f!(rs2), -f!(rs3)))
        }

        // ---------- F computational ----------
        FaddS { rd, rs1, rs2 } => state.fregs.write(rd, f!(rs1) + f!(rs2)),
        FsubS { rd, rs1, rs2 } => state.fregs.write(rd, f!(rs1) - f!(rs2)),
        FmulS { rd, rs1, rs2 } => state.fregs.write(rd, f!(rs1) * f!(rs2)),
        FdivS { rd, rs1, rs2 } => state.fregs.write(rd, f!(rs1) / f!(rs2)),
        FsqrtS { rd, rs1 } => state.fregs.write(rd, f!(rs1).sqrt()),
        FsgnjS { rd, rs1, rs2 } => {
            let sign = state.fregs.read_bits(rs2) & SIGN_MASK;
            let mag = state.fregs.read_bits(rs1) & (EXPONENT_MASK | FRACTION_MASK);
            state.fregs.write_bits(rd, sign | mag);
        }
        FsgnjnS { rd, rs1, rs2 } => {
            let sign = !state.fregs.read_bits(rs2) & SIGN_MASK;
            let mag = state.fregs.read_bits(rs1) & (EXPONENT_MASK | FRACTION_MASK);
            state.fregs.write_bits(rd, sign | mag);
        }
        FsgnjxS { rd, rs1, rs2 } => {
            let sign = (state.fregs.read_bits(rs1) ^ state.fregs.read_bits(rs2)) & SIGN_MASK;
            let mag = state.fregs.read_bits(rs1) & (EXPONENT_MASK | FRACTION_MASK);
            state.fregs.write_bits(rd, sign | mag);
        }
        FminS { rd, rs1, rs2 } => state.fregs.write(rd, float_min(f!(rs1), f!(rs2))),
        FmaxS { rd, rs1, rs2 } => state.fregs.write(rd, float_max(f!(rs1), f!(rs2))),

        // ---------- F conversion/compare/move ----------
        FcvtWS { rd, rs1 } => {
            let value = f!(rs1);
            let result = if value.is_nan() {
                i32::MAX
            } else {
                // saturating cast after round half to even
                value.round_ties_even() as i32
            };
            state.xregs.write(rd, result as u32);
        }
        FcvtWuS { rd, rs1 } => {
            let value = f!(rs1);
            let result = if value.is_nan() {
                u32::MAX
            } else if value <= -1.0 {
                0
            } else {
                value.round_ties_even() as u32
            };
            state.xregs.write(rd, result);
        }
        FmvXW { rd, rs1 } => state.xregs.write(rd, state.fregs.read_bits(rs1)),
        FeqS { rd, rs1, rs2 } => state.xregs.write(rd, (f!(rs1) == f!(rs2)) as u32),
        FltS { rd, rs1, rs2 } => state.xregs.write(rd, (f!(rs1) < f!(rs2)) as u32),
        FleS { rd, rs1, rs2 } => state.xregs.write(rd, (f!(rs1) <= f!(rs2)) as u32),
        FclassS { rd, rs1 } => state.xregs.write(rd, classify(f!(rs1))),
        FcvtSW { rd, rs1 } => state.fregs.write(rd, x!(rs1) as i32 as f32),
        FcvtSWu { rd, rs1 } => state.fregs.write(rd, x!(rs1) as f32),
        FmvWX { rd, rs1 } => state.fregs.write_bits(rd, x!(rs1)),
    }

    state.xregs.inc_pc();
    Ok(())
}

// IEEE 754-2008 minNum/maxNum: a single NaN operand falls through to the
// other; the sign of zero orders -0 < +0.
fn float_min(a: f32, b: f32) -> f32 {
    if a.is_nan() && b.is_nan() {
        f32::NAN
    } else if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else if a == b {
        if a.is_sign_negative() { a } else { b }
    } else if a < b {
        a
    } else {
        b
    }
}

fn float_max(a: f32, b: f32) -> f32 {
    if a.is_nan() && b.is_nan() {
        f32::NAN
    } else if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else if a == b {
        if a.is_sign_positive() { a } else { b }
    } else if a > b {
        a
    } else {
        b
    }
}

fn classify(value: f32) -> u32 {
    let bits = value.to_bits();
    let negative = bits & SIGN_MASK != 0;
    let exponent = bits & EXPONENT_MASK;
    let fraction = bits & FRACTION_MASK;
    if exponent == EXPONENT_MASK {
        if fraction == 0 {
            return if negative { 1 << 0 } else { 1 << 7 };
        }
        // quiet bit is the top fraction bit
        return if fraction & 0x0040_0000 != 0 { 1 << 9 } else { 1 << 8 };
    }
    if exponent == 0 {
        if fraction == 0 {
            return if negative { 1 << 3 } else { 1 << 4 };
        }
        return if negative { 1 << 2 } else { 1 << 5 };
    }
    if negative {
        1 << 1
    } else {
        1 << 6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    struct NoEnv;
    impl SyscallHandler for NoEnv {
        fn ecall(&mut self, _state: &mut State) -> Result<(), SimulationFault> {
            Err(SimulationFault::Halt(0))
        }
    }

    fn state() -> State {
        State::new(&Settings::default())
    }

    fn run(state: &mut State, inst: Instruction) -> Result<(), SimulationFault> {
        execute(&inst, state, &mut NoEnv)
    }

    #[test]
    fn add_wraps() {
        let mut st = state();
        st.xregs.write(1, u32::MAX);
        st.xregs.write(2, 1);
        run(&mut st, Instruction::Add { rd: 3, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.xregs.read(3), 0);
    }

    #[test]
    fn division_edge_cases() {
        let mut st = state();
        st.xregs.write(1, 0x8000_0000);
        st.xregs.write(2, u32::MAX); // -1
        run(&mut st, Instruction::Div { rd: 3, rs1: 1, rs2: 2 }).unwrap();
        run(&mut st, Instruction::Rem { rd: 4, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.xregs.read(3), 0x8000_0000);
        assert_eq!(st.xregs.read(4), 0);

        st.xregs.write(5, 17);
        run(&mut st, Instruction::Div { rd: 6, rs1: 5, rs2: 0 }).unwrap();
        run(&mut st, Instruction::Divu { rd: 7, rs1: 5, rs2: 0 }).unwrap();
        run(&mut st, Instruction::Rem { rd: 8, rs1: 5, rs2: 0 }).unwrap();
        assert_eq!(st.xregs.read(6) as i32, -1);
        assert_eq!(st.xregs.read(7), u32::MAX);
        assert_eq!(st.xregs.read(8), 17);
    }

    #[test]
    fn mulh_signedness_combinations() {
        let mut st = state();
        st.xregs.write(1, 0xffff_ffff); // -1 signed, 2^32-1 unsigned
        st.xregs.write(2, 2);
        run(&mut st, Instruction::Mulh { rd: 3, rs1: 1, rs2: 2 }).unwrap();
        run(&mut st, Instruction::Mulhu { rd: 4, rs1: 1, rs2: 2 }).unwrap();
        run(&mut st, Instruction::Mulhsu { rd: 5, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.xregs.read(3), 0xffff_ffff); // -2 >> 32
        assert_eq!(st.xregs.read(4), 1);
        assert_eq!(st.xregs.read(5), 0xffff_ffff);
    }

    #[test]
    fn logical_vs_arithmetic_shift() {
        let mut st = state();
        st.xregs.write(1, 0xffff_ffff);
        run(&mut st, Instruction::Srli { rd: 2, rs1: 1, shamt: 28 }).unwrap();
        run(&mut st, Instruction::Srai { rd: 3, rs1: 1, shamt: 28 }).unwrap();
        assert_eq!(st.xregs.read(2), 0x0000_000f);
        assert_eq!(st.xregs.read(3), 0xffff_ffff);
    }

    #[test]
    fn shift_amount_uses_low_five_bits() {
        let mut st = state();
        st.xregs.write(1, 1);
        st.xregs.write(2, 33); // shifts by 1
        run(&mut st, Instruction::Sll { rd: 3, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.xregs.read(3), 2);
    }

    #[test]
    fn jalr_clears_low_bit() {
        let mut st = state();
        st.xregs.write(1, 0x0001_0005);
        run(&mut st, Instruction::Jalr { rd: 2, rs1: 1, imm: 0 }).unwrap();
        assert_eq!(st.xregs.pc(), 0x0001_0004);
    }

    #[test]
    fn branch_overrides_pc_advance() {
        let mut st = state();
        let pc = st.xregs.pc();
        st.xregs.write(1, 1);
        run(&mut st, Instruction::Bne { rs1: 1, rs2: 0, imm: 16 }).unwrap();
        assert_eq!(st.xregs.pc(), pc + 16);
        run(&mut st, Instruction::Beq { rs1: 1, rs2: 0, imm: 16 }).unwrap();
        assert_eq!(st.xregs.pc(), pc + 20);
    }

    #[test]
    fn lui_auipc_shift() {
        let mut st = state();
        let pc = st.xregs.pc();
        run(&mut st, Instruction::Lui { rd: 1, imm: 0x12345 }).unwrap();
        run(&mut st, Instruction::Auipc { rd: 2, imm: 1 }).unwrap();
        assert_eq!(st.xregs.read(1), 0x1234_5000);
        assert_eq!(st.xregs.read(2), pc + 4 + 0x1000);
    }

    #[test]
    fn ebreak_leaves_pc() {
        let mut st = state();
        let pc = st.xregs.pc();
        assert_eq!(run(&mut st, Instruction::Ebreak), Err(SimulationFault::Breakpoint));
        assert_eq!(st.xregs.pc(), pc);
    }

    #[test]
    fn fcvt_w_s_rounding_and_saturation() {
        let mut st = state();
        st.fregs.write(1, 2.5);
        run(&mut st, Instruction::FcvtWS { rd: 1, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(1) as i32, 2); // ties to even

        st.fregs.write(1, 3.5);
        run(&mut st, Instruction::FcvtWS { rd: 2, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(2) as i32, 4);

        st.fregs.write(1, f32::NAN);
        run(&mut st, Instruction::FcvtWS { rd: 3, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(3) as i32, i32::MAX);

        st.fregs.write(1, 1e20);
        run(&mut st, Instruction::FcvtWS { rd: 4, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(4) as i32, i32::MAX);

        st.fregs.write(1, -1e20);
        run(&mut st, Instruction::FcvtWS { rd: 5, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(5) as i32, i32::MIN);
    }

    #[test]
    fn fcvt_wu_s_negative_and_nan() {
        let mut st = state();
        st.fregs.write(1, -3.0);
        run(&mut st, Instruction::FcvtWuS { rd: 1, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(1), 0);

        st.fregs.write(1, f32::NAN);
        run(&mut st, Instruction::FcvtWuS { rd: 2, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(2), u32::MAX);
    }

    #[test]
    fn sign_injection_keeps_magnitude() {
        let mut st = state();
        st.fregs.write(1, 1.5);
        st.fregs.write(2, -2.0);
        run(&mut st, Instruction::FsgnjS { rd: 3, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.fregs.read(3), -1.5);
        run(&mut st, Instruction::FsgnjnS { rd: 4, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.fregs.read(4), 1.5);
        run(&mut st, Instruction::FsgnjxS { rd: 5, rs1: 3, rs2: 2 }).unwrap();
        assert_eq!(st.fregs.read(5), 1.5);
    }

    #[test]
    fn fmin_orders_signed_zero() {
        let mut st = state();
        st.fregs.write(1, 0.0);
        st.fregs.write(2, -0.0);
        run(&mut st, Instruction::FminS { rd: 3, rs1: 1, rs2: 2 }).unwrap();
        assert_eq!(st.fregs.read_bits(3), 0x8000_0000);
        // one NaN operand falls through to the other
        st.fregs.write(4, f32::NAN);
        run(&mut st, Instruction::FmaxS { rd: 5, rs1: 4, rs2: 1 }).unwrap();
        assert_eq!(st.fregs.read(5), 0.0);
    }

    #[test]
    fn fclass_buckets() {
        let mut st = state();
        st.fregs.write(1, f32::NEG_INFINITY);
        run(&mut st, Instruction::FclassS { rd: 1, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(1), 1 << 0);
        st.fregs.write(1, -0.0);
        run(&mut st, Instruction::FclassS { rd: 2, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(2), 1 << 3);
        st.fregs.write(1, 1.0);
        run(&mut st, Instruction::FclassS { rd: 3, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(3), 1 << 6);
        st.fregs.write(1, f32::NAN);
        run(&mut st, Instruction::FclassS { rd: 4, rs1: 1 }).unwrap();
        assert_eq!(st.xregs.read(4), 1 << 9);
    }

    #[test]
    fn fused_multiply_add_family() {
        let mut st = state();
        st.fregs.write(1, 2.0);
        st.fregs.write(2, 3.0);
        st.fregs.write(3, 1.0);
        run(&mut st, Instruction::FmaddS { rd: 4, rs1: 1, rs2: 2, rs3: 3 }).unwrap();
        assert_eq!(st.fregs.read(4), 7.0);
        run(&mut st, Instruction::FmsubS { rd: 5, rs1: 1, rs2: 2, rs3: 3 }).unwrap();
        assert_eq!(st.fregs.read(5), 5.0);
        run(&mut st, Instruction::FnmsubS { rd: 6, rs1: 1, rs2: 2, rs3: 3 }).unwrap();
        assert_eq!(st.fregs.read(6), -5.0);
        run(&mut st, Instruction::FnmaddS { rd: 7, rs1: 1, rs2: 2, rs3: 3 }).unwrap();
        assert_eq!(st.fregs.read(7), -7.0);
    }
}
