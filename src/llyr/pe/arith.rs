//! Combinational operators: integer, stateful integer, logic, floating point and trig.
//!
//! All of them see tokens as raw 64-bit patterns and reinterpret per operation. Integer
//! arithmetic wraps; signed comparisons cast the bits to `i64`.

use num_traits::ToPrimitive;

use crate::llyr::data::LlyrData;
use crate::llyr::optype::{AdvIntOp, ComplexOp, FpOp, IntOp, LogicOp};

/// Second operand: the mapper literal for const variants, otherwise the second queue.
fn rhs(args: &[LlyrData], constant: Option<LlyrData>) -> LlyrData {
    constant.unwrap_or_else(|| args.get(1).copied().unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct IntUnit {
    op: IntOp,
    constant: Option<LlyrData>,
}

impl IntUnit {
    pub fn new(op: IntOp, constant: Option<LlyrData>) -> Self {
        Self { op, constant }
    }

    pub fn op(&self) -> IntOp {
        self.op
    }

    pub fn constant(&self) -> Option<LlyrData> {
        self.constant
    }

    pub fn evaluate(&self, args: &[LlyrData]) -> Option<LlyrData> {
        let a = args.first()?.to_ullong();
        let b = rhs(args, self.constant).to_ullong();
        Some(LlyrData(int_op(self.op, a, b)))
    }
}

pub fn int_op(op: IntOp, a: u64, b: u64) -> u64 {
    match op {
        IntOp::Add => a.wrapping_add(b),
        IntOp::Sub => a.wrapping_sub(b),
        IntOp::Mul => a.wrapping_mul(b),
        // no trap on zero divisors: all-ones quotient, dividend as remainder
        IntOp::Div => a.checked_div(b).unwrap_or(u64::MAX),
        IntOp::Rem => a.checked_rem(b).unwrap_or(a),
    }
}

/// Integer operators with a persistent induction or accumulator slot.
#[derive(Debug, Clone)]
pub struct AdvIntUnit {
    op: AdvIntOp,
    /// Step for INC/INC_RST, batch length for ACC (0 = emit every firing).
    param: u64,
    state: u64,
    count: u64,
}

impl AdvIntUnit {
    pub fn new(op: AdvIntOp, constant: Option<LlyrData>) -> Self {
        let param = match op {
            AdvIntOp::Inc | AdvIntOp::IncRst => constant.map_or(1, LlyrData::to_ullong),
            AdvIntOp::Acc => constant.map_or(0, LlyrData::to_ullong),
        };
        Self {
            op,
            param,
            state: 0,
            count: 0,
        }
    }

    pub fn state(&self) -> LlyrData {
        LlyrData(self.state)
    }

    pub fn reset(&mut self) {
        self.state = 0;
        self.count = 0;
    }

    pub fn evaluate(&mut self, args: &[LlyrData]) -> Option<LlyrData> {
        match self.op {
            AdvIntOp::Inc => {
                let out = self.state;
                self.state = self.state.wrapping_add(self.param);
                Some(LlyrData(out))
            }
            AdvIntOp::IncRst => {
                if !args.get(1).copied().unwrap_or_default().is_zero() {
                    self.state = 0;
                }
                let out = self.state;
                self.state = self.state.wrapping_add(self.param);
                Some(LlyrData(out))
            }
            AdvIntOp::Acc => {
                self.state = self.state.wrapping_add(args.first()?.to_ullong());
                self.count += 1;
                if self.param == 0 {
                    return Some(LlyrData(self.state));
                }
                if self.count < self.param {
                    return None;
                }
                let out = self.state;
                self.reset();
                Some(LlyrData(out))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogicUnit {
    op: LogicOp,
    constant: Option<LlyrData>,
}

impl LogicUnit {
    pub fn new(op: LogicOp, constant: Option<LlyrData>) -> Self {
        Self { op, constant }
    }

    pub fn op(&self) -> LogicOp {
        self.op
    }

    pub fn evaluate(&self, args: &[LlyrData]) -> Option<LlyrData> {
        let a = args.first()?.to_ullong();
        let b = rhs(args, self.constant).to_ullong();
        Some(LlyrData(logic_op(self.op, a, b)))
    }
}

pub fn logic_op(op: LogicOp, a: u64, b: u64) -> u64 {
    let shamt = (b & 63) as u32;
    let (sa, sb) = (a as i64, b as i64);
    match op {
        LogicOp::And => a & b,
        LogicOp::Or => a | b,
        LogicOp::Xor => a ^ b,
        LogicOp::Not => !a,
        LogicOp::Sll => a << shamt,
        LogicOp::Slr => a >> shamt,
        LogicOp::Rol => a.rotate_left(shamt),
        LogicOp::Ror => a.rotate_right(shamt),
        LogicOp::Eq => (a == b) as u64,
        LogicOp::Ne => (a != b) as u64,
        LogicOp::Ugt => (a > b) as u64,
        LogicOp::Uge => (a >= b) as u64,
        LogicOp::Ult => (a < b) as u64,
        LogicOp::Ule => (a <= b) as u64,
        LogicOp::Sgt => (sa > sb) as u64,
        LogicOp::Sge => (sa >= sb) as u64,
        LogicOp::Slt => (sa < sb) as u64,
        LogicOp::Sle => (sa <= sb) as u64,
    }
}

#[derive(Debug, Clone)]
pub struct FpUnit {
    op: FpOp,
}

impl FpUnit {
    pub fn new(op: FpOp) -> Self {
        Self { op }
    }

    pub fn evaluate(&self, args: &[LlyrData]) -> Option<LlyrData> {
        let a = *args.first()?;
        let b = args.get(1).copied().unwrap_or_default();
        Some(fp_op(self.op, a, b))
    }
}

fn f64_op(a: LlyrData, b: LlyrData, op: fn(f64, f64) -> f64) -> LlyrData {
    LlyrData::from_f64(op(a.as_f64(), b.as_f64()))
}

fn f32_op(a: LlyrData, b: LlyrData, op: fn(f32, f32) -> f32) -> LlyrData {
    LlyrData::from_f32(op(a.as_f32(), b.as_f32()))
}

fn fptosi_saturate(a: LlyrData) -> LlyrData {
    let f = a.as_f64();
    let v = f.to_i64().unwrap_or(if f < 0f64 { i64::MIN } else { i64::MAX });
    LlyrData::from_i64(v)
}

pub fn fp_op(op: FpOp, a: LlyrData, b: LlyrData) -> LlyrData {
    match op {
        FpOp::Fadd => f64_op(a, b, |x, y| x + y),
        FpOp::Fsub => f64_op(a, b, |x, y| x - y),
        FpOp::Fmul => f64_op(a, b, |x, y| x * y),
        FpOp::Fdiv => f64_op(a, b, |x, y| x / y),
        FpOp::FaddS => f32_op(a, b, |x, y| x + y),
        FpOp::FsubS => f32_op(a, b, |x, y| x - y),
        FpOp::FmulS => f32_op(a, b, |x, y| x * y),
        FpOp::FdivS => f32_op(a, b, |x, y| x / y),
        FpOp::Fptosi => fptosi_saturate(a),
        FpOp::Sitofp => LlyrData::from_f64(a.as_i64() as f64),
    }
}

#[derive(Debug, Clone)]
pub struct ComplexUnit {
    op: ComplexOp,
}

impl ComplexUnit {
    pub fn new(op: ComplexOp) -> Self {
        Self { op }
    }

    pub fn evaluate(&self, args: &[LlyrData]) -> Option<LlyrData> {
        let x = args.first()?.as_f64();
        let y = match self.op {
            ComplexOp::Sin => x.sin(),
            ComplexOp::Cos => x.cos(),
            ComplexOp::Tan => x.tan(),
        };
        Some(LlyrData::from_f64(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: u64) -> LlyrData {
        LlyrData(v)
    }

    #[test]
    fn integer_ops_wrap() {
        assert_eq!(0, int_op(IntOp::Add, u64::MAX, 1));
        assert_eq!(u64::MAX, int_op(IntOp::Sub, 0, 1));
        assert_eq!(u64::MAX, int_op(IntOp::Div, 7, 0));
        assert_eq!(7, int_op(IntOp::Rem, 7, 0));
        assert_eq!(3, int_op(IntOp::Rem, 11, 4));
    }

    #[test]
    fn const_variant_uses_literal_as_rhs() {
        let unit = IntUnit::new(IntOp::Sub, Some(d(5)));
        assert_eq!(Some(d(15)), unit.evaluate(&[d(20)]));
        assert_eq!(Some(d(5)), unit.constant());
    }

    #[test]
    fn signed_compares_cast_bits() {
        let minus_one = u64::MAX;
        assert_eq!(1, logic_op(LogicOp::Ugt, minus_one, 1));
        assert_eq!(0, logic_op(LogicOp::Sgt, minus_one, 1));
        assert_eq!(1, logic_op(LogicOp::Slt, minus_one, 0));
        assert_eq!(1, logic_op(LogicOp::Sle, 3, 3));
    }

    #[test]
    fn shifts_and_rotates_use_low_six_bits() {
        assert_eq!(2, logic_op(LogicOp::Sll, 1, 65));
        assert_eq!(1u64 << 63, logic_op(LogicOp::Ror, 1, 1));
        assert_eq!(1, logic_op(LogicOp::Rol, 1u64 << 63, 1));
        assert_eq!(!0xF0u64, logic_op(LogicOp::Not, 0xF0, 0));
    }

    #[test]
    fn float_ops_reinterpret_bits() {
        let r = fp_op(FpOp::Fmul, LlyrData::from_f64(1.5), LlyrData::from_f64(-2.0));
        assert_eq!(-3.0, r.as_f64());
        let s = fp_op(FpOp::FaddS, LlyrData::from_f32(0.25), LlyrData::from_f32(0.5));
        assert_eq!(0.75, s.as_f32());
        assert_eq!(0, s.to_ullong() >> 32);
    }

    #[test]
    fn float_to_int_saturates() {
        assert_eq!(-3, fp_op(FpOp::Fptosi, LlyrData::from_f64(-3.7), d(0)).as_i64());
        assert_eq!(i64::MAX, fp_op(FpOp::Fptosi, LlyrData::from_f64(1e30), d(0)).as_i64());
        assert_eq!(-4.0, fp_op(FpOp::Sitofp, LlyrData::from_i64(-4), d(0)).as_f64());
    }

    #[test]
    fn trig_on_double_pattern() {
        let unit = ComplexUnit::new(ComplexOp::Cos);
        assert_eq!(Some(LlyrData::from_f64(1.0)), unit.evaluate(&[LlyrData::from_f64(0.0)]));
    }

    #[test]
    fn inc_emits_then_steps() {
        let mut unit = AdvIntUnit::new(AdvIntOp::Inc, Some(d(4)));
        let trig = [d(1)];
        assert_eq!(Some(d(0)), unit.evaluate(&trig));
        assert_eq!(Some(d(4)), unit.evaluate(&trig));
        assert_eq!(d(8), unit.state());
    }

    #[test]
    fn inc_rst_restarts_on_reset_token() {
        let mut unit = AdvIntUnit::new(AdvIntOp::IncRst, None);
        assert_eq!(Some(d(0)), unit.evaluate(&[d(1), d(0)]));
        assert_eq!(Some(d(1)), unit.evaluate(&[d(1), d(0)]));
        assert_eq!(Some(d(0)), unit.evaluate(&[d(1), d(1)]));
    }

    #[test]
    fn acc_emits_once_per_batch() {
        let mut unit = AdvIntUnit::new(AdvIntOp::Acc, Some(d(3)));
        assert_eq!(None, unit.evaluate(&[d(1)]));
        assert_eq!(None, unit.evaluate(&[d(2)]));
        assert_eq!(Some(d(6)), unit.evaluate(&[d(3)]));
        assert_eq!(d(0), unit.state());
    }
}
