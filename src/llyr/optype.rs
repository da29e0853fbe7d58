use std::fmt;

use phf::phf_map;

use crate::sim::config::LlyrConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemOp {
    Ld,
    StreamLd,
    St,
    StreamSt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Integer operators that carry state from one firing to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvIntOp {
    Inc,
    IncRst,
    Acc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Not,
    Sll,
    Slr,
    Rol,
    Ror,
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpOp {
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    FaddS,
    FsubS,
    FmulS,
    FdivS,
    Fptosi,
    Sitofp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexOp {
    Sin,
    Cos,
    Tan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlOp {
    Sel,
    Merge,
    Repeater,
    Roz,
    Roo,
    Filter,
    FilterConst,
    Route,
}

/// Operation bound to a processing element. Operation identity only ever travels as this tag;
/// strings are confined to `from_mnemonic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    Dummy,
    Mem(MemOp),
    Int(IntOp),
    IntConst(IntOp),
    AdvInt(AdvIntOp),
    Logic(LogicOp),
    LogicConst(LogicOp),
    Fp(FpOp),
    Complex(ComplexOp),
    Control(ControlOp),
}

/// How many compute operands an operation consumes per firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

static MNEMONICS: phf::Map<&'static str, OpType> = phf_map! {
    "DUMMY"      => OpType::Dummy,
    "LD"         => OpType::Mem(MemOp::Ld),
    "LD_ST"      => OpType::Mem(MemOp::StreamLd),
    "ST"         => OpType::Mem(MemOp::St),
    "ST_ST"      => OpType::Mem(MemOp::StreamSt),
    "ADD"        => OpType::Int(IntOp::Add),
    "SUB"        => OpType::Int(IntOp::Sub),
    "MUL"        => OpType::Int(IntOp::Mul),
    "DIV"        => OpType::Int(IntOp::Div),
    "REM"        => OpType::Int(IntOp::Rem),
    "ADDCONST"   => OpType::IntConst(IntOp::Add),
    "SUBCONST"   => OpType::IntConst(IntOp::Sub),
    "MULCONST"   => OpType::IntConst(IntOp::Mul),
    "DIVCONST"   => OpType::IntConst(IntOp::Div),
    "REMCONST"   => OpType::IntConst(IntOp::Rem),
    "INC"        => OpType::AdvInt(AdvIntOp::Inc),
    "INC_RST"    => OpType::AdvInt(AdvIntOp::IncRst),
    "ACC"        => OpType::AdvInt(AdvIntOp::Acc),
    "AND"        => OpType::Logic(LogicOp::And),
    "OR"         => OpType::Logic(LogicOp::Or),
    "XOR"        => OpType::Logic(LogicOp::Xor),
    "NOT"        => OpType::Logic(LogicOp::Not),
    "SLL"        => OpType::Logic(LogicOp::Sll),
    "SLR"        => OpType::Logic(LogicOp::Slr),
    "ROL"        => OpType::Logic(LogicOp::Rol),
    "ROR"        => OpType::Logic(LogicOp::Ror),
    "EQ"         => OpType::Logic(LogicOp::Eq),
    "NE"         => OpType::Logic(LogicOp::Ne),
    "UGT"        => OpType::Logic(LogicOp::Ugt),
    "UGE"        => OpType::Logic(LogicOp::Uge),
    "ULT"        => OpType::Logic(LogicOp::Ult),
    "ULE"        => OpType::Logic(LogicOp::Ule),
    "SGT"        => OpType::Logic(LogicOp::Sgt),
    "SGE"        => OpType::Logic(LogicOp::Sge),
    "SLT"        => OpType::Logic(LogicOp::Slt),
    "SLE"        => OpType::Logic(LogicOp::Sle),
    "ANDCONST"   => OpType::LogicConst(LogicOp::And),
    "ORCONST"    => OpType::LogicConst(LogicOp::Or),
    "XORCONST"   => OpType::LogicConst(LogicOp::Xor),
    "SLLCONST"   => OpType::LogicConst(LogicOp::Sll),
    "SLRCONST"   => OpType::LogicConst(LogicOp::Slr),
    "ROLCONST"   => OpType::LogicConst(LogicOp::Rol),
    "RORCONST"   => OpType::LogicConst(LogicOp::Ror),
    "EQCONST"    => OpType::LogicConst(LogicOp::Eq),
    "NECONST"    => OpType::LogicConst(LogicOp::Ne),
    "UGTCONST"   => OpType::LogicConst(LogicOp::Ugt),
    "UGECONST"   => OpType::LogicConst(LogicOp::Uge),
    "ULTCONST"   => OpType::LogicConst(LogicOp::Ult),
    "ULECONST"   => OpType::LogicConst(LogicOp::Ule),
    "SGTCONST"   => OpType::LogicConst(LogicOp::Sgt),
    "SGECONST"   => OpType::LogicConst(LogicOp::Sge),
    "SLTCONST"   => OpType::LogicConst(LogicOp::Slt),
    "SLECONST"   => OpType::LogicConst(LogicOp::Sle),
    "FADD"       => OpType::Fp(FpOp::Fadd),
    "FSUB"       => OpType::Fp(FpOp::Fsub),
    "FMUL"       => OpType::Fp(FpOp::Fmul),
    "FDIV"       => OpType::Fp(FpOp::Fdiv),
    "FADD_S"     => OpType::Fp(FpOp::FaddS),
    "FSUB_S"     => OpType::Fp(FpOp::FsubS),
    "FMUL_S"     => OpType::Fp(FpOp::FmulS),
    "FDIV_S"     => OpType::Fp(FpOp::FdivS),
    "FPTOSI"     => OpType::Fp(FpOp::Fptosi),
    "SITOFP"     => OpType::Fp(FpOp::Sitofp),
    "TSIN"       => OpType::Complex(ComplexOp::Sin),
    "TCOS"       => OpType::Complex(ComplexOp::Cos),
    "TTAN"       => OpType::Complex(ComplexOp::Tan),
    "SEL"        => OpType::Control(ControlOp::Sel),
    "MERGE"      => OpType::Control(ControlOp::Merge),
    "REPEATER"   => OpType::Control(ControlOp::Repeater),
    "ROZ"        => OpType::Control(ControlOp::Roz),
    "ROO"        => OpType::Control(ControlOp::Roo),
    "FILTER"     => OpType::Control(ControlOp::Filter),
    "FILTERCONST" => OpType::Control(ControlOp::FilterConst),
    "ROUTE"      => OpType::Control(ControlOp::Route),
};

impl OpType {
    pub fn from_mnemonic(name: &str) -> Option<OpType> {
        MNEMONICS.get(name.trim().to_ascii_uppercase().as_str()).copied()
    }

    pub fn mnemonic(&self) -> &'static str {
        MNEMONICS
            .entries()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// Whether the mapper must supply a literal for this operation.
    pub fn needs_constant(&self) -> bool {
        matches!(
            self,
            OpType::IntConst(_)
                | OpType::LogicConst(_)
                | OpType::Control(ControlOp::FilterConst)
        )
    }

    pub fn arity(&self) -> Arity {
        match self {
            OpType::Dummy => Arity::Exact(0),
            OpType::Mem(MemOp::Ld) => Arity::Exact(1),
            OpType::Mem(MemOp::StreamLd) | OpType::Mem(MemOp::St) => Arity::Exact(2),
            OpType::Mem(MemOp::StreamSt) => Arity::Exact(3),
            OpType::Int(_) => Arity::Exact(2),
            OpType::IntConst(_) => Arity::Exact(1),
            OpType::AdvInt(AdvIntOp::IncRst) => Arity::Exact(2),
            OpType::AdvInt(_) => Arity::Exact(1),
            OpType::Logic(LogicOp::Not) | OpType::LogicConst(_) => Arity::Exact(1),
            OpType::Logic(_) => Arity::Exact(2),
            OpType::Fp(FpOp::Fptosi) | OpType::Fp(FpOp::Sitofp) => Arity::Exact(1),
            OpType::Fp(_) => Arity::Exact(2),
            OpType::Complex(_) => Arity::Exact(1),
            OpType::Control(ControlOp::Sel) => Arity::Exact(3),
            OpType::Control(ControlOp::Merge) => Arity::AtLeast(1),
            OpType::Control(ControlOp::Repeater)
            | OpType::Control(ControlOp::Roz)
            | OpType::Control(ControlOp::Roo) => Arity::Exact(2),
            OpType::Control(ControlOp::Filter) | OpType::Control(ControlOp::FilterConst) => {
                Arity::Exact(1)
            }
            OpType::Control(ControlOp::Route) => Arity::Exact(0),
        }
    }

    /// Cycles between operands becoming jointly available and the result being produced.
    pub fn latency(&self, config: &LlyrConfig) -> u32 {
        match self {
            OpType::Dummy | OpType::Mem(_) | OpType::Control(ControlOp::Route) => 0,
            OpType::Int(IntOp::Div | IntOp::Rem) | OpType::IntConst(IntOp::Div | IntOp::Rem) => {
                config.int_div_latency
            }
            OpType::Int(_) | OpType::IntConst(_) | OpType::AdvInt(_) => config.int_latency,
            OpType::Logic(_) | OpType::LogicConst(_) | OpType::Control(_) => config.arith_latency,
            OpType::Fp(FpOp::Fmul | FpOp::FmulS) => config.fp_mul_latency,
            OpType::Fp(FpOp::Fdiv | FpOp::FdivS) => config.fp_div_latency,
            OpType::Fp(_) => config.fp_latency,
            OpType::Complex(_) => config.complex_latency,
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_resolve_case_insensitively() {
        assert_eq!(Some(OpType::Int(IntOp::Add)), OpType::from_mnemonic("add"));
        assert_eq!(Some(OpType::IntConst(IntOp::Mul)), OpType::from_mnemonic(" MULCONST "));
        assert_eq!(None, OpType::from_mnemonic("FMA"));
    }

    #[test]
    fn mnemonic_is_inverse_of_lookup() {
        for (name, op) in MNEMONICS.entries() {
            assert_eq!(*name, op.mnemonic());
        }
    }

    #[test]
    fn division_uses_its_own_latency_class() {
        let config = LlyrConfig { int_latency: 1, int_div_latency: 9, ..LlyrConfig::default() };
        assert_eq!(1, OpType::Int(IntOp::Add).latency(&config));
        assert_eq!(9, OpType::Int(IntOp::Rem).latency(&config));
        assert_eq!(9, OpType::IntConst(IntOp::Div).latency(&config));
        assert_eq!(config.fp_div_latency, OpType::Fp(FpOp::FdivS).latency(&config));
        assert_eq!(0, OpType::Control(ControlOp::Route).latency(&config));
    }

    #[test]
    fn arity_matches_operand_layout() {
        assert_eq!(Arity::Exact(3), OpType::Control(ControlOp::Sel).arity());
        assert!(OpType::Control(ControlOp::Merge).arity().accepts(4));
        assert!(!OpType::Logic(LogicOp::Not).arity().accepts(2));
        assert!(OpType::LogicConst(LogicOp::Eq).needs_constant());
    }
}
