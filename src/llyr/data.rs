use std::fmt;

/// One 64-bit token travelling between processing elements. The bits carry no type; the
/// consuming operation decides whether they are an integer, an IEEE-754 pattern or a flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LlyrData(pub u64);

impl LlyrData {
    pub const ZERO: LlyrData = LlyrData(0);
    pub const ONES: LlyrData = LlyrData(u64::MAX);

    pub const fn new(bits: u64) -> Self {
        LlyrData(bits)
    }

    pub fn to_ullong(self) -> u64 {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn from_i64(v: i64) -> Self {
        LlyrData(v as u64)
    }

    pub fn from_f64(v: f64) -> Self {
        LlyrData(v.to_bits())
    }

    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Single precision lives zero-extended in the low word.
    pub fn from_f32(v: f32) -> Self {
        LlyrData(v.to_bits() as u64)
    }

    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0 as u32)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn bit(self, i: u32) -> bool {
        (self.0 >> (i & 63)) & 1 == 1
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Short payloads are zero-extended, long ones truncated to the low eight bytes.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        LlyrData(u64::from_le_bytes(buf))
    }
}

impl From<u64> for LlyrData {
    fn from(v: u64) -> Self {
        LlyrData(v)
    }
}

impl From<LlyrData> for u64 {
    fn from(v: LlyrData) -> Self {
        v.0
    }
}

impl fmt::Display for LlyrData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
