//! Operand encodings of a PIP2 instruction word.
//!
//! Every instruction is one little-endian word laid out as
//! `[opcode, d, s, t]`; what `d`, `s` and `t` mean depends on the opcode's
//! [`Format`](crate::op::Format).

pub fn enc_format(opcode: u8, d: u8, s: u8, t: u8) -> [u8; 4] {
    [opcode, d, s, t]
}

pub fn dec_format(word: [u8; 4]) -> (u8, u8, u8, u8) {
    (word[0], word[1], word[2], word[3])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TwoSources {
    pub d: u8,
    pub s: u8,
    pub t: u8,
}

impl TwoSources {
    pub fn new(d: u8, s: u8, t: u8) -> Self {
        Self { d, s, t }
    }

    /// `s` sign-extended to a full word.
    pub fn s_sext(&self) -> u32 {
        self.s as i8 as i32 as u32
    }

    /// `t` sign-extended to a full word.
    pub fn t_sext(&self) -> u32 {
        self.t as i8 as i32 as u32
    }

    /// `s | t << 8` sign-extended to a full word.
    pub fn imm16_sext(&self) -> u32 {
        (((self.t as u16) << 8) | self.s as u16) as i16 as i32 as u32
    }

    /// Branch displacement carried in `t`, counted in words from the
    /// instruction and pre-adjusted for the fetch advance.
    pub fn word_disp(&self) -> u32 {
        ((self.t as i8 as i32) - 1).wrapping_mul(4) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeReg {
    pub start: u8,
    pub count: u8,
}

impl From<TwoSources> for RangeReg {
    fn from(enc: TwoSources) -> Self {
        Self {
            start: enc.d,
            count: enc.s,
        }
    }
}
