use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumCount, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    TryFromPrimitive,
    IntoPrimitive,
    EnumIter,
    EnumCount,
    Display,
)]
#[repr(u8)]
pub enum Reg {
    #[default]
    ZERO,
    SP,
    RA,
    FP,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    G0,
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    P0,
    P1,
    P2,
    P3,
    R0,
    R1,
    PC,
}

impl Reg {
    /// Module call arguments, in order.
    pub const PARAMS: [Reg; 4] = [Reg::P0, Reg::P1, Reg::P2, Reg::P3];

    /// Decodes a register field of an instruction word.
    pub fn from_field(field: u8) -> Option<Self> {
        Self::try_from(field).ok()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}
