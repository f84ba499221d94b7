use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    EnumIter,
    Display,
)]
#[repr(u8)]
pub enum Opcode {
    NOP = 0x01,

    ADD = 0x02,
    SUB = 0x03,
    MUL = 0x04,
    DIVS = 0x05,
    DIVU = 0x06,
    AND = 0x07,
    OR = 0x08,
    XOR = 0x09,
    SLL = 0x0A,
    SRL = 0x0B,
    SRA = 0x0C,

    NOT = 0x0D,
    NEG = 0x0E,
    EXSB = 0x0F,
    EXSH = 0x10,
    MOV = 0x11,

    ADDQ = 0x12,
    MULQ = 0x13,
    ANDQ = 0x14,
    ORQ = 0x15,
    XORQ = 0x16,
    SLLI = 0x17,
    SRLI = 0x18,
    SRAI = 0x19,
    LDQ = 0x1A,

    ADDI = 0x20,
    SUBI = 0x21,
    MULI = 0x22,
    DIVSI = 0x23,
    DIVUI = 0x24,
    ANDI = 0x25,
    ORI = 0x26,
    XORI = 0x27,
    LDI = 0x28,

    LDB = 0x30,
    LDBU = 0x31,
    LDH = 0x32,
    LDHU = 0x33,
    LDW = 0x34,
    STB = 0x35,
    STH = 0x36,
    STW = 0x37,

    BEQ = 0x40,
    BNE = 0x41,
    BGT = 0x42,
    BGTU = 0x43,
    BGE = 0x44,
    BGEU = 0x45,
    BLT = 0x46,
    BLTU = 0x47,
    BLE = 0x48,
    BLEU = 0x49,

    BEQI = 0x50,
    BNEI = 0x51,
    BGEI = 0x52,
    BGTI = 0x53,
    BGTUI = 0x54,
    BLEI = 0x55,
    BLEUI = 0x56,
    BLTI = 0x57,
    BLTUI = 0x58,

    BEQIB = 0x60,
    BNEIB = 0x61,
    BGEIB = 0x62,
    BGTIB = 0x63,
    BGTUIB = 0x64,
    BLEIB = 0x65,
    BLEUIB = 0x66,
    BLTIB = 0x67,
    BLTUIB = 0x68,

    JPR = 0x70,
    JPL = 0x71,
    CALLR = 0x72,
    CALLL = 0x73,
    STORE = 0x74,
    RESTORE = 0x75,
    RET = 0x76,
}

/// How the three operand bytes of an instruction word are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// No operands.
    None,
    /// `d, s, t` all registers.
    Rrr,
    /// `d, s` registers.
    Rr,
    /// `d, s` registers, `t` an 8-bit immediate.
    Rri8,
    /// `d` register, `s | t << 8` a 16-bit immediate.
    Ri16,
    /// `d, s` registers, a 32-bit immediate follows the word.
    Rrl,
    /// `d` register, a 32-bit pool ordinal follows the word.
    Rl,
    /// `d, s` registers, a 32-bit displacement follows the word.
    Branch,
    /// `d` register, `s` an 8-bit immediate, `t` a word displacement.
    BranchImm,
    /// `d` register.
    R,
    /// A 32-bit immediate follows the word.
    L,
    /// `d` first register, `s` register count.
    Range,
}

impl Opcode {
    pub fn format(&self) -> Format {
        use Opcode::*;
        match self {
            NOP => Format::None,
            ADD | SUB | MUL | DIVS | DIVU | AND | OR | XOR | SLL | SRL | SRA => Format::Rrr,
            NOT | NEG | EXSB | EXSH | MOV => Format::Rr,
            ADDQ | MULQ | ANDQ | ORQ | XORQ | SLLI | SRLI | SRAI => Format::Rri8,
            LDQ => Format::Ri16,
            ADDI | SUBI | MULI | DIVSI | DIVUI | ANDI | ORI | XORI => Format::Rrl,
            LDI => Format::Rl,
            LDB | LDBU | LDH | LDHU | LDW | STB | STH | STW => Format::Rri8,
            BEQ | BNE | BGT | BGTU | BGE | BGEU | BLT | BLTU | BLE | BLEU => Format::Branch,
            BEQI | BNEI | BGEI | BGTI | BGTUI | BLEI | BLEUI | BLTI | BLTUI => Format::BranchImm,
            BEQIB | BNEIB | BGEIB | BGTIB | BGTUIB | BLEIB | BLEUIB | BLTIB | BLTUIB => {
                Format::BranchImm
            }
            JPR | CALLR => Format::R,
            JPL | CALLL => Format::L,
            STORE | RESTORE | RET => Format::Range,
        }
    }

    /// Bytes occupied in the code stream, inline immediate included.
    pub fn size(&self) -> u32 {
        match self.format() {
            Format::Rrl | Format::Rl | Format::Branch | Format::L => 8,
            _ => 4,
        }
    }
}
