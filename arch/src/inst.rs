use crate::encoding::{dec_format, enc_format, RangeReg, TwoSources};
use crate::op::{Format, Opcode};
use crate::reg::Reg;

use color_print::cformat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inst {
    pub opcode: Opcode,
    pub enc: TwoSources,
    /// Inline word following the instruction, for formats that carry one.
    pub imm: Option<u32>,
}

impl Inst {
    pub fn new(opcode: Opcode, d: u8, s: u8, t: u8) -> Self {
        Self {
            opcode,
            enc: TwoSources::new(d, s, t),
            imm: None,
        }
    }

    pub fn none(opcode: Opcode) -> Self {
        Self::new(opcode, 0, 0, 0)
    }

    pub fn rrr(opcode: Opcode, d: Reg, s: Reg, t: Reg) -> Self {
        Self::new(opcode, d.into(), s.into(), t.into())
    }

    pub fn rr(opcode: Opcode, d: Reg, s: Reg) -> Self {
        Self::new(opcode, d.into(), s.into(), 0)
    }

    pub fn rri8(opcode: Opcode, d: Reg, s: Reg, imm: i8) -> Self {
        Self::new(opcode, d.into(), s.into(), imm as u8)
    }

    pub fn ri16(opcode: Opcode, d: Reg, imm: i16) -> Self {
        let [lo, hi] = imm.to_le_bytes();
        Self::new(opcode, d.into(), lo, hi)
    }

    pub fn rrl(opcode: Opcode, d: Reg, s: Reg, imm: u32) -> Self {
        Self::rr(opcode, d, s).with_imm(imm)
    }

    /// Register-versus-register branch to `disp` bytes from this instruction.
    pub fn branch(opcode: Opcode, d: Reg, s: Reg, disp: i32) -> Self {
        Self::rr(opcode, d, s).with_imm(disp as u32)
    }

    /// Register-versus-immediate branch to `words` words from this instruction.
    pub fn branch_imm(opcode: Opcode, d: Reg, imm: u8, words: i8) -> Self {
        Self::new(opcode, d.into(), imm, words as u8)
    }

    pub fn r(opcode: Opcode, d: Reg) -> Self {
        Self::new(opcode, d.into(), 0, 0)
    }

    pub fn l(opcode: Opcode, imm: u32) -> Self {
        Self::none(opcode).with_imm(imm)
    }

    pub fn range(opcode: Opcode, start: Reg, count: u8) -> Self {
        Self::new(opcode, start.into(), count, 0)
    }

    pub fn with_imm(mut self, imm: u32) -> Self {
        self.imm = Some(imm);
        self
    }

    pub fn range_reg(&self) -> RangeReg {
        RangeReg::from(self.enc)
    }

    pub fn size(&self) -> u32 {
        self.opcode.size()
    }

    pub fn to_word(&self) -> [u8; 4] {
        enc_format(self.opcode.into(), self.enc.d, self.enc.s, self.enc.t)
    }

    /// Instruction word followed by its inline immediate, in memory order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_word().to_vec();
        if self.size() == 8 {
            bytes.extend_from_slice(&self.imm.unwrap_or(0).to_ne_bytes());
        }
        bytes
    }

    /// Decodes the instruction word alone; the inline immediate is left to
    /// the executor. Returns the raw opcode byte when it is undefined.
    pub fn from_word(word: [u8; 4]) -> Result<Self, u8> {
        let (opcode, d, s, t) = dec_format(word);
        let opcode = Opcode::try_from(opcode).map_err(|_| opcode)?;
        Ok(Self::new(opcode, d, s, t))
    }
}

/// Lays out a straight-line program.
pub fn assemble(insts: &[Inst]) -> Vec<u8> {
    insts.iter().flat_map(|inst| inst.to_bytes()).collect()
}

fn reg_name(field: u8) -> String {
    match Reg::from_field(field) {
        Some(reg) => reg.to_string().to_lowercase(),
        None => format!("?{field}"),
    }
}

impl Inst {
    pub fn cformat(&self) -> String {
        macro_rules! ops {
            ($name:expr, $args:expr) => {
                cformat!("<r>{:<8}</><b>{}</>", $name, $args)
            };
        }

        let name = self.opcode.to_string().to_lowercase();
        let TwoSources { d, s, t } = self.enc;
        let imm = self.imm.unwrap_or(0);
        match self.opcode.format() {
            Format::None => ops!(name, ""),
            Format::Rrr => ops!(name, format!("{} {} {}", reg_name(d), reg_name(s), reg_name(t))),
            Format::Rr => ops!(name, format!("{} {}", reg_name(d), reg_name(s))),
            Format::Rri8 => ops!(
                name,
                cformat!("{} {} <y>{}</>", reg_name(d), reg_name(s), t as i8)
            ),
            Format::Ri16 => ops!(
                name,
                cformat!("{} <y>{}</>", reg_name(d), self.enc.imm16_sext() as i32)
            ),
            Format::Rrl => ops!(
                name,
                cformat!("{} {} <y>0x{:0>8X}</>", reg_name(d), reg_name(s), imm)
            ),
            Format::Rl => ops!(name, cformat!("{} <g>@{}</>", reg_name(d), imm)),
            Format::Branch => ops!(
                name,
                cformat!("{} {} <c>{:+}</>", reg_name(d), reg_name(s), imm as i32)
            ),
            Format::BranchImm => ops!(
                name,
                cformat!(
                    "{} <y>0x{:0>2X}</> <c>{:+}</>",
                    reg_name(d),
                    s,
                    (t as i8 as i32) * 4
                )
            ),
            Format::R => ops!(name, reg_name(d)),
            Format::L => match self.opcode {
                Opcode::CALLL => ops!(name, cformat!("<g>@{}</>", imm)),
                _ => ops!(name, cformat!("<c>{:+}</>", imm as i32)),
            },
            Format::Range => ops!(name, format!("{} x{}", reg_name(d), s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_inst {
        ($($name:ident: $inst:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let inst = $inst;
                    let word = inst.to_word();
                    let back = Inst::from_word(word).unwrap();
                    assert_eq!(inst.opcode, back.opcode);
                    assert_eq!(inst.enc, back.enc);
                    assert_eq!(inst.to_bytes().len() as u32, inst.size());
                }
            )*
        }
    }

    test_inst! {
        test_add: Inst::rrr(Opcode::ADD, Reg::G0, Reg::G1, Reg::G2),
        test_mov: Inst::rr(Opcode::MOV, Reg::S0, Reg::P0),
        test_addq: Inst::rri8(Opcode::ADDQ, Reg::SP, Reg::SP, -16),
        test_ldq: Inst::ri16(Opcode::LDQ, Reg::R0, -2),
        test_addi: Inst::rrl(Opcode::ADDI, Reg::G0, Reg::G0, 0x1234_5678),
        test_ldw: Inst::rri8(Opcode::LDW, Reg::G0, Reg::FP, 8),
        test_beq: Inst::branch(Opcode::BEQ, Reg::G0, Reg::G1, -8),
        test_bgtui: Inst::branch_imm(Opcode::BGTUI, Reg::G0, 0x80, 3),
        test_bltib: Inst::branch_imm(Opcode::BLTIB, Reg::G0, 0xFF, -1),
        test_jpr: Inst::r(Opcode::JPR, Reg::RA),
        test_calll: Inst::l(Opcode::CALLL, 3),
        test_ret: Inst::range(Opcode::RET, Reg::S0, 2),
    }

    #[test]
    fn undefined_opcode() {
        assert_eq!(Inst::from_word([0xEE, 0, 0, 0]), Err(0xEE));
    }

    #[test]
    fn immediate_follows_word() {
        let bytes = Inst::l(Opcode::JPL, 0x10).to_bytes();
        assert_eq!(bytes[0], Opcode::JPL as u8);
        assert_eq!(u32::from_ne_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 0x10);
    }

    #[test]
    fn assemble_concatenates() {
        let code = assemble(&[
            Inst::none(Opcode::NOP),
            Inst::l(Opcode::CALLL, 1),
            Inst::range(Opcode::RET, Reg::RA, 1),
        ]);
        assert_eq!(code.len(), 16);
        assert_eq!(code[4], Opcode::CALLL as u8);
        assert_eq!(code[12], Opcode::RET as u8);
    }

    #[test]
    fn cformat_names_registers() {
        let text = Inst::rrr(Opcode::SUB, Reg::R0, Reg::P0, Reg::P1).cformat();
        assert!(text.contains("sub"));
        assert!(text.contains("r0 p0 p1"));
    }
}
