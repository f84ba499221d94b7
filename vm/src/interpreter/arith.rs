use pip2::alu::valu;
use pip2::encoding::TwoSources;
use pip2::op::Opcode;

use super::Interpreter;
use crate::error::Error;

impl Interpreter {
    fn alu(&self, op: Opcode, a: u32, b: u32) -> Result<u32, Error> {
        let alu = op.alu().ok_or_else(|| self.undefined(op))?;
        valu(alu, a, b).ok_or(Error::DivisionByZero(self.inst_addr))
    }

    /// `d = s op t`
    pub(super) fn calc(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        let a = self.regs.get(self.reg(enc.s)?);
        let b = self.regs.get(self.reg(enc.t)?);
        let value = self.alu(op, a, b)?;
        self.regs.set(self.reg(enc.d)?, value);
        Ok(())
    }

    pub(super) fn unary(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let a = self.regs.get(self.reg(enc.s)?);
        let value = match op {
            NOT => !a,
            NEG => a.wrapping_neg(),
            EXSB => a as i8 as i32 as u32,
            EXSH => a as i16 as i32 as u32,
            MOV => a,
            _ => return Err(self.undefined(op)),
        };
        self.regs.set(self.reg(enc.d)?, value);
        Ok(())
    }

    /// `d = s op t`, with `t` an 8-bit immediate. Logic ops take it as an
    /// unsigned mask.
    pub(super) fn calc_quick(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let a = self.regs.get(self.reg(enc.s)?);
        let b = match op {
            ANDQ | ORQ | XORQ | SLLI | SRLI | SRAI => enc.t as u32,
            _ => enc.t_sext(),
        };
        let value = self.alu(op, a, b)?;
        self.regs.set(self.reg(enc.d)?, value);
        Ok(())
    }

    pub(super) fn ldq(&mut self, enc: TwoSources) -> Result<(), Error> {
        self.regs.set(self.reg(enc.d)?, enc.imm16_sext());
        Ok(())
    }

    /// `d = s op imm32`
    pub(super) fn calc_long(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        let b = self.fetch_immediate()?;
        let a = self.regs.get(self.reg(enc.s)?);
        let value = self.alu(op, a, b)?;
        self.regs.set(self.reg(enc.d)?, value);
        Ok(())
    }

    /// Loads a pool constant. The pool keeps 64-bit values; registers see the
    /// low word.
    pub(super) fn ldi(&mut self, enc: TwoSources) -> Result<(), Error> {
        let ordinal = self.fetch_immediate()?;
        let value = self
            .pool
            .get(ordinal)
            .ok_or(Error::InvalidPoolOrdinal(ordinal))?
            .as_immediate()
            .ok_or(Error::NotAnInteger(ordinal))?;
        self.regs.set(self.reg(enc.d)?, value as u32);
        Ok(())
    }
}
