use pip2::encoding::TwoSources;
use pip2::op::Opcode;

use super::Interpreter;
use crate::error::Error;

impl Interpreter {
    fn effective_address(&self, enc: TwoSources) -> Result<u32, Error> {
        let base = self.regs.get(self.reg(enc.s)?);
        Ok(base.wrapping_add(enc.t_sext()))
    }

    pub(super) fn load(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let addr = self.effective_address(enc)?;
        let value = match op {
            LDB => self.memory.read_u8(addr)? as i8 as i32 as u32,
            LDBU => self.memory.read_u8(addr)? as u32,
            LDH => self.memory.read_u16(addr)? as i16 as i32 as u32,
            LDHU => self.memory.read_u16(addr)? as u32,
            LDW => self.memory.read_u32(addr)?,
            _ => return Err(self.undefined(op)),
        };
        self.regs.set(self.reg(enc.d)?, value);
        Ok(())
    }

    pub(super) fn store(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let addr = self.effective_address(enc)?;
        let value = self.regs.get(self.reg(enc.d)?);
        match op {
            STB => self.memory.write_u8(addr, value as u8),
            STH => self.memory.write_u16(addr, value as u16),
            STW => self.memory.write_u32(addr, value),
            _ => Err(self.undefined(op)),
        }
    }
}
