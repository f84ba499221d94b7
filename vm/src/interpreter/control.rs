//! Branches, jumps, calls and frame instructions.

use pip2::encoding::{RangeReg, TwoSources};
use pip2::op::Opcode;
use pip2::reg::Reg;

use super::Interpreter;
use crate::error::Error;
use crate::pool::PoolValue;

impl Interpreter {
    /// `CALLL`: call through the pool entry whose ordinal follows the word.
    pub(super) fn calll(&mut self) -> Result<(), Error> {
        let pc = self.regs.pc();
        let ordinal = self.memory.read_u32(pc)?;
        let value = self
            .pool
            .get(ordinal)
            .map(|data| data.value.clone())
            .ok_or(Error::InvalidPoolOrdinal(ordinal))?;

        match value {
            PoolValue::Host(function) => {
                self.regs.set_pc(pc.wrapping_add(4));
                function(self)
            }
            PoolValue::Immediate(target) => {
                self.regs.set(Reg::RA, pc.wrapping_add(4));
                self.regs.set_pc(target as u32);
                Ok(())
            }
            PoolValue::Unresolved => {
                let symbol = self
                    .pool
                    .get(ordinal)
                    .and_then(|data| data.symbol.clone())
                    .unwrap_or_default();
                Err(Error::UnresolvedImport(ordinal, symbol))
            }
            PoolValue::Absent => Err(Error::InvalidCallTarget(ordinal)),
        }
    }

    pub(super) fn callr(&mut self, enc: TwoSources) -> Result<(), Error> {
        let target = self.regs.get(self.reg(enc.d)?);
        let pc = self.regs.pc();
        self.regs.set(Reg::RA, pc);
        self.regs.set_pc(target);
        Ok(())
    }

    /// Register-versus-register branches. The displacement follows the word
    /// whether or not the branch is taken.
    pub(super) fn branch(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let a = self.regs.get(self.reg(enc.d)?);
        let b = self.regs.get(self.reg(enc.s)?);
        let taken = match op {
            BEQ => a == b,
            BNE => a != b,
            BGT => (a as i32) > (b as i32),
            BGTU => a > b,
            BGE => (a as i32) >= (b as i32),
            BGEU => a >= b,
            BLT => (a as i32) < (b as i32),
            BLTU => a < b,
            BLE => (a as i32) <= (b as i32),
            BLEU => a <= b,
            _ => return Err(self.undefined(op)),
        };

        if taken {
            // displacement is relative to the branch instruction
            let pc = self.regs.pc();
            let disp = self.fetch_immediate()?;
            self.regs.set_pc(pc.wrapping_add(disp).wrapping_sub(4));
        } else {
            self.skip_immediate();
        }
        Ok(())
    }

    /// Register-versus-immediate branches. `BGTUI`, `BLEUI` and `BLTUI`
    /// compare against the raw byte; `BEQI` and `BNEI` sign-extend it.
    pub(super) fn branch_imm(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let a = self.regs.get(self.reg(enc.d)?);
        let signed = a as i32;
        let imm = enc.s as i8 as i32;
        let taken = match op {
            BEQI => a == enc.s_sext(),
            BNEI => a != enc.s_sext(),
            BGEI => signed >= imm,
            BGTI => signed > imm,
            BGTUI => a > enc.s as u32,
            BLEI => signed <= imm,
            BLEUI => a <= enc.s as u32,
            BLTI => signed < imm,
            BLTUI => a < enc.s as u32,
            _ => return Err(self.undefined(op)),
        };

        if taken {
            let pc = self.regs.pc();
            self.regs.set_pc(pc.wrapping_add(enc.word_disp()));
        }
        Ok(())
    }

    /// Branches on the low byte of a register.
    pub(super) fn branch_imm8(&mut self, op: Opcode, enc: TwoSources) -> Result<(), Error> {
        use Opcode::*;
        let a = self.regs.get8(self.reg(enc.d)?);
        let b = enc.s;
        let taken = match op {
            BEQIB => a == b,
            BNEIB => a != b,
            BGEIB => (a as i8) >= (b as i8),
            BGTIB => (a as i8) > (b as i8),
            BGTUIB => a > b,
            BLEIB => (a as i8) <= (b as i8),
            BLEUIB => a <= b,
            BLTIB => (a as i8) < (b as i8),
            BLTUIB => a < b,
            _ => return Err(self.undefined(op)),
        };

        if taken {
            let pc = self.regs.pc();
            self.regs.set_pc(pc.wrapping_add(enc.word_disp()));
        }
        Ok(())
    }

    pub(super) fn jpr(&mut self, enc: TwoSources) -> Result<(), Error> {
        let target = self.regs.get(self.reg(enc.d)?);
        self.regs.set_pc(target);
        Ok(())
    }

    pub(super) fn jpl(&mut self) -> Result<(), Error> {
        let pc = self.regs.pc();
        let disp = self.fetch_immediate()?;
        self.regs.set_pc(pc.wrapping_add(disp).wrapping_sub(4));
        Ok(())
    }

    fn range_reg(&self, range: RangeReg, i: u8) -> Result<Reg, Error> {
        let field = range
            .start
            .checked_add(i)
            .ok_or(Error::InvalidRegister(self.inst_addr, u8::MAX))?;
        self.reg(field)
    }

    /// Pushes registers `start..start + count` as one block.
    pub(super) fn store_range(&mut self, range: RangeReg) -> Result<(), Error> {
        let sp = self
            .regs
            .get(Reg::SP)
            .wrapping_sub(4 * range.count as u32);
        for i in 0..range.count {
            let reg = self.range_reg(range, i)?;
            let value = self.regs.get(reg);
            self.memory.write_u32(sp.wrapping_add(4 * i as u32), value)?;
        }
        self.regs.set(Reg::SP, sp);
        Ok(())
    }

    /// Pops the block pushed by the matching `STORE`.
    pub(super) fn restore_range(&mut self, range: RangeReg) -> Result<(), Error> {
        let sp = self.regs.get(Reg::SP);
        for i in 0..range.count {
            let reg = self.range_reg(range, i)?;
            let value = self.memory.read_u32(sp.wrapping_add(4 * i as u32))?;
            self.regs.set(reg, value);
        }
        self.regs
            .set(Reg::SP, sp.wrapping_add(4 * range.count as u32));
        Ok(())
    }

    pub(super) fn ret(&mut self, range: RangeReg) -> Result<(), Error> {
        self.restore_range(range)?;
        let ra = self.regs.get(Reg::RA);
        self.regs.set_pc(ra);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::pool::{host_fn, Pool, PoolData};
    use pip2::inst::Inst;

    fn pair(op: Opcode, a: u32, b: u32) -> Interpreter {
        let mut cpu = machine(&[Inst::branch(op, Reg::G0, Reg::G1, 0x40)], Pool::default());
        cpu.set(Reg::G0, a);
        cpu.set(Reg::G1, b);
        cpu.exec().unwrap();
        cpu
    }

    fn taken(cpu: &Interpreter) -> bool {
        match cpu.regs().pc() {
            pc if pc == CODE + 0x40 => true,
            pc if pc == CODE + 8 => false,
            pc => panic!("PC left at 0x{pc:X}"),
        }
    }

    macro_rules! test_branch {
        ($($name:ident: $op:ident($a:expr, $b:expr) => $want:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(taken(&pair(Opcode::$op, $a as u32, $b as u32)), $want);
                }
            )*
        }
    }

    test_branch! {
        bgt_taken: BGT(5, 3) => true,
        blt_not_taken: BLT(5, 3) => false,
        beq_equal: BEQ(7, 7) => true,
        bne_equal: BNE(7, 7) => false,
        bgt_signed: BGT(-1i32, 1) => false,
        bgtu_unsigned: BGTU(-1i32, 1) => true,
        bge_equal: BGE(-2i32, -2i32) => true,
        bgeu_less: BGEU(1, 2) => false,
        blt_signed: BLT(-5i32, 0) => true,
        bltu_unsigned: BLTU(-5i32, 0) => false,
        ble_equal: BLE(3, 3) => true,
        bleu_greater: BLEU(4, 3) => false,
    }

    #[test]
    fn branch_backward() {
        let mut cpu = machine(
            &[
                Inst::none(Opcode::NOP),
                Inst::branch(Opcode::BEQ, Reg::ZERO, Reg::ZERO, -4),
            ],
            Pool::default(),
        );
        cpu.exec().unwrap();
        cpu.exec().unwrap();
        assert_eq!(cpu.regs().pc(), CODE);
    }

    fn imm(op: Opcode, a: u32, imm: u8) -> bool {
        let mut cpu = machine(&[Inst::branch_imm(op, Reg::G0, imm, 4)], Pool::default());
        cpu.set(Reg::G0, a);
        cpu.exec().unwrap();
        match cpu.regs().pc() {
            pc if pc == CODE + 16 => true,
            pc if pc == CODE + 4 => false,
            pc => panic!("PC left at 0x{pc:X}"),
        }
    }

    macro_rules! test_branch_imm {
        ($($name:ident: $op:ident($a:expr, $imm:expr) => $want:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(imm(Opcode::$op, $a as u32, $imm), $want);
                }
            )*
        }
    }

    test_branch_imm! {
        beqi_sign_extends: BEQI(-1i32, 0xFF) => true,
        bnei_sign_extends: BNEI(0xFF, 0xFF) => true,
        bgei_signed: BGEI(0, 0xFF) => true,
        bgti_signed: BGTI(5, 0xFF) => true,
        bgtui_raw_byte: BGTUI(5, 0xFF) => false,
        bgtui_large: BGTUI(0x100, 0xFF) => true,
        blei_signed: BLEI(-2i32, 0xFE) => true,
        bleui_raw_byte: BLEUI(0xFF, 0xFF) => true,
        blti_signed: BLTI(-3i32, 0xFE) => true,
        bltui_raw_byte: BLTUI(0x80, 0xFF) => true,
        bltui_negative: BLTUI(-1i32, 0x01) => false,
    }

    test_branch_imm! {
        beqib_low_byte: BEQIB(0x1234_5680, 0x80) => true,
        bneib_low_byte: BNEIB(0x0000_0180, 0x80) => false,
        bgeib_signed: BGEIB(0x80, 0x7F) => false,
        bgtib_signed: BGTIB(0x01, 0xFF) => true,
        bgtuib_unsigned: BGTUIB(0x01, 0xFF) => false,
        bleib_signed: BLEIB(0xFF, 0x00) => true,
        bleuib_unsigned: BLEUIB(0xFF, 0x00) => false,
        bltib_signed: BLTIB(0x90, 0x10) => true,
        bltuib_unsigned: BLTUIB(0x90, 0x10) => false,
    }

    #[test]
    fn immediate_branch_backward() {
        let mut cpu = machine(
            &[
                Inst::none(Opcode::NOP),
                Inst::branch_imm(Opcode::BEQIB, Reg::ZERO, 0, -1),
            ],
            Pool::default(),
        );
        cpu.exec().unwrap();
        cpu.exec().unwrap();
        assert_eq!(cpu.regs().pc(), CODE);
    }

    #[test]
    fn calll_to_code_address() {
        let pool = Pool::new(vec![PoolData::immediate(0x1000)]);
        let mut cpu = machine(&[], pool);
        cpu.memory_mut().write_u32(0x2000, 1).unwrap();
        cpu.set(Reg::PC, 0x2000);
        cpu.calll().unwrap();
        assert_eq!(cpu.get(Reg::RA), 0x2004);
        assert_eq!(cpu.regs().pc(), 0x1000);
    }

    #[test]
    fn calll_to_host() {
        let double = host_fn(|cpu| {
            let [a, ..] = cpu.args();
            cpu.set_result(a * 2);
            Ok(())
        });
        let pool = Pool::new(vec![PoolData::import(Some(double), "vDouble".to_string())]);
        let mut cpu = machine(&[Inst::l(Opcode::CALLL, 1), Inst::none(Opcode::NOP)], pool);
        cpu.set(Reg::P0, 21);
        cpu.set(Reg::RA, 0xAAAA);
        cpu.exec().unwrap();
        assert_eq!(cpu.get(Reg::R0), 42);
        assert_eq!(cpu.regs().pc(), CODE + 8);
        assert_eq!(cpu.get(Reg::RA), 0xAAAA);
    }

    #[test]
    fn calll_host_error_propagates() {
        let failing = host_fn(|_| Err(Error::InvalidCallTarget(99)));
        let pool = Pool::new(vec![PoolData::import(Some(failing), "vFail".to_string())]);
        let mut cpu = machine(&[Inst::l(Opcode::CALLL, 1)], pool);
        assert!(matches!(cpu.exec(), Err(Error::InvalidCallTarget(99))));
    }

    #[test]
    fn calll_unresolved_is_fatal() {
        let pool = Pool::new(vec![PoolData::import(None, "vMissing".to_string())]);
        let mut cpu = machine(&[Inst::l(Opcode::CALLL, 1)], pool);
        match cpu.exec() {
            Err(Error::UnresolvedImport(1, name)) => assert_eq!(name, "vMissing"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn calll_absent_is_fatal() {
        let pool = Pool::new(vec![PoolData::default()]);
        let mut cpu = machine(&[Inst::l(Opcode::CALLL, 1), Inst::l(Opcode::CALLL, 7)], pool);
        assert!(matches!(cpu.exec(), Err(Error::InvalidCallTarget(1))));
        cpu.set(Reg::PC, CODE + 8);
        assert!(matches!(cpu.exec(), Err(Error::InvalidPoolOrdinal(7))));
    }

    #[test]
    fn callr_and_jpr() {
        let mut cpu = machine(&[Inst::r(Opcode::CALLR, Reg::G0)], Pool::default());
        cpu.set(Reg::G0, 0x400);
        cpu.exec().unwrap();
        assert_eq!(cpu.get(Reg::RA), CODE + 4);
        assert_eq!(cpu.regs().pc(), 0x400);

        let mut cpu = machine(&[Inst::r(Opcode::JPR, Reg::G0)], Pool::default());
        cpu.set(Reg::G0, 0x400);
        cpu.set(Reg::RA, 0x10);
        cpu.exec().unwrap();
        assert_eq!(cpu.regs().pc(), 0x400);
        assert_eq!(cpu.get(Reg::RA), 0x10);
    }

    #[test]
    fn callr_through_ra() {
        let mut cpu = machine(&[Inst::r(Opcode::CALLR, Reg::RA)], Pool::default());
        cpu.set(Reg::RA, 0x400);
        cpu.exec().unwrap();
        assert_eq!(cpu.regs().pc(), 0x400);
        assert_eq!(cpu.get(Reg::RA), CODE + 4);
    }

    #[test]
    fn jpl_relative_to_instruction() {
        let mut cpu = machine(&[Inst::l(Opcode::JPL, 0x20)], Pool::default());
        cpu.exec().unwrap();
        assert_eq!(cpu.regs().pc(), CODE + 0x20);
    }

    #[test]
    fn store_restore_round_trip() {
        let mut cpu = machine(
            &[
                Inst::range(Opcode::STORE, Reg::S0, 3),
                Inst::range(Opcode::RESTORE, Reg::S0, 3),
            ],
            Pool::default(),
        );
        cpu.set(Reg::S0, 1);
        cpu.set(Reg::S1, 2);
        cpu.set(Reg::S2, 3);
        cpu.exec().unwrap();
        assert_eq!(cpu.get(Reg::SP), STACK_TOP - 12);
        assert_eq!(cpu.memory().read_u32(STACK_TOP - 12).unwrap(), 1);
        assert_eq!(cpu.memory().read_u32(STACK_TOP - 4).unwrap(), 3);

        cpu.set(Reg::S0, 0);
        cpu.set(Reg::S1, 0);
        cpu.set(Reg::S2, 0);
        cpu.exec().unwrap();
        assert_eq!(cpu.get(Reg::SP), STACK_TOP);
        assert_eq!(
            [cpu.get(Reg::S0), cpu.get(Reg::S1), cpu.get(Reg::S2)],
            [1, 2, 3]
        );
    }

    #[test]
    fn ret_restores_then_returns() {
        let mut cpu = machine(&[Inst::range(Opcode::RET, Reg::RA, 2)], Pool::default());
        cpu.set(Reg::SP, STACK_TOP - 8);
        cpu.memory_mut().write_u32(STACK_TOP - 8, 0x300).unwrap();
        cpu.memory_mut().write_u32(STACK_TOP - 4, 0x55).unwrap();
        cpu.exec().unwrap();
        assert_eq!(cpu.get(Reg::RA), 0x300);
        assert_eq!(cpu.get(Reg::FP), 0x55);
        assert_eq!(cpu.get(Reg::SP), STACK_TOP);
        assert_eq!(cpu.regs().pc(), 0x300);
    }

    #[test]
    fn ret_without_range() {
        let mut cpu = machine(&[Inst::range(Opcode::RET, Reg::ZERO, 0)], Pool::default());
        cpu.set(Reg::RA, 0x200);
        cpu.exec().unwrap();
        assert_eq!(cpu.regs().pc(), 0x200);
        assert_eq!(cpu.get(Reg::SP), STACK_TOP);
    }

    #[test]
    fn store_past_register_file_is_fatal() {
        let mut cpu = machine(&[Inst::range(Opcode::STORE, Reg::R1, 3)], Pool::default());
        assert!(matches!(cpu.exec(), Err(Error::InvalidRegister(CODE, 27))));
    }
}
