//! PIP2 interpreter.
//!
//! Each [`Interpreter::exec`] fetches the word at `PC`, advances `PC` past
//! it, and runs the instruction. Instructions that carry an inline 32-bit
//! immediate fetch it themselves and leave `PC` at the next instruction.

mod arith;
mod control;
mod mem;
mod regs;

pub use regs::Registers;

use pip2::encoding::TwoSources;
use pip2::inst::Inst;
use pip2::op::{Format, Opcode};
use pip2::reg::Reg;

use crate::error::Error;
use crate::memory::Memory;
use crate::pool::Pool;

pub struct Interpreter {
    regs: Registers,
    memory: Memory,
    pool: Pool,
    /// Address of the instruction being executed.
    inst_addr: u32,
    ticks: u64,
    terminated: bool,
}

impl Interpreter {
    pub fn new(memory: Memory, pool: Pool) -> Self {
        Self {
            regs: Registers::default(),
            memory,
            pool,
            inst_addr: 0,
            ticks: 0,
            terminated: false,
        }
    }

    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn get(&self, reg: Reg) -> u32 {
        self.regs.get(reg)
    }

    pub fn set(&mut self, reg: Reg, value: u32) {
        self.regs.set(reg, value)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Instructions executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Asks the embedding host to stop. The instruction set has no halt of
    /// its own; a module call uses this to end the program.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Module call arguments `P0..P3`.
    pub fn args(&self) -> [u32; 4] {
        Reg::PARAMS.map(|reg| self.regs.get(reg))
    }

    /// Module call result.
    pub fn set_result(&mut self, value: u32) {
        self.regs.set(Reg::R0, value)
    }

    /// Decodes the instruction at `addr` along with its inline immediate.
    pub fn peek(&self, addr: u32) -> Result<Inst, Error> {
        let mut word = [0; 4];
        word.copy_from_slice(self.memory.slice(addr, 4)?);
        let inst = Inst::from_word(word).map_err(|op| Error::UndefinedOpcode(addr, op))?;
        Ok(match inst.size() {
            8 => match self.memory.read_u32(addr.wrapping_add(4)) {
                Ok(imm) => inst.with_imm(imm),
                // dispatch fetches the word again and reports the fault
                Err(_) => inst,
            },
            _ => inst,
        })
    }

    /// Runs one instruction and returns its address and decoding.
    pub fn exec(&mut self) -> Result<(u32, Inst), Error> {
        let addr = self.regs.pc();
        let inst = self.peek(addr)?;
        self.inst_addr = addr;
        self.regs.set_pc(addr.wrapping_add(4));
        self.dispatch(inst)?;
        self.ticks += 1;
        Ok((addr, inst))
    }

    /// Runs until terminated or `budget` more instructions have executed.
    /// Returns the number executed.
    pub fn run(&mut self, budget: u64) -> Result<u64, Error> {
        let start = self.ticks;
        while !self.terminated && self.ticks - start < budget {
            self.exec()?;
        }
        Ok(self.ticks - start)
    }

    fn reg(&self, field: u8) -> Result<Reg, Error> {
        Reg::from_field(field).ok_or(Error::InvalidRegister(self.inst_addr, field))
    }

    fn undefined(&self, op: Opcode) -> Error {
        Error::UndefinedOpcode(self.inst_addr, op.into())
    }

    fn fetch_immediate(&mut self) -> Result<u32, Error> {
        let pc = self.regs.pc();
        let imm = self.memory.read_u32(pc)?;
        self.regs.set_pc(pc.wrapping_add(4));
        Ok(imm)
    }

    fn skip_immediate(&mut self) {
        let pc = self.regs.pc();
        self.regs.set_pc(pc.wrapping_add(4));
    }

    fn dispatch(&mut self, inst: Inst) -> Result<(), Error> {
        use Opcode::*;
        let op = inst.opcode;
        let enc: TwoSources = inst.enc;
        match op.format() {
            Format::None => Ok(()),
            Format::Rrr => self.calc(op, enc),
            Format::Rr => self.unary(op, enc),
            Format::Rri8 => match op {
                LDB | LDBU | LDH | LDHU | LDW => self.load(op, enc),
                STB | STH | STW => self.store(op, enc),
                _ => self.calc_quick(op, enc),
            },
            Format::Ri16 => self.ldq(enc),
            Format::Rrl => self.calc_long(op, enc),
            Format::Rl => self.ldi(enc),
            Format::Branch => self.branch(op, enc),
            Format::BranchImm => match op {
                BEQIB | BNEIB | BGEIB | BGTIB | BGTUIB | BLEIB | BLEUIB | BLTIB | BLTUIB => {
                    self.branch_imm8(op, enc)
                }
                _ => self.branch_imm(op, enc),
            },
            Format::R => match op {
                JPR => self.jpr(enc),
                _ => self.callr(enc),
            },
            Format::L => match op {
                JPL => self.jpl(),
                _ => self.calll(),
            },
            Format::Range => match op {
                STORE => self.store_range(inst.range_reg()),
                RESTORE => self.restore_range(inst.range_reg()),
                _ => self.ret(inst.range_reg()),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use pip2::inst::assemble;

    pub const CODE: u32 = 0x100;
    pub const STACK_TOP: u32 = 0x8000;

    /// Machine with `insts` at [`CODE`] and `PC` pointing at them.
    pub fn machine(insts: &[Inst], pool: Pool) -> Interpreter {
        let mut memory = Memory::new(0x10000);
        memory.write_bytes(CODE, &assemble(insts)).unwrap();
        let mut cpu = Interpreter::new(memory, pool);
        cpu.set(Reg::PC, CODE);
        cpu.set(Reg::SP, STACK_TOP);
        cpu
    }
}
