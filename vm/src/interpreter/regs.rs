use pip2::reg::Reg;
use strum::EnumCount;

/// Register file. The 8-bit view of a register is the low byte of the same
/// word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers([u32; Reg::COUNT]);

impl Registers {
    pub fn get(&self, reg: Reg) -> u32 {
        self.0[reg.index()]
    }

    /// Writes to `ZERO` are dropped.
    pub fn set(&mut self, reg: Reg, value: u32) {
        if reg != Reg::ZERO {
            self.0[reg.index()] = value;
        }
    }

    pub fn get8(&self, reg: Reg) -> u8 {
        self.get(reg) as u8
    }

    pub fn pc(&self) -> u32 {
        self.get(Reg::PC)
    }

    pub fn set_pc(&mut self, value: u32) {
        self.set(Reg::PC, value)
    }
}
