use crate::op::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ALU {
    ADD,
    SUB,
    MUL,
    DIVS,
    DIVU,
    AND,
    OR,
    XOR,
    SLL,
    SRL,
    SRA,
}

/// Evaluates `a op b` the way the CPU does: wrapping two's complement
/// arithmetic, shift amounts masked to five bits. `None` on division by zero.
pub fn valu<T: Into<ALU>>(op: T, a: u32, b: u32) -> Option<u32> {
    use ALU::*;
    Some(match op.into() {
        ADD => a.wrapping_add(b),
        SUB => a.wrapping_sub(b),
        MUL => a.wrapping_mul(b),
        DIVS => {
            if b == 0 {
                return None;
            }
            (a as i32).wrapping_div(b as i32) as u32
        }
        DIVU => a.checked_div(b)?,
        AND => a & b,
        OR => a | b,
        XOR => a ^ b,
        SLL => a << (b & 31),
        SRL => a >> (b & 31),
        SRA => ((a as i32) >> (b & 31)) as u32,
    })
}

impl Opcode {
    /// Operation performed by register, quick-immediate and long-immediate
    /// arithmetic instructions.
    pub fn alu(&self) -> Option<ALU> {
        use Opcode::*;
        Some(match self {
            ADD | ADDQ | ADDI => ALU::ADD,
            SUB | SUBI => ALU::SUB,
            MUL | MULQ | MULI => ALU::MUL,
            DIVS | DIVSI => ALU::DIVS,
            DIVU | DIVUI => ALU::DIVU,
            AND | ANDQ | ANDI => ALU::AND,
            OR | ORQ | ORI => ALU::OR,
            XOR | XORQ | XORI => ALU::XOR,
            SLL | SLLI => ALU::SLL,
            SRL | SRLI => ALU::SRL,
            SRA | SRAI => ALU::SRA,
            _ => return None,
        })
    }
}
