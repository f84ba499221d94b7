use color_print::cprintln;
use pip2::inst::Inst;
use vmgp::Interpreter;

use super::Hook;

/// Prints every executed instruction.
pub struct Trace {
    enabled: bool,
}

impl Trace {
    pub fn arg(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Hook for Trace {
    fn init(&mut self, cpu: Interpreter) -> Interpreter {
        if self.enabled {
            println!(" * Trace");
        }
        cpu
    }

    fn exec(&mut self, time: u64, addr: u32, inst: Inst, cpu: Interpreter) -> Interpreter {
        if self.enabled {
            cprintln!("<k>{:>8}</> <c>{:08X}</> {}", time, addr, inst.cformat());
        }
        cpu
    }
}
