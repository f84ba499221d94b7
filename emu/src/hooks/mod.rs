pub mod dump;
pub mod trace;

use pip2::inst::Inst;
use vmgp::Interpreter;

pub trait Hook {
    fn init(&mut self, cpu: Interpreter) -> Interpreter;
    fn exec(&mut self, time: u64, addr: u32, inst: Inst, cpu: Interpreter) -> Interpreter;
}
