use pip2::inst::Inst;
use pip2::reg::Reg;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use vmgp::Interpreter;

use super::Hook;

/// Stack words printed at most per dump.
const STACK_WORDS: u32 = 16;

#[derive(Debug)]
pub struct Dump {
    file: Option<String>,
    all: bool,
    list: List,
}

/// Dump points keyed by instruction address.
#[derive(Debug, Default, Serialize, Deserialize)]
struct List(HashMap<u32, Config>);

#[derive(Debug, Serialize, Deserialize)]
struct Config {
    #[serde(default)]
    stack: bool,
    #[serde(default)]
    heap: Vec<u32>,
}

impl Dump {
    pub fn arg(file: Option<String>, all: bool) -> Result<Self, vmgp::Error> {
        let list = match &file {
            Some(fname) => {
                let file = File::open(fname)?;
                serde_yaml::from_reader(BufReader::new(file))?
            }
            None => List::default(),
        };
        Ok(Self { file, all, list })
    }

    fn get(&self, pc: u32) -> Option<&Config> {
        self.list.0.get(&pc)
    }
}

impl Hook for Dump {
    fn init(&mut self, cpu: Interpreter) -> Interpreter {
        if self.all {
            println!(" * Dump all");
        }
        if let Some(fname) = &self.file {
            println!(" * Dump[{}] {:?}", self.list.0.len(), fname);
        }
        cpu
    }

    fn exec(&mut self, _time: u64, addr: u32, _inst: Inst, cpu: Interpreter) -> Interpreter {
        if let Some(cfg) = self.get(addr) {
            self.print_reg(&cpu);
            if cfg.stack {
                self.print_stack(&cpu);
            }
            self.print_heap(&cpu, &cfg.heap);
        } else if self.all {
            self.print_reg(&cpu);
        }
        cpu
    }
}

impl Dump {
    fn print_reg(&self, cpu: &Interpreter) {
        let regs: Vec<Reg> = (0..=u8::MAX).map_while(Reg::from_field).collect();
        println!(" +----------------+----------------+----------------+----------------+");
        for row in regs.chunks(4) {
            let cells: Vec<String> = row
                .iter()
                .map(|&reg| format!("{:>4}: {:0>8X}", reg.to_string().to_lowercase(), cpu.get(reg)))
                .collect();
            println!(" | {:<65} |", cells.join(" | "));
        }
        println!(" +----------------+----------------+----------------+----------------+");
    }

    fn print_stack(&self, cpu: &Interpreter) {
        let sp = cpu.get(Reg::SP);
        let fp = cpu.get(Reg::FP);
        let end = match fp > sp {
            true => fp.min(sp.saturating_add(STACK_WORDS * 4)),
            false => sp.saturating_add(STACK_WORDS * 4),
        };
        for addr in (sp..end).step_by(4) {
            self.print_word(cpu, addr);
        }
        println!(" +-------------------------------------------------------------------+");
    }

    fn print_heap(&self, cpu: &Interpreter, addrs: &[u32]) {
        for &addr in addrs {
            self.print_word(cpu, addr);
        }
        println!(" +-------------------------------------------------------------------+");
    }

    fn print_word(&self, cpu: &Interpreter, addr: u32) {
        match cpu.memory().read_u32(addr) {
            Ok(word) => println!(" | {:0>8X} : {:0>8X}{:>47}|", addr, word, ""),
            Err(_) => println!(" | {:0>8X} : --------{:>47}|", addr, ""),
        }
    }
}
