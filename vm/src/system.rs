//! A loaded program ready to run: memory, resolved pool and initial
//! registers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use pip2::reg::Reg;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::executable::Executable;
use crate::interpreter::Interpreter;
use crate::loader::{Layout, Loader};
use crate::memory::{align_up, Memory, DATA_ALIGNMENT};
use crate::resolver::CallResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Guest address of the code segment.
    pub base_address: u32,
    /// Size of the guest address space in bytes.
    pub memory_size: u32,
    /// Overrides the stack size requested by the executable.
    pub stack_size: Option<u32>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            base_address: 0x0001_0000,
            memory_size: 0x0040_0000,
            stack_size: None,
        }
    }
}

impl VmConfig {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(BufReader::new(file))?)
    }
}

pub struct VmSystem {
    layout: Layout,
    stack_base: u32,
    stack_top: u32,
    interpreter: Interpreter,
}

impl VmSystem {
    pub fn new<E: Executable + ?Sized>(
        executable: &E,
        resolver: &dyn CallResolver,
        config: &VmConfig,
    ) -> Result<Self, Error> {
        let loader = Loader::new(executable);
        let needed = loader.estimate_needed_program_size()?;
        let stack_size = align_up(
            config.stack_size.unwrap_or(executable.header().stack_size),
            DATA_ALIGNMENT,
        )
        .ok_or(Error::ImageTooLarge)?;

        let base = config.base_address;
        let stack_base = base
            .checked_add(needed)
            .ok_or(Error::ProgramMemoryTooSmall(needed, config.memory_size as usize))?;
        let stack_top = stack_base
            .checked_add(stack_size)
            .filter(|&top| top <= config.memory_size)
            .ok_or(Error::ProgramMemoryTooSmall(
                needed.saturating_add(stack_size),
                config.memory_size.saturating_sub(base) as usize,
            ))?;

        let mut memory = Memory::new(config.memory_size as usize);
        let pool = loader.load(memory.slice_mut(base, needed)?, base, resolver)?;
        let layout = loader.layout(base)?;

        let mut interpreter = Interpreter::new(memory, pool);
        interpreter.set(Reg::SP, stack_top);
        interpreter.set(Reg::RA, 0);
        interpreter.set(Reg::PC, layout.code);
        debug!(
            stack = format_args!("0x{:08X}..0x{:08X}", stack_base, stack_top),
            "stack reserved"
        );

        Ok(Self {
            layout,
            stack_base,
            stack_top,
            interpreter,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Lowest address of the stack reserve.
    pub fn stack_base(&self) -> u32 {
        self.stack_base
    }

    /// Initial `SP`.
    pub fn stack_top(&self) -> u32 {
        self.stack_top
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn into_interpreter(self) -> Interpreter {
        self.interpreter
    }
}
