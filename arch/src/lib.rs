pub mod alu;
pub mod encoding;
pub mod inst;
pub mod op;
pub mod reg;
