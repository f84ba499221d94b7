//! VMGP executable loader and PIP2 interpreter.

pub mod error;
pub mod executable;
pub mod interpreter;
pub mod loader;
pub mod memory;
pub mod pool;
pub mod resolver;
pub mod system;

pub use error::Error;
pub use executable::{Executable, Header, Image};
pub use interpreter::Interpreter;
pub use loader::{Layout, Loader};
pub use memory::Memory;
pub use pool::{host_fn, HostFunction, Pool, PoolData, PoolItem, PoolItemKind, PoolValue};
pub use resolver::{CallResolver, NullResolver};
pub use system::{VmConfig, VmSystem};
