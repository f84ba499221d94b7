//! Pool table: the per-executable list of constants, imports and
//! relocations, in source form ([`PoolItem`]) and resolved form
//! ([`PoolData`]).

use std::fmt;
use std::rc::Rc;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::interpreter::Interpreter;

/// Host operation reachable through `CALLL`. It sees the whole machine:
/// arguments in `P0..P3`, result in `R0`.
pub type HostFunction = Rc<dyn Fn(&mut Interpreter) -> Result<(), Error>>;

pub fn host_fn<F>(f: F) -> HostFunction
where
    F: Fn(&mut Interpreter) -> Result<(), Error> + 'static,
{
    Rc::new(f)
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum PoolItemKind {
    End = 0,
    ImportSymbol = 1,
    LocalSymbol = 2,
    GlobalSymbol = 3,
    SymbolAdd = 4,
    SectionRelativeReloc = 5,
    Swap32Reloc = 6,
    Swap16Reloc = 7,
    Const32 = 8,
}

/// Segment tags used by `item_target` and by relocation `meta_offset`.
pub mod segment {
    pub const CODE: u32 = 1;
    pub const DATA: u32 = 2;
    pub const BSS: u32 = 4;
}

/// Pool item as stored in the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolItem {
    pub pool_type: u8,
    pub item_target: u8,
    pub target_offset: u32,
    /// String offset for symbols, segment tag for relocations, 1-based pool
    /// ordinal for `SymbolAdd`.
    pub meta_offset: u32,
}

impl PoolItem {
    pub fn new(kind: PoolItemKind, item_target: u8, target_offset: u32, meta_offset: u32) -> Self {
        Self {
            pool_type: kind.into(),
            item_target,
            target_offset,
            meta_offset,
        }
    }

    pub fn kind(&self) -> Option<PoolItemKind> {
        PoolItemKind::try_from(self.pool_type).ok()
    }
}

#[derive(Clone, Default)]
pub enum PoolValue {
    /// `End`, or an item whose relocation could not be applied.
    #[default]
    Absent,
    /// Import the call resolver did not know.
    Unresolved,
    Host(HostFunction),
    Immediate(i64),
}

impl fmt::Debug for PoolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolValue::Absent => write!(f, "Absent"),
            PoolValue::Unresolved => write!(f, "Unresolved"),
            PoolValue::Host(_) => write!(f, "Host(..)"),
            PoolValue::Immediate(v) => write!(f, "Immediate(0x{:X})", v),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolData {
    pub value: PoolValue,
    pub symbol: Option<String>,
    /// The value is an address inside the code segment.
    pub in_code: bool,
    /// A code address patched into the data segment (vtables, function
    /// pointer tables).
    pub code_pointer_in_data: bool,
}

impl PoolData {
    pub fn immediate(value: u32) -> Self {
        Self {
            value: PoolValue::Immediate(value as i64),
            ..Default::default()
        }
    }

    pub fn import(function: Option<HostFunction>, symbol: String) -> Self {
        Self {
            value: match function {
                Some(f) => PoolValue::Host(f),
                None => PoolValue::Unresolved,
            },
            symbol: Some(symbol),
            ..Default::default()
        }
    }

    pub fn as_immediate(&self) -> Option<i64> {
        match self.value {
            PoolValue::Immediate(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.value, PoolValue::Absent)
    }
}

/// Resolved pool, index-aligned with the executable's pool items.
#[derive(Debug, Clone, Default)]
pub struct Pool(Vec<PoolData>);

impl Pool {
    pub fn new(data: Vec<PoolData>) -> Self {
        Self(data)
    }

    /// Looks up an entry by the 1-based ordinal used in the code stream.
    pub fn get(&self, ordinal: u32) -> Option<&PoolData> {
        let index = (ordinal as usize).checked_sub(1)?;
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoolData> {
        self.0.iter()
    }

    /// Code addresses stored in data, for tools looking for call tables.
    pub fn code_pointers_in_data(&self) -> impl Iterator<Item = u32> + '_ {
        self.0
            .iter()
            .filter(|data| data.code_pointer_in_data)
            .filter_map(|data| data.as_immediate())
            .map(|v| v as u32)
    }
}

impl std::ops::Index<usize> for Pool {
    type Output = PoolData;

    fn index(&self, index: usize) -> &PoolData {
        &self.0[index]
    }
}
