//! Program loader and pool relocator.
//!
//! The program image is laid out as code, data and bss, one after another
//! from the base address, each rounded up to [`DATA_ALIGNMENT`]. Pool items
//! are then resolved in table order into the [`Pool`] the interpreter
//! consults for calls and symbol loads.

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::executable::Executable;
use crate::memory::{align_up, DATA_ALIGNMENT};
use crate::pool::{segment, Pool, PoolData, PoolItem, PoolItemKind, PoolValue};
use crate::resolver::CallResolver;

/// Deepest chain of forward `SymbolAdd` references followed before the
/// executable is rejected.
pub const MAX_RESOLVE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

/// Converts a little-endian value stored in `target` to host order.
pub fn swap_byte_order(target: &mut [u8], host: Endian) {
    if host == Endian::Big {
        target.reverse();
    }
}

/// Segment placement of a loaded program. Sizes are already aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub code: u32,
    pub data: u32,
    pub bss: u32,
    pub code_size: u32,
    pub data_size: u32,
    pub bss_size: u32,
}

impl Layout {
    /// First address past the program image. `None` when the image runs to
    /// the top of the address space.
    pub fn end(&self) -> Option<u32> {
        self.bss.checked_add(self.bss_size)
    }

    pub fn segment_base(&self, tag: u32) -> Option<u32> {
        match tag {
            segment::CODE => Some(self.code),
            segment::DATA => Some(self.data),
            segment::BSS => Some(self.bss),
            _ => None,
        }
    }

    pub fn contains_code(&self, addr: u32) -> bool {
        addr >= self.code && addr < self.data
    }
}

pub struct Loader<'a, E: Executable + ?Sized> {
    executable: &'a E,
    endian: Endian,
}

impl<'a, E: Executable + ?Sized> Loader<'a, E> {
    pub fn new(executable: &'a E) -> Self {
        Self {
            executable,
            endian: Endian::host(),
        }
    }

    /// Applies byte-order relocations as if running on `endian`.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Aligned `(code, data, bss)` sizes.
    fn section_sizes(&self) -> Result<(u32, u32, u32), Error> {
        let header = self.executable.header();
        let aligned = |size| align_up(size, DATA_ALIGNMENT).ok_or(Error::ImageTooLarge);
        Ok((
            aligned(header.code_size)?,
            aligned(header.data_size)?,
            aligned(header.bss_size)?,
        ))
    }

    pub fn estimate_needed_program_size(&self) -> Result<u32, Error> {
        let (code, data, bss) = self.section_sizes()?;
        code.checked_add(data)
            .and_then(|size| size.checked_add(bss))
            .ok_or(Error::ImageTooLarge)
    }

    /// Segment placement at `base`. The whole image, including the end of
    /// bss, must fit below 4 GiB.
    pub fn layout(&self, base: u32) -> Result<Layout, Error> {
        let (code_size, data_size, bss_size) = self.section_sizes()?;
        let data = base.checked_add(code_size).ok_or(Error::ImageTooLarge)?;
        let bss = data.checked_add(data_size).ok_or(Error::ImageTooLarge)?;
        bss.checked_add(bss_size).ok_or(Error::ImageTooLarge)?;
        Ok(Layout {
            code: base,
            data,
            bss,
            code_size,
            data_size,
            bss_size,
        })
    }

    /// Copies the program into `program` (the span starting at `base`) and
    /// resolves the pool.
    pub fn load(
        &self,
        program: &mut [u8],
        base: u32,
        calls: &dyn CallResolver,
    ) -> Result<Pool, Error> {
        let needed = self.estimate_needed_program_size()?;
        if program.len() < needed as usize {
            return Err(Error::ProgramMemoryTooSmall(needed, program.len()));
        }

        let layout = self.layout(base)?;
        let (code, rest) = program.split_at_mut(layout.code_size as usize);
        let (data, rest) = rest.split_at_mut(layout.data_size as usize);
        let bss = &mut rest[..layout.bss_size as usize];

        code.fill(0);
        data.fill(0);
        self.executable.copy_code(code);
        self.executable.copy_data(data);
        bss.fill(0);

        let items = self.executable.pool_items();
        let mut resolution = Resolution {
            executable: self.executable,
            items,
            slots: vec![Slot::Pending; items.len()],
            code,
            data,
            layout,
            calls,
            endian: self.endian,
        };
        for index in 0..items.len() {
            resolution.resolve(index, 0)?;
        }
        let pool = resolution.finish();

        info!(
            code = format_args!("0x{:08X}", layout.code),
            data = format_args!("0x{:08X}", layout.data),
            bss = format_args!("0x{:08X}", layout.bss),
            pool = pool.len(),
            "program loaded"
        );
        Ok(pool)
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    InProgress,
    Done(PoolData),
}

/// Pool items resolved so far. Items are addressed by index; a forward
/// `SymbolAdd` resolves its target on demand and the result is kept, so
/// every item (and its relocation) is processed exactly once.
struct Resolution<'a, 'm, E: Executable + ?Sized> {
    executable: &'a E,
    items: &'a [PoolItem],
    slots: Vec<Slot>,
    code: &'m mut [u8],
    data: &'m mut [u8],
    layout: Layout,
    calls: &'a dyn CallResolver,
    endian: Endian,
}

impl<'a, 'm, E: Executable + ?Sized> Resolution<'a, 'm, E> {
    fn resolve(&mut self, index: usize, depth: usize) -> Result<PoolData, Error> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(Error::ResolveDepthExceeded(MAX_RESOLVE_DEPTH));
        }
        match &self.slots[index] {
            Slot::Done(data) => return Ok(data.clone()),
            Slot::InProgress => return Err(Error::CyclicPoolReference(index + 1)),
            Slot::Pending => {}
        }

        self.slots[index] = Slot::InProgress;
        let data = self.process(index, depth)?;
        self.slots[index] = Slot::Done(data.clone());
        Ok(data)
    }

    fn process(&mut self, index: usize, depth: usize) -> Result<PoolData, Error> {
        let item = self.items[index];
        let ordinal = index + 1;
        let kind = item
            .kind()
            .ok_or(Error::UnknownPoolItemKind(ordinal, item.pool_type))?;

        match kind {
            PoolItemKind::ImportSymbol => {
                let name = self.string(ordinal, item.meta_offset);
                let function = self.calls.resolve(&name);
                if function.is_none() {
                    debug!(ordinal, symbol = %name, "import left unresolved");
                }
                Ok(PoolData::import(function, name))
            }
            PoolItemKind::LocalSymbol | PoolItemKind::GlobalSymbol => {
                let target = item.item_target as u32;
                let base = self
                    .layout
                    .segment_base(target)
                    .ok_or(Error::UnknownSegment(ordinal, target))?;
                let symbol = match kind {
                    PoolItemKind::GlobalSymbol => Some(self.string(ordinal, item.meta_offset)),
                    _ => None,
                };
                Ok(PoolData {
                    value: PoolValue::Immediate(item.target_offset.wrapping_add(base) as i64),
                    symbol,
                    in_code: target == segment::CODE,
                    code_pointer_in_data: false,
                })
            }
            PoolItemKind::SymbolAdd => {
                let referenced = (item.meta_offset as usize)
                    .checked_sub(1)
                    .filter(|&i| i < self.items.len())
                    .ok_or(Error::PoolOrdinalOutOfRange(ordinal, item.meta_offset))?;
                let base = self.resolve(referenced, depth + 1)?;
                let value = match base.as_immediate() {
                    Some(v) => v as u32,
                    None => {
                        warn!(
                            ordinal,
                            referenced = item.meta_offset,
                            "symbol add on a pool entry without a value, using 0"
                        );
                        0
                    }
                };
                let value = value.wrapping_add(item.target_offset);
                if base.in_code && !self.layout.contains_code(value) {
                    debug!(
                        ordinal,
                        value = format_args!("0x{:08X}", value),
                        "code symbol offset lands outside the code segment"
                    );
                }
                Ok(PoolData {
                    value: PoolValue::Immediate(value as i64),
                    in_code: base.in_code,
                    ..Default::default()
                })
            }
            PoolItemKind::SectionRelativeReloc
            | PoolItemKind::Swap32Reloc
            | PoolItemKind::Swap16Reloc => self.relocate(ordinal, kind, item),
            PoolItemKind::Const32 => Ok(PoolData::immediate(item.target_offset)),
            PoolItemKind::End => Ok(PoolData::default()),
        }
    }

    fn relocate(
        &mut self,
        ordinal: usize,
        kind: PoolItemKind,
        item: PoolItem,
    ) -> Result<PoolData, Error> {
        let span: &mut [u8] = match item.item_target as u32 {
            segment::CODE => &mut *self.code,
            segment::DATA => &mut *self.data,
            _ => return Err(Error::UnknownRelocationTarget(ordinal, item.item_target)),
        };
        let size = match kind {
            PoolItemKind::Swap16Reloc => 2,
            _ => 4,
        };
        let start = item.target_offset as usize;
        let Some(target) = start
            .checked_add(size)
            .and_then(|end| span.get_mut(start..end))
        else {
            warn!(
                ordinal,
                offset = format_args!("0x{:X}", item.target_offset),
                segment = item.item_target,
                "relocation target outside its segment"
            );
            return Ok(PoolData::default());
        };

        if kind != PoolItemKind::SectionRelativeReloc {
            swap_byte_order(target, self.endian);
            return Ok(PoolData::immediate(item.meta_offset));
        }

        let mut word = [0; 4];
        word.copy_from_slice(target);
        let value = u32::from_le_bytes(word);
        let base = self
            .layout
            .segment_base(item.meta_offset)
            .ok_or(Error::UnknownSegment(ordinal, item.meta_offset))?;
        let fixed = value.wrapping_add(base);
        target.copy_from_slice(&fixed.to_le_bytes());

        let in_code = item.meta_offset == segment::CODE;
        Ok(PoolData {
            value: PoolValue::Immediate(fixed as i64),
            symbol: None,
            in_code,
            code_pointer_in_data: in_code && item.item_target as u32 == segment::DATA,
        })
    }

    fn string(&self, ordinal: usize, offset: u32) -> String {
        self.executable.string(offset).unwrap_or_else(|| {
            warn!(ordinal, offset, "string table offset out of range");
            String::new()
        })
    }

    fn finish(self) -> Pool {
        Pool::new(
            self.slots
                .into_iter()
                .map(|slot| match slot {
                    Slot::Done(data) => data,
                    _ => PoolData::default(),
                })
                .collect(),
        )
    }
}
