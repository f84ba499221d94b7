//! Flat guest address space.
//!
//! Addresses are 32-bit offsets from zero. Words are stored in host byte
//! order: after loading, the byte-order relocations have already converted
//! every word the program touches, so the interpreter never swaps.

use crate::error::Error;

/// Alignment unit of every segment boundary.
pub const DATA_ALIGNMENT: u32 = 4;

/// Rounds `value` up to a multiple of `alignment`. `None` when the result
/// does not fit in 32 bits.
pub fn align_up(value: u32, alignment: u32) -> Option<u32> {
    value.div_ceil(alignment).checked_mul(alignment)
}

#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    fn range(&self, addr: u32, len: u32) -> Result<std::ops::Range<usize>, Error> {
        let start = addr as usize;
        let end = start
            .checked_add(len as usize)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(Error::MemoryOutOfRange(addr, len))?;
        Ok(start..end)
    }

    pub fn slice(&self, addr: u32, len: u32) -> Result<&[u8], Error> {
        let range = self.range(addr, len)?;
        Ok(&self.bytes[range])
    }

    pub fn slice_mut(&mut self, addr: u32, len: u32) -> Result<&mut [u8], Error> {
        let range = self.range(addr, len)?;
        Ok(&mut self.bytes[range])
    }

    fn read<const N: usize>(&self, addr: u32) -> Result<[u8; N], Error> {
        let mut buf = [0; N];
        buf.copy_from_slice(self.slice(addr, N as u32)?);
        Ok(buf)
    }

    pub fn read_u8(&self, addr: u32) -> Result<u8, Error> {
        Ok(self.read::<1>(addr)?[0])
    }

    pub fn read_u16(&self, addr: u32) -> Result<u16, Error> {
        Ok(u16::from_ne_bytes(self.read(addr)?))
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, Error> {
        Ok(u32::from_ne_bytes(self.read(addr)?))
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Error> {
        self.slice_mut(addr, 1)?[0] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Error> {
        self.slice_mut(addr, 2)?.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Error> {
        self.slice_mut(addr, 4)?.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), Error> {
        self.slice_mut(addr, bytes.len() as u32)?
            .copy_from_slice(bytes);
        Ok(())
    }
}
