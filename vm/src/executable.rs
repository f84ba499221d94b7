//! Executable container seen by the loader.
//!
//! The on-disk container format is read elsewhere; the loader only needs
//! the segment sizes, the segment bytes, the string table and the pool.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pool::{PoolItem, PoolItemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    pub code_size: u32,
    pub data_size: u32,
    pub bss_size: u32,
    pub stack_size: u32,
}

pub trait Executable {
    fn header(&self) -> &Header;

    /// Copies the code segment into `dest`, which may be longer than it.
    fn copy_code(&self, dest: &mut [u8]);

    /// Copies the data segment into `dest`, which may be longer than it.
    fn copy_data(&self, dest: &mut [u8]);

    /// NUL-terminated string at `offset` in the string table.
    fn string(&self, offset: u32) -> Option<String>;

    fn pool_items(&self) -> &[PoolItem];
}

/// Executable held in memory.
#[derive(Debug, Clone, Default)]
pub struct Image {
    header: Header,
    code: Vec<u8>,
    data: Vec<u8>,
    strings: Vec<u8>,
    pool: Vec<PoolItem>,
}

impl Image {
    pub fn new(code: Vec<u8>, data: Vec<u8>, bss_size: u32) -> Self {
        Self {
            header: Header {
                code_size: code.len() as u32,
                data_size: data.len() as u32,
                bss_size,
                stack_size: 0,
            },
            code,
            data,
            strings: Vec::new(),
            pool: Vec::new(),
        }
    }

    pub fn with_stack_size(mut self, stack_size: u32) -> Self {
        self.header.stack_size = stack_size;
        self
    }

    /// Appends a string to the string table and returns its offset.
    pub fn add_string(&mut self, s: &str) -> u32 {
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        offset
    }

    /// Appends a pool item and returns its 1-based ordinal.
    pub fn push_pool_item(&mut self, item: PoolItem) -> u32 {
        self.pool.push(item);
        self.pool.len() as u32
    }

    pub fn from_manifest(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest_str(&text, dir)
    }

    /// Builds an image from a YAML manifest; file paths in it are relative
    /// to `dir`.
    pub fn from_manifest_str(text: &str, dir: &Path) -> Result<Self, Error> {
        let manifest: Manifest = serde_yaml::from_str(text)?;
        let read = |inline: Vec<u8>, file: Option<PathBuf>| -> Result<Vec<u8>, Error> {
            match file {
                Some(file) => Ok(fs::read(dir.join(file))?),
                None => Ok(inline),
            }
        };

        let code = read(manifest.code, manifest.code_file)?;
        let data = read(manifest.data, manifest.data_file)?;
        let mut image = Image::new(code, data, manifest.bss_size).with_stack_size(manifest.stack_size);
        for entry in manifest.pool {
            let meta = match &entry.name {
                Some(name) => image.add_string(name),
                None => entry.meta,
            };
            image.push_pool_item(PoolItem::new(entry.kind, entry.target, entry.offset, meta));
        }
        Ok(image)
    }
}

impl Executable for Image {
    fn header(&self) -> &Header {
        &self.header
    }

    fn copy_code(&self, dest: &mut [u8]) {
        let len = self.code.len().min(dest.len());
        dest[..len].copy_from_slice(&self.code[..len]);
    }

    fn copy_data(&self, dest: &mut [u8]) {
        let len = self.data.len().min(dest.len());
        dest[..len].copy_from_slice(&self.data[..len]);
    }

    fn string(&self, offset: u32) -> Option<String> {
        let tail = self.strings.get(offset as usize..)?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Some(String::from_utf8_lossy(&tail[..end]).into_owned())
    }

    fn pool_items(&self) -> &[PoolItem] {
        &self.pool
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    code: Vec<u8>,
    code_file: Option<PathBuf>,
    #[serde(default)]
    data: Vec<u8>,
    data_file: Option<PathBuf>,
    #[serde(default)]
    bss_size: u32,
    #[serde(default)]
    stack_size: u32,
    #[serde(default)]
    pool: Vec<ManifestItem>,
}

#[derive(Debug, Deserialize)]
struct ManifestItem {
    kind: PoolItemKind,
    #[serde(default)]
    target: u8,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    meta: u32,
    /// Symbol name, stored in the string table and referenced by `meta`.
    name: Option<String>,
}
