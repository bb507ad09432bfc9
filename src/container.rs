//! Top-level file parsing: header validation and section dispatch.
//!
//! TJS2 bytecode has exactly one header shape, so this is a single
//! linear `read`, not a format-sniffing dispatcher.

use crate::object::ObjectArea;
use crate::pool::ConstantPool;
use crate::reader::{Reader, TjsRead};
use anyhow::{ensure, Result};

pub const FILE_TAG: u32 = 0x3253_4A54; // 'TJS2' little-endian
pub const VER_TAG: u32 = 0x0030_3031; // '100\0' little-endian

/// A fully loaded bytecode file: its constant pool and the flat
/// collection of code contexts it defines.
pub struct BytecodeFile {
    pub pool: ConstantPool,
    pub top_level: Option<usize>,
    pub objects: Vec<crate::object::CodeContext>,
}

impl BytecodeFile {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);

        let tag = r.read_u32()?;
        ensure!(tag == FILE_TAG, "InvalidFormat: not a TJS2 bytecode file");
        let ver = r.read_u32()?;
        ensure!(ver == VER_TAG, "InvalidFormat: unsupported bytecode version");

        let declared_size = r.read_i32()?;
        ensure!(
            declared_size >= 0 && declared_size as usize == data.len(),
            "Truncated: declared file size {} does not match buffer length {}",
            declared_size,
            data.len()
        );

        let pool = ConstantPool::read(&mut r)?;
        let objs = ObjectArea::read(&mut r, &pool)?;

        Ok(BytecodeFile {
            pool,
            top_level: objs.top_level,
            objects: objs.objects,
        })
    }

    pub fn is_tjs2_bytecode(data: &[u8]) -> bool {
        if data.len() < 8 {
            return false;
        }
        let tag = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let ver = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        tag == FILE_TAG && ver == VER_TAG
    }
}
