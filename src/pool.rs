//! Constant pool (`DATA` section): seven independently-typed arrays
//! read in a fixed order, each individually 4-byte aligned.

use crate::reader::{Reader, TjsRead};
use anyhow::{ensure, Context, Result};
use serde::Serialize;

pub const DATA_TAG: u32 = 0x4154_4144; // 'DATA' little-endian

#[derive(Debug, Default, Clone, Serialize)]
pub struct ConstantPool {
    pub bytes: Vec<u8>,
    pub shorts: Vec<u16>,
    pub ints: Vec<i32>,
    pub longs: Vec<i64>,
    pub doubles: Vec<f64>,
    pub strings: Vec<String>,
    pub octets: Vec<Vec<u8>>,
}

impl ConstantPool {
    pub fn read(r: &mut Reader) -> Result<Self> {
        let tag = r.read_u32()?;
        let _size = r.read_u32()?;
        ensure!(
            tag == DATA_TAG,
            "InvalidFormat: expected DATA tag, got {:#010x}",
            tag
        );

        let mut pool = ConstantPool::default();

        let count = r.read_i32()?;
        if count > 0 {
            let count = count as usize;
            pool.bytes = r.read_bytes(count)?;
            let stride = (count + 3) >> 2;
            r.skip(stride * 4 - count)?;
        }

        let count = r.read_i32()?;
        if count > 0 {
            for _ in 0..count {
                pool.shorts.push(r.read_u16()?);
            }
            if count & 1 != 0 {
                r.skip(2)?;
            }
        }

        let count = r.read_i32()?;
        if count > 0 {
            for _ in 0..count {
                pool.ints.push(r.read_i32()?);
            }
        }

        let count = r.read_i32()?;
        if count > 0 {
            for _ in 0..count {
                pool.longs.push(r.read_u64()? as i64);
            }
        }

        let count = r.read_i32()?;
        if count > 0 {
            for _ in 0..count {
                pool.doubles.push(r.read_f64()?);
            }
        }

        let count = r.read_i32()?;
        if count > 0 {
            for _ in 0..count {
                let len = r.read_i32()?;
                ensure!(len >= 0, "InvalidFormat: negative string length");
                let raw = r.read_bytes(len as usize * 2)?;
                let value = decode_utf16_le(&raw);
                pool.strings.push(value);
                if len & 1 != 0 {
                    r.skip(2)?;
                }
            }
        }

        let count = r.read_i32()?;
        if count > 0 {
            for _ in 0..count {
                let len = r.read_i32()?;
                ensure!(len >= 0, "InvalidFormat: negative octet length");
                let len = len as usize;
                let data = r.read_bytes(len).context("reading octet constant")?;
                pool.octets.push(data);
                let stride = (len + 3) >> 2;
                r.skip(stride * 4 - len)?;
            }
        }

        Ok(pool)
    }

    pub fn string_at(&self, idx: i32) -> Option<&str> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
    }

    pub fn byte_at(&self, idx: i32) -> Option<u8> {
        usize::try_from(idx).ok().and_then(|i| self.bytes.get(i)).copied()
    }

    pub fn short_at(&self, idx: i32) -> Option<u16> {
        usize::try_from(idx).ok().and_then(|i| self.shorts.get(i)).copied()
    }

    pub fn int_at(&self, idx: i32) -> Option<i32> {
        usize::try_from(idx).ok().and_then(|i| self.ints.get(i)).copied()
    }

    pub fn long_at(&self, idx: i32) -> Option<i64> {
        usize::try_from(idx).ok().and_then(|i| self.longs.get(i)).copied()
    }

    pub fn double_at(&self, idx: i32) -> Option<f64> {
        usize::try_from(idx).ok().and_then(|i| self.doubles.get(i)).copied()
    }

    pub fn octet_at(&self, idx: i32) -> Option<&[u8]> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.octets.get(i))
            .map(Vec::as_slice)
    }
}

/// Decode a UTF-16LE byte run, falling back to a `hex:`-prefixed dump of
/// the raw bytes when the data isn't valid UTF-16 (unpaired surrogates).
fn decode_utf16_le(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    match String::from_utf16(&units) {
        Ok(s) => s,
        Err(_) => format!("hex:{}", hex_encode(raw)),
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_one_short(value: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&DATA_TAG.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // size, unused
        data.extend_from_slice(&0i32.to_le_bytes()); // byte count
        data.extend_from_slice(&1i32.to_le_bytes()); // short count
        data.extend_from_slice(&value.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes()); // pad to 4 bytes
        data.extend_from_slice(&0i32.to_le_bytes()); // int count
        data.extend_from_slice(&0i32.to_le_bytes()); // long count
        data.extend_from_slice(&0i32.to_le_bytes()); // double count
        data.extend_from_slice(&0i32.to_le_bytes()); // string count
        data.extend_from_slice(&0i32.to_le_bytes()); // octet count
        data
    }

    #[test]
    fn reads_single_short() {
        let data = pool_with_one_short(42);
        let mut r = Reader::new(&data);
        let pool = ConstantPool::read(&mut r).unwrap();
        assert_eq!(pool.shorts, vec![42]);
    }

    #[test]
    fn rejects_bad_tag() {
        let mut data = pool_with_one_short(1);
        data[0] = 0;
        let mut r = Reader::new(&data);
        assert!(ConstantPool::read(&mut r).is_err());
    }

    #[test]
    fn string_decode_falls_back_to_hex_on_bad_utf16() {
        let raw = [0x00, 0xd8, 0x00, 0x00]; // unpaired high surrogate
        let s = decode_utf16_le(&raw);
        assert!(s.starts_with("hex:"));
    }

    #[test]
    fn string_decode_handles_valid_utf16() {
        let raw = "hi".encode_utf16().flat_map(|u| u.to_le_bytes()).collect::<Vec<_>>();
        assert_eq!(decode_utf16_le(&raw), "hi");
    }
}
