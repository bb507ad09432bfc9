//! Little-endian cursor over an in-memory byte buffer.
//!
//! A trait extending `Read` with the primitive decodes this format
//! needs, implemented for any `Read`, plus a concrete slice-backed
//! cursor used everywhere in this crate (the file is loaded whole;
//! there is no streaming reader).

use anyhow::{ensure, Result};
use std::io::{Read, Seek, SeekFrom};

pub trait TjsRead: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read> TjsRead for R {}

/// Owning cursor over the whole input file. All reads are fatal
/// (`Truncated`) on short input; there is no partial-read recovery.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn seek_to(&mut self, pos: usize) -> Result<()> {
        ensure!(pos <= self.data.len(), "seek past end of buffer");
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| anyhow::anyhow!("Truncated: skip past end of buffer"))?;
        self.pos = end;
        Ok(())
    }

    /// Pad the cursor forward so it sits on a 4-byte boundary relative
    /// to the start of the buffer.
    pub fn align4(&mut self) -> Result<()> {
        let rem = self.pos % 4;
        if rem != 0 {
            self.skip(4 - rem)?;
        }
        Ok(())
    }
}

impl Read for Reader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let avail = &self.data[self.pos..];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        self.pos += n;
        Ok(n)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        if self.pos + buf.len() > self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Truncated: read past end of buffer",
            ));
        }
        let n = buf.len();
        buf.copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(())
    }
}

impl Seek for Reader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 || new_pos as usize > self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek out of bounds",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_le_primitives() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert_eq!(r.read_u32().unwrap(), 2);
    }

    #[test]
    fn truncated_read_is_fatal() {
        let data = [0x01];
        let mut r = Reader::new(&data);
        assert!(r.read_u32().is_err());
    }

    #[test]
    fn align4_pads_to_boundary() {
        let data = [0u8; 16];
        let mut r = Reader::new(&data);
        r.skip(3).unwrap();
        r.align4().unwrap();
        assert_eq!(r.tell(), 4);
        r.align4().unwrap();
        assert_eq!(r.tell(), 4);
    }
}
