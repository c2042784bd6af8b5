//! Read cursor over a shared buffer.

use crate::error::{Result, StorageError};
use crate::stream::buffer::SharedBuffer;
use crate::stream::traits::{Readable, Seekable};
use bytes::Bytes;
use parking_lot::Mutex;
use std::io;

/// Input stream over a part's bytes.
///
/// Holds its own cursor; the bytes are shared with the part and with any
/// output stream opened on it, so writes show up on the next read.
#[derive(Debug)]
pub struct VecInputStream {
    buffer: SharedBuffer,
    pos: Mutex<usize>,
}

impl VecInputStream {
    pub fn new(buffer: SharedBuffer) -> Self {
        Self {
            buffer,
            pos: Mutex::new(0),
        }
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }
}

impl Readable for VecInputStream {
    fn read_bytes(&self, max: usize) -> Bytes {
        let mut pos = self.pos.lock();
        let chunk = self.buffer.read_at(*pos, max);
        *pos += chunk.len();
        chunk
    }

    fn read_into(&self, buf: &mut [u8]) -> usize {
        let mut pos = self.pos.lock();
        let count = self.buffer.read_into(*pos, buf);
        *pos += count;
        count
    }

    fn skip_bytes(&self, n: usize) -> usize {
        let mut pos = self.pos.lock();
        let skipped = n.min(self.buffer.len().saturating_sub(*pos));
        *pos += skipped;
        skipped
    }

    fn available(&self) -> usize {
        let pos = self.pos.lock();
        self.buffer.len().saturating_sub(*pos)
    }
}

impl Seekable for VecInputStream {
    fn seek_to(&self, location: i64) -> Result<()> {
        let mut pos = self.pos.lock();
        *pos = checked_location(location, self.buffer.len())?;
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(*self.pos.lock() as u64)
    }

    fn length(&self) -> Result<u64> {
        Ok(self.buffer.len() as u64)
    }
}

/// Validate a seek target against the current content length.
pub(crate) fn checked_location(location: i64, len: usize) -> Result<usize> {
    usize::try_from(location)
        .ok()
        .filter(|&loc| loc <= len)
        .ok_or_else(|| {
            StorageError::InvalidArgument(format!(
                "seek location {location} outside 0..={len}"
            ))
        })
}

/// Resolve an `io::SeekFrom` to an absolute location.
pub(crate) fn resolve_seek_from(from: io::SeekFrom, current: usize, len: usize) -> i64 {
    match from {
        io::SeekFrom::Start(off) => i64::try_from(off).unwrap_or(i64::MAX),
        io::SeekFrom::End(off) => (len as i64).saturating_add(off),
        io::SeekFrom::Current(off) => (current as i64).saturating_add(off),
    }
}

impl io::Read for &VecInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

impl io::Read for VecInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

impl io::Seek for VecInputStream {
    fn seek(&mut self, from: io::SeekFrom) -> io::Result<u64> {
        let current = *self.pos.lock();
        let target = resolve_seek_from(from, current, self.buffer.len());
        self.seek_to(target)?;
        Ok(target as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    fn stream(content: &[u8]) -> VecInputStream {
        VecInputStream::new(SharedBuffer::from_vec(content.to_vec()))
    }

    #[test]
    fn test_read_advances_cursor() {
        let input = stream(b"abcdef");
        assert_eq!(&input.read_bytes(4)[..], b"abcd");
        assert_eq!(input.position().unwrap(), 4);
        assert_eq!(input.available(), 2);
        assert_eq!(&input.read_bytes(10)[..], b"ef");
        assert!(input.read_bytes(10).is_empty());
    }

    #[test]
    fn test_skip_clamps() {
        let input = stream(b"abc");
        assert_eq!(input.skip_bytes(2), 2);
        assert_eq!(input.skip_bytes(5), 1);
        assert_eq!(input.available(), 0);
    }

    #[test]
    fn test_seek_bounds() {
        let input = stream(b"abc");
        input.seek_to(3).unwrap();
        assert_eq!(input.available(), 0);
        assert!(input.seek_to(4).unwrap_err().is_invalid_argument());
        assert!(input.seek_to(-1).unwrap_err().is_invalid_argument());
        assert_eq!(input.position().unwrap(), 3);
    }

    #[test]
    fn test_sees_shared_writes() {
        let buffer = SharedBuffer::from_vec(b"ab".to_vec());
        let input = VecInputStream::new(buffer.clone());
        input.skip_bytes(2);
        buffer.write_at(2, b"cd");
        assert_eq!(&input.read_bytes(8)[..], b"cd");
    }

    #[test]
    fn test_io_traits() {
        let mut input = stream(b"hello world");
        input.seek(SeekFrom::End(-5)).unwrap();
        let mut out = String::new();
        input.read_to_string(&mut out).unwrap();
        assert_eq!(out, "world");

        let err = input.seek(SeekFrom::Current(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
