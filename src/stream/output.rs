//! Write cursor over a shared buffer.

use crate::error::Result;
use crate::stream::buffer::SharedBuffer;
use crate::stream::input::{checked_location, resolve_seek_from};
use crate::stream::traits::{Seekable, Writable};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts one live writer on a part for as long as it is held.
#[derive(Debug)]
pub(crate) struct WriteRef {
    count: Arc<AtomicUsize>,
}

impl WriteRef {
    pub(crate) fn acquire(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self {
            count: Arc::clone(count),
        }
    }
}

impl Drop for WriteRef {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Output stream over a part's bytes.
///
/// Writing starts at offset 0 and overwrites in place. The content is
/// only cut back to the cursor on [`Writable::flush_output`] or
/// [`Writable::close_output`], so writing a short payload over a long one
/// leaves the old tail in place until then.
#[derive(Debug)]
pub struct VecOutputStream {
    buffer: SharedBuffer,
    pos: Mutex<usize>,
    _write_ref: Option<WriteRef>,
}

impl VecOutputStream {
    pub fn new(buffer: SharedBuffer) -> Self {
        Self {
            buffer,
            pos: Mutex::new(0),
            _write_ref: None,
        }
    }

    /// Stream that counts as an open writer on `count` until dropped.
    pub(crate) fn tracked(buffer: SharedBuffer, count: &Arc<AtomicUsize>) -> Self {
        Self {
            buffer,
            pos: Mutex::new(0),
            _write_ref: Some(WriteRef::acquire(count)),
        }
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }
}

impl Writable for VecOutputStream {
    fn write_bytes(&self, data: &[u8]) {
        let mut pos = self.pos.lock();
        self.buffer.write_at(*pos, data);
        *pos += data.len();
    }

    fn flush_output(&self) {
        let pos = self.pos.lock();
        self.buffer.truncate_to(*pos);
    }
}

impl Seekable for VecOutputStream {
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

impl io::Write for &VecOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_output();
        Ok(())
    }
}

impl io::Write for VecOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_output();
        Ok(())
    }
}

impl io::Seek for VecOutputStream {
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
    use std::io::Write;

    #[test]
    fn test_overwrite_then_flush_truncates() {
        let buffer = SharedBuffer::from_vec(b"old long content".to_vec());
        let out = VecOutputStream::new(buffer.clone());
        out.write_bytes(b"new");
        assert_eq!(buffer.to_vec(), b"new long content");

        out.flush_output();
        assert_eq!(buffer.to_vec(), b"new");
        assert_eq!(out.length().unwrap(), 3);
    }

    #[test]
    fn test_seek_and_patch() {
        let buffer = SharedBuffer::new();
        let out = VecOutputStream::new(buffer.clone());
        out.write_bytes(b"hello world");
        out.seek_to(6).unwrap();
        out.write_bytes(b"there");
        out.close_output();
        assert_eq!(buffer.to_vec(), b"hello there");
        assert!(out.seek_to(12).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_write_ref_released_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let first = VecOutputStream::tracked(SharedBuffer::new(), &count);
        let second = VecOutputStream::tracked(SharedBuffer::new(), &count);
        assert_eq!(count.load(Ordering::Acquire), 2);
        drop(first);
        assert_eq!(count.load(Ordering::Acquire), 1);
        drop(second);
        assert_eq!(count.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_io_write() {
        let buffer = SharedBuffer::new();
        let mut out = VecOutputStream::new(buffer.clone());
        write!(out, "{}-{}", "a", 1).unwrap();
        out.flush().unwrap();
        assert_eq!(buffer.to_vec(), b"a-1");
    }
}
