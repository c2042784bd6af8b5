//! Growable byte buffer shared by a part and every stream opened on it.

use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct BufferInner {
    data: RwLock<Vec<u8>>,
    /// Bumped by every mutation of `data`.
    generation: AtomicU64,
}

/// Reference-counted byte buffer.
///
/// Cloning the handle shares the same bytes. The bytes sit behind their
/// own reader/writer lock, independent of any stream cursor lock, so a
/// writer extending the buffer while a reader is mid-read is a benign
/// race: the reader observes either the old or the new length, never a
/// partially updated buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<BufferInner>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                data: RwLock::new(data),
                generation: AtomicU64::new(0),
            }),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.data.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation counter, used to skip rehashing untouched content.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Copy of the current content.
    pub fn to_vec(&self) -> Vec<u8> {
        self.inner.data.read().clone()
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.data.read())
    }

    /// Run `f` over the content while holding the read lock.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.inner.data.read())
    }

    /// A new buffer seeded with a copy of this one's content.
    pub fn duplicate(&self) -> SharedBuffer {
        SharedBuffer::from_vec(self.to_vec())
    }

    /// Whether both handles point at the same bytes.
    #[inline]
    pub fn ptr_eq(&self, other: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copy up to `max` bytes starting at `pos`.
    pub(crate) fn read_at(&self, pos: usize, max: usize) -> Bytes {
        let data = self.inner.data.read();
        if pos >= data.len() {
            return Bytes::new();
        }
        let end = pos + max.min(data.len() - pos);
        Bytes::copy_from_slice(&data[pos..end])
    }

    /// Copy into `out` starting at `pos`, returning the byte count.
    pub(crate) fn read_into(&self, pos: usize, out: &mut [u8]) -> usize {
        let data = self.inner.data.read();
        if pos >= data.len() {
            return 0;
        }
        let count = out.len().min(data.len() - pos);
        out[..count].copy_from_slice(&data[pos..pos + count]);
        count
    }

    /// Overwrite at `pos`, growing the buffer when the write runs past the
    /// end. A position past the end (left there by a concurrent truncate)
    /// zero-fills the gap.
    pub(crate) fn write_at(&self, pos: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut data = self.inner.data.write();
        let end = pos + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[pos..end].copy_from_slice(bytes);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Resize the content to exactly `len` bytes.
    pub(crate) fn truncate_to(&self, len: usize) {
        let mut data = self.inner.data.write();
        if data.len() != len {
            data.resize(len, 0);
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Swap in entirely new content.
    pub(crate) fn replace(&self, content: Vec<u8>) {
        let mut data = self.inner.data.write();
        *data = content;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_grows_and_overwrites() {
        let buf = SharedBuffer::new();
        buf.write_at(0, b"hello");
        buf.write_at(3, b"p me");
        assert_eq!(buf.to_vec(), b"help me");
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let buf = SharedBuffer::from_vec(b"ab".to_vec());
        buf.write_at(4, b"z");
        assert_eq!(buf.to_vec(), b"ab\0\0z");
    }

    #[test]
    fn test_read_at_clamps() {
        let buf = SharedBuffer::from_vec(b"abcdef".to_vec());
        assert_eq!(&buf.read_at(4, 10)[..], b"ef");
        assert!(buf.read_at(6, 10).is_empty());
        assert!(buf.read_at(100, 1).is_empty());
    }

    #[test]
    fn test_generation_tracks_mutation() {
        let buf = SharedBuffer::from_vec(b"abc".to_vec());
        let start = buf.generation();
        buf.truncate_to(3);
        assert_eq!(buf.generation(), start);
        buf.truncate_to(1);
        assert!(buf.generation() > start);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let buf = SharedBuffer::from_vec(b"abc".to_vec());
        let copy = buf.duplicate();
        copy.write_at(0, b"x");
        assert_eq!(buf.to_vec(), b"abc");
        assert!(!buf.ptr_eq(&copy));
        assert!(buf.ptr_eq(&buf.clone()));
    }
}
