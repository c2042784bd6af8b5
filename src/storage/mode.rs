use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// How a stream or sub-storage element is opened.
    ///
    /// Bit values follow the `ElementModes` constants of the office
    /// storage API so that mode words coming from a host can be passed
    /// straight through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ElementModes: u32 {
        const READ = 0x0001;
        const SEEKABLE = 0x0002;
        const WRITE = 0x0004;
        /// Empty the element on open.
        const TRUNCATE = 0x0008;
        /// Fail instead of creating a missing element.
        const NOCREATE = 0x0010;

        const SEEKABLEREAD = Self::SEEKABLE.bits() | Self::READ.bits();
        const READWRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl ElementModes {
    /// Whether an input side is handed out. `SEEKABLE` alone counts as
    /// a request to read.
    #[inline]
    pub fn wants_input(self) -> bool {
        self.intersects(Self::READ | Self::SEEKABLE)
    }

    /// Whether an output side is handed out.
    #[inline]
    pub fn wants_output(self) -> bool {
        self.intersects(Self::WRITE | Self::TRUNCATE)
    }

    /// Whether `READ` is set and nothing asks for write access.
    #[inline]
    pub fn is_read_only(self) -> bool {
        self.contains(Self::READ) && !self.wants_output()
    }

    /// Whether opening a missing element creates it.
    ///
    /// Every mode except the read-only ones and those carrying `NOCREATE`
    /// creates, including a bare `SEEKABLE`.
    #[inline]
    pub fn may_create(self) -> bool {
        (self.wants_input() || self.wants_output())
            && !self.is_read_only()
            && !self.contains(Self::NOCREATE)
    }
}

impl Default for ElementModes {
    fn default() -> Self {
        Self::READWRITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_policy() {
        assert!(ElementModes::READ.wants_input());
        assert!(!ElementModes::READ.wants_output());
        assert!(!ElementModes::READ.may_create());
        assert!(!ElementModes::SEEKABLEREAD.may_create());

        assert!(ElementModes::READWRITE.may_create());
        assert!(!(ElementModes::READWRITE | ElementModes::NOCREATE).may_create());

        let truncating = ElementModes::READWRITE | ElementModes::TRUNCATE;
        assert!(truncating.wants_input());
        assert!(truncating.wants_output());
        assert!(truncating.may_create());

        assert!(ElementModes::TRUNCATE.wants_output());
        assert!(!ElementModes::WRITE.wants_input());
    }

    #[test]
    fn test_bare_seekable_reads_and_creates() {
        let seekable = ElementModes::SEEKABLE;
        assert!(seekable.wants_input());
        assert!(!seekable.wants_output());
        assert!(!seekable.is_read_only());
        assert!(seekable.may_create());
        assert!(!(seekable | ElementModes::NOCREATE).may_create());

        assert!(ElementModes::SEEKABLEREAD.is_read_only());
        assert!(!ElementModes::empty().may_create());
        assert!(!ElementModes::NOCREATE.may_create());
    }

    #[test]
    fn test_raw_bits() {
        assert_eq!(ElementModes::READWRITE.bits(), 5);
        assert_eq!(
            ElementModes::from_bits_truncate(0x1D),
            ElementModes::READWRITE | ElementModes::TRUNCATE | ElementModes::NOCREATE
        );
    }
}
