//! Test fixtures.
//!
//! Provides buffers that detect writes outside their body and helpers for
//! building bridges over a [`RecordingEngine`].

use crate::engine::RecordingEngine;
use kvbridge_core::{Bridge, Config};

/// Byte pattern written into guard zones.
pub const GUARD_BYTE: u8 = 0xA5;

/// Default guard zone size on each side of the body.
pub const GUARD_LEN: usize = 32;

/// A buffer with guard zones on both sides of its body.
///
/// Operations run against [`GuardedBuffer::body_mut`]; afterwards
/// [`GuardedBuffer::guards_intact`] tells whether anything wrote past
/// either end.
#[derive(Debug, Clone)]
pub struct GuardedBuffer {
    bytes: Vec<u8>,
    guard: usize,
    len: usize,
}

impl GuardedBuffer {
    /// Creates a zero-filled body of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self::filled(len, 0)
    }

    /// Creates a body of `len` bytes set to `fill`.
    pub fn filled(len: usize, fill: u8) -> Self {
        let mut bytes = vec![GUARD_BYTE; len + 2 * GUARD_LEN];
        bytes[GUARD_LEN..GUARD_LEN + len].fill(fill);
        Self {
            bytes,
            guard: GUARD_LEN,
            len,
        }
    }

    /// Creates a body holding a copy of `content`.
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut buf = Self::new(content.len());
        buf.body_mut().copy_from_slice(content);
        buf
    }

    /// Returns the body.
    pub fn body(&self) -> &[u8] {
        &self.bytes[self.guard..self.guard + self.len]
    }

    /// Returns the body mutably.
    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.guard..self.guard + self.len]
    }

    /// Returns the body length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if neither guard zone was touched.
    pub fn guards_intact(&self) -> bool {
        let (front, rest) = self.bytes.split_at(self.guard);
        let back = &rest[self.len..];
        front.iter().chain(back).all(|&b| b == GUARD_BYTE)
    }
}

/// Creates a bridge over a fresh recording engine.
pub fn recording_bridge() -> Bridge<RecordingEngine> {
    Bridge::new(RecordingEngine::new(), Config::default())
}

/// Creates a bridge over `engine` with `config`.
pub fn bridge_with(engine: RecordingEngine, config: Config) -> Bridge<RecordingEngine> {
    Bridge::new(engine, config)
}

/// Returns `len` bytes counting up from `start`, wrapping at 256.
pub fn pattern(len: usize, start: u8) -> Vec<u8> {
    (0..len).map(|i| start.wrapping_add(i as u8)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_detect_overrun() {
        let mut buf = GuardedBuffer::from_bytes(b"abc");
        assert!(buf.guards_intact());
        assert_eq!(buf.body(), b"abc");

        buf.body_mut()[2] = b'z';
        assert!(buf.guards_intact());

        buf.bytes[GUARD_LEN + 3] = 0;
        assert!(!buf.guards_intact());
    }

    #[test]
    fn empty_body_has_guards() {
        let buf = GuardedBuffer::new(0);
        assert!(buf.is_empty());
        assert!(buf.guards_intact());
    }

    #[test]
    fn pattern_wraps() {
        assert_eq!(pattern(3, 254), vec![254, 255, 0]);
    }
}
