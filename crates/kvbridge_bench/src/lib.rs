//! Benchmark utilities.

use kvbridge_core::{Dbi, HandleKind, NativeEngine, NativeValue, PutFlags, RawTxn, Status};
use rand::Rng;

/// Generate random value bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` random values of `size` bytes each.
pub fn random_values(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(size)).collect()
}

/// Generate a random lowercase message of `len` bytes.
pub fn random_text(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z')).collect()
}

/// An engine that accepts every put without touching the data.
///
/// Keeps the measured cost on the marshaling side.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinkEngine;

impl NativeEngine for SinkEngine {
    fn put(
        &self,
        _txn: *mut RawTxn,
        _dbi: Dbi,
        _key: &NativeValue,
        _data: &mut [NativeValue],
        _flags: PutFlags,
    ) -> Status {
        Status::SUCCESS
    }

    fn handle_size(&self, kind: HandleKind) -> usize {
        match kind {
            HandleKind::Cursor => 192,
            _ => 64,
        }
    }

    fn max_key_size(&self) -> Option<usize> {
        Some(511)
    }
}
