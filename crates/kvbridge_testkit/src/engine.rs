//! A recording engine.
//!
//! Stands in for the native engine: it copies out every put it receives,
//! answers with a configurable status and reports configurable sizes.

use kvbridge_core::{Dbi, HandleKind, NativeEngine, NativeValue, PutFlags, RawTxn, Status};
use parking_lot::Mutex;

/// One put as the engine saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    /// Database handle.
    pub dbi: Dbi,
    /// Key bytes.
    pub key: Vec<u8>,
    /// Bytes of each data descriptor; empty for a null descriptor.
    pub data: Vec<Vec<u8>>,
    /// Length field of each data descriptor as received.
    pub lengths: Vec<usize>,
    /// Flags.
    pub flags: PutFlags,
}

/// An engine that records every put.
#[derive(Debug)]
pub struct RecordingEngine {
    puts: Mutex<Vec<RecordedPut>>,
    status: Mutex<Status>,
    handle_sizes: [usize; 5],
    max_key_size: Option<usize>,
    stored_limit: Option<usize>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            status: Mutex::new(Status::SUCCESS),
            handle_sizes: [192, 64, 96, 48, 40],
            max_key_size: None,
            stored_limit: None,
        }
    }
}

impl RecordingEngine {
    /// Creates an engine that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status returned by every put.
    #[must_use]
    pub fn with_status(self, status: Status) -> Self {
        *self.status.lock() = status;
        self
    }

    /// Sets the size reported for one handle kind.
    #[must_use]
    pub fn with_handle_size(mut self, kind: HandleKind, size: usize) -> Self {
        self.handle_sizes[kind.code() as usize] = size;
        self
    }

    /// Sets the engine's maximum key size.
    #[must_use]
    pub fn with_max_key_size(mut self, size: usize) -> Self {
        self.max_key_size = Some(size);
        self
    }

    /// Caps how many items a `MULTIPLE` put reports as stored.
    #[must_use]
    pub fn with_stored_limit(mut self, limit: usize) -> Self {
        self.stored_limit = Some(limit);
        self
    }

    /// Changes the status returned by later puts.
    pub fn set_status(&self, status: Status) {
        *self.status.lock() = status;
    }

    /// Returns all recorded puts.
    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().clone()
    }

    /// Returns the most recent put.
    pub fn last_put(&self) -> Option<RecordedPut> {
        self.puts.lock().last().cloned()
    }

    /// Returns the number of puts received.
    pub fn put_count(&self) -> usize {
        self.puts.lock().len()
    }

    /// Forgets all recorded puts.
    pub fn clear(&self) {
        self.puts.lock().clear();
    }
}

#[allow(unsafe_code)]
fn read(value: &NativeValue) -> Vec<u8> {
    // Puts only ever carry descriptors of live buffers, or null.
    unsafe { value.to_vec() }.unwrap_or_default()
}

impl NativeEngine for RecordingEngine {
    fn put(
        &self,
        _txn: *mut RawTxn,
        dbi: Dbi,
        key: &NativeValue,
        data: &mut [NativeValue],
        flags: PutFlags,
    ) -> Status {
        let recorded = RecordedPut {
            dbi,
            key: read(key),
            data: data.iter().map(read).collect(),
            lengths: data.iter().map(NativeValue::len).collect(),
            flags,
        };
        if flags.contains(PutFlags::MULTIPLE) && data.len() >= 2 {
            let requested = data[1].iov_len;
            data[1].iov_len = self.stored_limit.map_or(requested, |cap| requested.min(cap));
        }
        self.puts.lock().push(recorded);
        *self.status.lock()
    }

    fn handle_size(&self, kind: HandleKind) -> usize {
        self.handle_sizes[kind.code() as usize]
    }

    fn max_key_size(&self) -> Option<usize> {
        self.max_key_size
    }
}
