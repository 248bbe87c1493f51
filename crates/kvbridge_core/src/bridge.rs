//! Bridge facade.

use crate::config::Config;
use crate::error::MarshalResult;
use crate::format::{BoundedFormatter, FormatArg, Formatted};
use crate::handle::{self, HandleBuf, HandleKind};
use crate::log::{self, NativeLogLevel};
use crate::put::{self, BatchOutcome, Dbi, DupFixedBatch, NativeEngine, PutFlags, RawTxn};
use crate::region;
use crate::status::Status;
use crate::value::{self, BorrowedValue, HostValue, NativeValue};
use tracing::warn;

/// The marshaling layer bound to one engine.
///
/// `Bridge` owns the configuration and forwards each call to the matching
/// primitive, applying the configured limits on the way:
/// - key sizes are checked before any put reaches the engine
/// - duplicate data sizes are checked too when `Config::check_dup_data`
///   is set
/// - formatting and log forwarding use the configured staging limit and
///   overflow policy
///
/// ```rust
/// use kvbridge_core::{Bridge, Config, Dbi, HandleKind, NativeEngine, NativeValue, PutFlags, RawTxn, Status};
///
/// struct Null;
///
/// impl NativeEngine for Null {
///     fn put(&self, _: *mut RawTxn, _: Dbi, _: &NativeValue, _: &mut [NativeValue], _: PutFlags) -> Status {
///         Status::SUCCESS
///     }
///
///     fn handle_size(&self, _: HandleKind) -> usize {
///         64
///     }
/// }
///
/// let bridge = Bridge::new(Null, Config::new().max_key_size(4));
/// let txn = std::ptr::null_mut();
/// assert!(bridge.put_multiple(txn, 1, b"k".into(), b"a".into(), b"b".into(), PutFlags::UPSERT).is_ok());
/// assert!(bridge.put_multiple(txn, 1, b"long key".into(), b"a".into(), b"b".into(), PutFlags::UPSERT).is_err());
/// ```
#[derive(Debug)]
pub struct Bridge<E: NativeEngine> {
    engine: E,
    config: Config,
    formatter: BoundedFormatter,
}

impl<E: NativeEngine> Bridge<E> {
    /// Creates a bridge over `engine`.
    pub fn new(engine: E, config: Config) -> Self {
        Self {
            engine,
            formatter: BoundedFormatter::new(config.formatter),
            config,
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the formatter.
    pub fn formatter(&self) -> &BoundedFormatter {
        &self.formatter
    }

    /// Consumes the bridge, returning the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// See [`region::copy`].
    ///
    /// # Errors
    ///
    /// Returns an error if either range is out of bounds.
    pub fn copy(
        &self,
        source: &[u8],
        source_pos: usize,
        dest: &mut [u8],
        dest_pos: usize,
        length: usize,
    ) -> MarshalResult<()> {
        region::copy(source, source_pos, dest, dest_pos, length)
    }

    /// See [`region::shift`].
    ///
    /// # Errors
    ///
    /// Returns an error if either range is out of bounds.
    pub fn shift(
        &self,
        buf: &mut [u8],
        source_pos: usize,
        dest_pos: usize,
        length: usize,
    ) -> MarshalResult<()> {
        region::shift(buf, source_pos, dest_pos, length)
    }

    /// See [`value::map_value`].
    pub fn map_value(&self, native: NativeValue) -> HostValue {
        value::map_value(native)
    }

    /// See [`value::map_host_value`].
    pub fn map_host_value(&self, host: HostValue) -> NativeValue {
        value::map_host_value(host)
    }

    /// Returns the key size limit in force: the configured one, else the
    /// engine's.
    pub fn key_limit(&self) -> Option<usize> {
        self.config
            .max_key_size
            .or_else(|| self.engine.max_key_size())
    }

    /// Checks `key` against [`Bridge::key_limit`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::MarshalError::BadValSize`] if the key is null or
    /// too long. A null key is rejected even when no limit is known.
    pub fn check_key(&self, key: &NativeValue) -> MarshalResult<()> {
        key.check_size(self.key_limit().unwrap_or(usize::MAX))
    }

    /// Checks a sorted-duplicate data value against [`Bridge::key_limit`].
    ///
    /// Sorted duplicates are stored as nested keys and share the key limit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MarshalError::BadValSize`] if the value is null or
    /// too long.
    pub fn check_dup_value(&self, value: &NativeValue) -> MarshalResult<()> {
        value.check_size(self.key_limit().unwrap_or(usize::MAX))
    }

    /// Runs the configured size checks for one put.
    ///
    /// Under `MULTIPLE` only the first descriptor is data; the second
    /// carries a count.
    fn guard_put<I>(&self, key: &NativeValue, data: I, flags: PutFlags) -> MarshalResult<()>
    where
        I: IntoIterator<Item = NativeValue>,
    {
        let mut checked = Ok(());
        if self.config.check_key_size {
            checked = self.check_key(key);
        }
        if checked.is_ok() && self.config.check_dup_data {
            let data_values = if flags.contains(PutFlags::MULTIPLE) { 1 } else { usize::MAX };
            checked = data
                .into_iter()
                .take(data_values)
                .try_for_each(|value| self.check_dup_value(&value));
        }
        checked.inspect_err(|err| {
            warn!(%err, "put rejected before reaching the engine");
        })
    }

    /// Puts two values under `key` in one engine call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MarshalError::BadValSize`] if an enabled size check
    /// fails. Engine statuses are returned in `Ok`.
    pub fn put_multiple(
        &self,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: BorrowedValue<'_>,
        first: BorrowedValue<'_>,
        second: BorrowedValue<'_>,
        flags: PutFlags,
    ) -> MarshalResult<Status> {
        self.guard_put(&key.native(), [first.native(), second.native()], flags)?;
        Ok(put::put_multiple(
            &self.engine,
            txn,
            dbi,
            key,
            first,
            second,
            flags,
        ))
    }

    /// Puts an ordered sequence of values under `key` in one engine call.
    ///
    /// # Errors
    ///
    /// Returns a size error or [`crate::MarshalError::EmptyValueSequence`].
    pub fn put_values(
        &self,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: BorrowedValue<'_>,
        data: &[BorrowedValue<'_>],
        flags: PutFlags,
    ) -> MarshalResult<Status> {
        self.guard_put(&key.native(), data.iter().map(BorrowedValue::native), flags)?;
        put::put_values(&self.engine, txn, dbi, key, data, flags)
    }

    /// Descriptor-level put for callers holding raw value arrays.
    ///
    /// Descriptor updates made by the engine are left in `data`.
    ///
    /// # Errors
    ///
    /// Returns a size error or [`crate::MarshalError::EmptyValueSequence`].
    pub fn put_raw(
        &self,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: &NativeValue,
        data: &mut [NativeValue],
        flags: PutFlags,
    ) -> MarshalResult<Status> {
        self.guard_put(key, data.iter().copied(), flags)?;
        put::put_raw(&self.engine, txn, dbi, key, data, flags)
    }

    /// Stores a dup-fixed batch under `key`.
    ///
    /// # Errors
    ///
    /// Returns a size error.
    pub fn put_batch(
        &self,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: BorrowedValue<'_>,
        batch: &DupFixedBatch<'_>,
        flags: PutFlags,
    ) -> MarshalResult<BatchOutcome> {
        let element = batch.element(0).map(NativeValue::from_slice);
        self.guard_put(&key.native(), element, flags | PutFlags::MULTIPLE)?;
        Ok(batch.put(&self.engine, txn, dbi, key, flags))
    }

    /// See [`handle::copy_handle`].
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer is shorter than the engine's struct.
    pub fn copy_handle(
        &self,
        kind: HandleKind,
        src: &[u8],
        dst: &mut [u8],
    ) -> MarshalResult<Status> {
        handle::copy_handle(&self.engine, kind, src, dst)
    }

    /// Captures an owned copy of a handle's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `src` is shorter than the engine's struct.
    pub fn capture_handle(&self, kind: HandleKind, src: &[u8]) -> MarshalResult<HandleBuf> {
        HandleBuf::capture(&self.engine, kind, src)
    }

    /// Formats into `dest` under the configured limits.
    ///
    /// # Errors
    ///
    /// See [`BoundedFormatter::format_into`].
    pub fn format_into(
        &self,
        dest: &mut [u8],
        format: &[u8],
        args: &[FormatArg<'_>],
    ) -> MarshalResult<Formatted> {
        self.formatter.format_into(dest, format, args)
    }

    /// Forwards an engine log message to `tracing`.
    ///
    /// # Errors
    ///
    /// Returns the formatter's error if the message cannot be rendered.
    pub fn log_native(
        &self,
        level: NativeLogLevel,
        function: &str,
        line: u32,
        format: &[u8],
        args: &[FormatArg<'_>],
    ) -> MarshalResult<()> {
        log::log_native(&self.formatter, level, function, line, format, args)
    }
}
