//! Bounded printf-style formatting.
//!
//! Formatting runs in two passes over the same renderer. The first pass only
//! measures the rendered length. The second renders into a staging vector
//! allocated for this call with a capacity of `min(required, limit)`, where
//! `limit` is the configured staging limit clamped to [`MAX_STAGING_LIMIT`].
//! The staging vector refuses bytes past that limit, so it never grows and
//! is never shared between calls.
//!
//! # Overflow policy
//!
//! - [`OverflowPolicy::Truncate`] (default): staging keeps its first
//!   `staging_limit` bytes, and the destination receives at most
//!   `capacity - 1` of them plus a NUL terminator. The result reports
//!   `truncated` and the full `required` length.
//! - [`OverflowPolicy::Reject`]: output that does not fit fails with
//!   [`MarshalError::StagingOverflow`] or [`MarshalError::BufferTooSmall`]
//!   before the destination is written.
//!
//! A zero-capacity destination always fails: there is no room for the
//! terminator.
//!
//! # Directives
//!
//! `%[flags][width][.precision][length]conversion` with flags `-0+ #`, `*`
//! for width and precision, length modifiers `hh h l ll L q j z t`, and
//! conversions `d i u x X o c s p f F e E g G`. Float precision is capped at
//! 1074 digits, past which every digit of an `f64` is zero.
//!
//! Arguments are typed and 64 bits wide. `hh` and `h` narrow an integer
//! conversion to 8 and 16 bits, sign-extending for `d` and `i`. Every other
//! modifier, and no modifier at all, renders the full 64-bit argument, so
//! `%x` of `Int(-1)` is `ffffffffffffffff` where C's `int` would give
//! `ffffffff`. Callers passing 32-bit values narrow them when building the
//! argument.

use crate::error::{MarshalError, MarshalResult};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Default staging limit in bytes.
pub const DEFAULT_STAGING_LIMIT: usize = 16 * 1024;

/// Largest staging limit a formatter honours. Larger configured limits are
/// clamped to it.
pub const MAX_STAGING_LIMIT: usize = 1024 * 1024;

const MAX_FLOAT_PRECISION: usize = 1074;

/// What to do when rendered text does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Keep the prefix that fits and report truncation.
    #[default]
    Truncate,
    /// Fail without writing the destination.
    Reject,
}

/// Formatter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Maximum number of bytes the staging buffer may hold.
    pub staging_limit: usize,

    /// Behaviour when the output does not fit.
    pub overflow: OverflowPolicy,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            staging_limit: DEFAULT_STAGING_LIMIT,
            overflow: OverflowPolicy::Truncate,
        }
    }
}

impl FormatterConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staging limit.
    #[must_use]
    pub const fn staging_limit(mut self, limit: usize) -> Self {
        self.staging_limit = limit;
        self
    }

    /// Returns the staging limit in force, at most [`MAX_STAGING_LIMIT`].
    #[must_use]
    pub const fn effective_staging_limit(&self) -> usize {
        if self.staging_limit < MAX_STAGING_LIMIT {
            self.staging_limit
        } else {
            MAX_STAGING_LIMIT
        }
    }

    /// Sets the overflow policy.
    #[must_use]
    pub const fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }
}

/// A typed format argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatArg<'a> {
    /// Signed integer (`%d`, `%i`, also `*` widths).
    Int(i64),
    /// Unsigned integer (`%u`, `%x`, `%X`, `%o`).
    UInt(u64),
    /// Floating point (`%f`, `%e`, `%g`).
    Double(f64),
    /// Single byte (`%c`).
    Char(u8),
    /// Byte string (`%s`), not NUL-terminated.
    Str(&'a [u8]),
    /// Address (`%p`).
    Ptr(usize),
}

impl From<i32> for FormatArg<'_> {
    fn from(value: i32) -> Self {
        FormatArg::Int(value.into())
    }
}

impl From<i64> for FormatArg<'_> {
    fn from(value: i64) -> Self {
        FormatArg::Int(value)
    }
}

impl From<u32> for FormatArg<'_> {
    fn from(value: u32) -> Self {
        FormatArg::UInt(value.into())
    }
}

impl From<u64> for FormatArg<'_> {
    fn from(value: u64) -> Self {
        FormatArg::UInt(value)
    }
}

impl From<usize> for FormatArg<'_> {
    fn from(value: usize) -> Self {
        FormatArg::UInt(value as u64)
    }
}

impl From<f64> for FormatArg<'_> {
    fn from(value: f64) -> Self {
        FormatArg::Double(value)
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(value: &'a str) -> Self {
        FormatArg::Str(value.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for FormatArg<'a> {
    fn from(value: &'a [u8]) -> Self {
        FormatArg::Str(value)
    }
}

/// Outcome of formatting into a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatted {
    /// Bytes written before the NUL terminator.
    pub written: usize,
    /// Full rendered length, excluding the terminator.
    pub required: usize,
    /// True if fewer than `required` bytes were written.
    pub truncated: bool,
}

/// Rendered text held in a call-local staging buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    bytes: Vec<u8>,
    required: usize,
    truncated: bool,
}

impl Staged {
    /// Returns the staged bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the staging buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the full rendered length.
    #[must_use]
    pub const fn required(&self) -> usize {
        self.required
    }

    /// Returns true if the staging limit cut the text short.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the staged length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the staged bytes as text, replacing invalid UTF-8.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Renders format strings into bounded destinations.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedFormatter {
    config: FormatterConfig,
}

impl BoundedFormatter {
    /// Creates a formatter.
    #[must_use]
    pub const fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Returns the rendered length without writing anything.
    ///
    /// # Errors
    ///
    /// Returns a format error if a directive or argument is invalid.
    pub fn measure(&self, format: &[u8], args: &[FormatArg<'_>]) -> MarshalResult<usize> {
        let mut measure = Measure::default();
        render(format, args, &mut measure)?;
        Ok(measure.len)
    }

    /// Renders into a staging buffer, applying the staging limit.
    ///
    /// # Errors
    ///
    /// Returns a format error, or [`MarshalError::StagingOverflow`] under
    /// [`OverflowPolicy::Reject`].
    pub fn render(&self, format: &[u8], args: &[FormatArg<'_>]) -> MarshalResult<Staged> {
        let required = self.measure(format, args)?;
        self.stage(required, |staging| render(format, args, staging))
    }

    /// Renders into `dest`, whose length is its capacity, and terminates the
    /// output with a NUL byte.
    ///
    /// Bytes of `dest` after the terminator are never written.
    ///
    /// # Errors
    ///
    /// Returns a format error, or an overflow error as described in the
    /// module documentation. `dest` is untouched on error.
    pub fn format_into(
        &self,
        dest: &mut [u8],
        format: &[u8],
        args: &[FormatArg<'_>],
    ) -> MarshalResult<Formatted> {
        let required = self.measure(format, args)?;
        self.check_destination(required, dest.len())?;
        let staged = self.stage(required, |staging| render(format, args, staging))?;
        Ok(place(&staged, dest))
    }

    /// Renders Rust format arguments into `dest` with the same bounds as
    /// [`BoundedFormatter::format_into`].
    ///
    /// # Errors
    ///
    /// Returns an overflow error, or [`MarshalError::InvalidFormat`] if a
    /// formatting trait implementation fails.
    pub fn format_args_into(
        &self,
        dest: &mut [u8],
        args: fmt::Arguments<'_>,
    ) -> MarshalResult<Formatted> {
        let mut measure = Measure::default();
        fmt::write(&mut measure, args).map_err(|_| trait_failure())?;
        self.check_destination(measure.len, dest.len())?;
        let staged = self.stage(measure.len, |staging| {
            fmt::write(staging, args).map_err(|_| trait_failure())
        })?;
        Ok(place(&staged, dest))
    }

    fn check_destination(&self, required: usize, capacity: usize) -> MarshalResult<()> {
        let overflows = required >= capacity && self.config.overflow == OverflowPolicy::Reject;
        if capacity == 0 || overflows {
            return Err(MarshalError::BufferTooSmall {
                required: required.saturating_add(1),
                capacity,
            });
        }
        Ok(())
    }

    fn stage(
        &self,
        required: usize,
        fill: impl FnOnce(&mut Staging) -> MarshalResult<()>,
    ) -> MarshalResult<Staged> {
        let limit = self.config.effective_staging_limit();
        if required > limit && self.config.overflow == OverflowPolicy::Reject {
            return Err(MarshalError::StagingOverflow { required, limit });
        }
        let mut staging = Staging::with_limit(required.min(limit));
        fill(&mut staging)?;
        if staging.truncated {
            debug!(required, limit, "formatted output truncated at staging limit");
        }
        Ok(Staged {
            bytes: staging.buf,
            required,
            truncated: staging.truncated,
        })
    }
}

/// Formats into `dest` with the default configuration.
///
/// # Errors
///
/// See [`BoundedFormatter::format_into`].
pub fn format_bounded(
    dest: &mut [u8],
    format: &[u8],
    args: &[FormatArg<'_>],
) -> MarshalResult<Formatted> {
    BoundedFormatter::default().format_into(dest, format, args)
}

fn trait_failure() -> MarshalError {
    MarshalError::InvalidFormat {
        position: 0,
        reason: "a formatting trait implementation returned an error",
    }
}

/// Copies staged bytes into a non-empty destination and terminates them.
fn place(staged: &Staged, dest: &mut [u8]) -> Formatted {
    let written = staged.bytes.len().min(dest.len() - 1);
    dest[..written].copy_from_slice(&staged.bytes[..written]);
    dest[written] = 0;
    Formatted {
        written,
        required: staged.required,
        truncated: staged.truncated || written < staged.bytes.len(),
    }
}

trait Sink {
    fn push(&mut self, bytes: &[u8]);
    fn repeat(&mut self, byte: u8, count: usize);
}

#[derive(Default)]
struct Measure {
    len: usize,
}

impl Sink for Measure {
    fn push(&mut self, bytes: &[u8]) {
        self.len = self.len.saturating_add(bytes.len());
    }

    fn repeat(&mut self, _byte: u8, count: usize) {
        self.len = self.len.saturating_add(count);
    }
}

impl fmt::Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}

struct Staging {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Staging {
    fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit),
            limit,
            truncated: false,
        }
    }

    fn room(&self) -> usize {
        self.limit - self.buf.len()
    }
}

impl Sink for Staging {
    fn push(&mut self, bytes: &[u8]) {
        let take = bytes.len().min(self.room());
        self.buf.extend_from_slice(&bytes[..take]);
        self.truncated |= take < bytes.len();
    }

    fn repeat(&mut self, byte: u8, count: usize) {
        let take = count.min(self.room());
        self.buf.resize(self.buf.len() + take, byte);
        self.truncated |= take < count;
    }
}

impl fmt::Write for Staging {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}

/// Integer width selected by a length modifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Length {
    #[default]
    Full,
    Short,
    Byte,
}

impl Length {
    fn signed(self, value: i64) -> i64 {
        match self {
            Length::Full => value,
            Length::Short => i64::from(value as i16),
            Length::Byte => i64::from(value as i8),
        }
    }

    fn unsigned(self, value: u64) -> u64 {
        match self {
            Length::Full => value,
            Length::Short => u64::from(value as u16),
            Length::Byte => u64::from(value as u8),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
    length: Length,
    conversion: u8,
}

struct Args<'s, 'a> {
    args: &'s [FormatArg<'a>],
    next: usize,
}

impl<'a> Args<'_, 'a> {
    fn next(&mut self) -> MarshalResult<(usize, FormatArg<'a>)> {
        let index = self.next;
        let arg = self
            .args
            .get(index)
            .copied()
            .ok_or(MarshalError::MissingArgument { index })?;
        self.next += 1;
        Ok((index, arg))
    }

    /// Consumes a `*` width or precision.
    fn next_count(&mut self) -> MarshalResult<i64> {
        match self.next()? {
            (_, FormatArg::Int(value)) => Ok(value),
            (_, FormatArg::UInt(value)) => Ok(i64::try_from(value).unwrap_or(i64::MAX)),
            (_, FormatArg::Char(value)) => Ok(i64::from(value)),
            (index, _) => Err(MarshalError::ArgumentMismatch {
                index,
                conversion: '*',
            }),
        }
    }
}

fn render<S: Sink>(format: &[u8], args: &[FormatArg<'_>], sink: &mut S) -> MarshalResult<()> {
    let mut args = Args { args, next: 0 };
    let mut i = 0;
    while i < format.len() {
        let literal_end = format[i..]
            .iter()
            .position(|&b| b == b'%')
            .map_or(format.len(), |offset| i + offset);
        sink.push(&format[i..literal_end]);
        if literal_end == format.len() {
            break;
        }
        let position = literal_end;
        i = position + 1;
        if format.get(i) == Some(&b'%') {
            sink.push(b"%");
            i += 1;
            continue;
        }
        let (spec, next) = parse_spec(format, i, position, &mut args)?;
        i = next;
        let (index, arg) = args.next()?;
        write_arg(sink, &spec, index, arg)?;
    }
    Ok(())
}

fn parse_spec(
    format: &[u8],
    mut i: usize,
    position: usize,
    args: &mut Args<'_, '_>,
) -> MarshalResult<(Spec, usize)> {
    let mut spec = Spec::default();

    while let Some(&b) = format.get(i) {
        match b {
            b'-' => spec.left = true,
            b'0' => spec.zero = true,
            b'+' => spec.plus = true,
            b' ' => spec.space = true,
            b'#' => spec.alt = true,
            _ => break,
        }
        i += 1;
    }

    if format.get(i) == Some(&b'*') {
        i += 1;
        let width = args.next_count()?;
        spec.left |= width < 0;
        spec.width = usize::try_from(width.unsigned_abs()).unwrap_or(usize::MAX);
    } else {
        let (width, next) = parse_number(format, i, position)?;
        spec.width = width;
        i = next;
    }

    if format.get(i) == Some(&b'.') {
        i += 1;
        if format.get(i) == Some(&b'*') {
            i += 1;
            let precision = args.next_count()?;
            spec.precision = usize::try_from(precision).ok();
        } else {
            let (precision, next) = parse_number(format, i, position)?;
            spec.precision = Some(precision);
            i = next;
        }
    }

    let modifier = i;
    while matches!(
        format.get(i),
        Some(b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't')
    ) {
        i += 1;
    }
    spec.length = match &format[modifier..i] {
        b"hh" => Length::Byte,
        b"h" => Length::Short,
        _ => Length::Full,
    };

    match format.get(i) {
        Some(&c) if b"diuxXocspfFeEgG".contains(&c) => {
            spec.conversion = c;
            Ok((spec, i + 1))
        }
        Some(_) => Err(MarshalError::InvalidFormat {
            position,
            reason: "unsupported conversion",
        }),
        None => Err(MarshalError::InvalidFormat {
            position,
            reason: "incomplete directive",
        }),
    }
}

fn parse_number(format: &[u8], mut i: usize, position: usize) -> MarshalResult<(usize, usize)> {
    let mut value: usize = 0;
    while let Some(&b) = format.get(i) {
        if !b.is_ascii_digit() {
            break;
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(usize::from(b - b'0')))
            .ok_or(MarshalError::InvalidFormat {
                position,
                reason: "field width overflows",
            })?;
        i += 1;
    }
    Ok((value, i))
}

fn write_arg<S: Sink>(
    sink: &mut S,
    spec: &Spec,
    index: usize,
    arg: FormatArg<'_>,
) -> MarshalResult<()> {
    let mismatch = MarshalError::ArgumentMismatch {
        index,
        conversion: char::from(spec.conversion),
    };
    match spec.conversion {
        b'd' | b'i' => {
            let parts = |v: i64| (v < 0, v.unsigned_abs());
            let (negative, magnitude) = match arg {
                FormatArg::Int(v) => parts(spec.length.signed(v)),
                FormatArg::UInt(v) if spec.length == Length::Full => (false, v),
                FormatArg::UInt(v) => parts(spec.length.signed(v as i64)),
                FormatArg::Char(v) => parts(spec.length.signed(i64::from(v))),
                _ => return Err(mismatch),
            };
            write_integer(sink, spec, negative, magnitude);
        }
        b'u' | b'x' | b'X' | b'o' => {
            let magnitude = match arg {
                FormatArg::Int(v) => v as u64,
                FormatArg::UInt(v) => v,
                FormatArg::Char(v) => u64::from(v),
                _ => return Err(mismatch),
            };
            write_integer(sink, spec, false, spec.length.unsigned(magnitude));
        }
        b'c' => {
            let byte = match arg {
                FormatArg::Char(v) => v,
                FormatArg::Int(v) => v as u8,
                FormatArg::UInt(v) => v as u8,
                _ => return Err(mismatch),
            };
            emit(sink, spec, b"", b"", 0, &[byte], false);
        }
        b's' => {
            let FormatArg::Str(bytes) = arg else {
                return Err(mismatch);
            };
            let shown = spec.precision.map_or(bytes, |p| &bytes[..p.min(bytes.len())]);
            emit(sink, spec, b"", b"", 0, shown, false);
        }
        b'p' => {
            let address = match arg {
                FormatArg::Ptr(v) => v as u64,
                FormatArg::UInt(v) => v,
                _ => return Err(mismatch),
            };
            if address == 0 {
                emit(sink, spec, b"", b"", 0, b"(nil)", false);
            } else {
                let mut buf = [0u8; 64];
                let body = digits(address, 16, false, &mut buf);
                emit(sink, spec, b"", b"0x", 0, body, false);
            }
        }
        _ => {
            let FormatArg::Double(value) = arg else {
                return Err(mismatch);
            };
            write_float(sink, spec, value);
        }
    }
    Ok(())
}

fn digits(mut value: u64, radix: u64, upper: bool, out: &mut [u8; 64]) -> &[u8] {
    let table: &[u8; 16] = if upper {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let mut pos = out.len();
    loop {
        pos -= 1;
        out[pos] = table[(value % radix) as usize];
        value /= radix;
        if value == 0 {
            break;
        }
    }
    &out[pos..]
}

fn sign_of(spec: &Spec, negative: bool) -> &'static [u8] {
    if negative {
        b"-"
    } else if spec.plus {
        b"+"
    } else if spec.space {
        b" "
    } else {
        b""
    }
}

fn write_integer<S: Sink>(sink: &mut S, spec: &Spec, negative: bool, magnitude: u64) {
    let (radix, upper) = match spec.conversion {
        b'x' => (16, false),
        b'X' => (16, true),
        b'o' => (8, false),
        _ => (10, false),
    };
    let mut buf = [0u8; 64];
    let mut body = digits(magnitude, radix, upper, &mut buf);
    if spec.precision == Some(0) && magnitude == 0 {
        body = &[];
    }
    let zeros = spec
        .precision
        .map_or(0, |precision| precision.saturating_sub(body.len()));

    let sign: &[u8] = if matches!(spec.conversion, b'd' | b'i') {
        sign_of(spec, negative)
    } else {
        b""
    };
    let prefix: &[u8] = match spec.conversion {
        b'x' if spec.alt && magnitude != 0 => b"0x",
        b'X' if spec.alt && magnitude != 0 => b"0X",
        b'o' if spec.alt && zeros == 0 && body.first() != Some(&b'0') => b"0",
        _ => b"",
    };
    let zero_pad = spec.zero && !spec.left && spec.precision.is_none();
    emit(sink, spec, sign, prefix, zeros, body, zero_pad);
}

fn emit<S: Sink>(
    sink: &mut S,
    spec: &Spec,
    sign: &[u8],
    prefix: &[u8],
    zeros: usize,
    body: &[u8],
    zero_pad: bool,
) {
    let content = (sign.len() + prefix.len() + body.len()).saturating_add(zeros);
    let fill = spec.width.saturating_sub(content);
    if spec.left {
        sink.push(sign);
        sink.push(prefix);
        sink.repeat(b'0', zeros);
        sink.push(body);
        sink.repeat(b' ', fill);
    } else if zero_pad {
        sink.push(sign);
        sink.push(prefix);
        sink.repeat(b'0', zeros.saturating_add(fill));
        sink.push(body);
    } else {
        sink.repeat(b' ', fill);
        sink.push(sign);
        sink.push(prefix);
        sink.repeat(b'0', zeros);
        sink.push(body);
    }
}

fn write_float<S: Sink>(sink: &mut S, spec: &Spec, value: f64) {
    let upper = spec.conversion.is_ascii_uppercase();
    let sign = sign_of(spec, value.is_sign_negative());
    if !value.is_finite() {
        let text: &[u8] = match (value.is_nan(), upper) {
            (true, false) => b"nan",
            (true, true) => b"NAN",
            (false, false) => b"inf",
            (false, true) => b"INF",
        };
        emit(sink, spec, sign, b"", 0, text, false);
        return;
    }

    let magnitude = value.abs();
    let precision = spec.precision.unwrap_or(6).min(MAX_FLOAT_PRECISION);
    let mut body = match spec.conversion.to_ascii_lowercase() {
        b'f' => fixed(magnitude, precision, spec.alt),
        b'e' => exponential(magnitude, precision, spec.alt),
        _ => general(magnitude, precision, spec.alt),
    };
    if upper {
        body.make_ascii_uppercase();
    }
    let zero_pad = spec.zero && !spec.left;
    emit(sink, spec, sign, b"", 0, body.as_bytes(), zero_pad);
}

fn fixed(value: f64, precision: usize, alt: bool) -> String {
    let mut text = format!("{value:.precision$}");
    if alt && precision == 0 {
        text.push('.');
    }
    text
}

/// Splits Rust's `{:e}` output into mantissa and decimal exponent.
fn rust_exponential(value: f64, precision: usize) -> (String, i32) {
    let text = format!("{value:.precision$e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.to_owned(), exponent.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn exponential(value: f64, precision: usize, alt: bool) -> String {
    let (mut text, exponent) = rust_exponential(value, precision);
    if alt && precision == 0 {
        text.push('.');
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    text.push('e');
    text.push(sign);
    text.push_str(&format!("{:02}", exponent.unsigned_abs()));
    text
}

fn general(value: f64, precision: usize, alt: bool) -> String {
    let significant = precision.max(1);
    let exponent = if value == 0.0 {
        0
    } else {
        rust_exponential(value, significant - 1).1
    };
    let significant_i = i32::try_from(significant).unwrap_or(i32::MAX);
    let mut text = if exponent < -4 || exponent >= significant_i {
        exponential(value, significant - 1, alt)
    } else {
        let decimals = usize::try_from(significant_i - 1 - exponent).unwrap_or(0);
        fixed(value, decimals, alt)
    };
    if !alt {
        let (number, suffix) = text.split_at(text.find('e').unwrap_or(text.len()));
        if number.contains('.') {
            let trimmed = number.trim_end_matches('0').trim_end_matches('.');
            text = format!("{trimmed}{suffix}");
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::FormatArg::{Char, Double, Int, Ptr, Str, UInt};
    use super::*;
    use proptest::prelude::*;

    fn fmt(format: &str, args: &[FormatArg<'_>]) -> String {
        let staged = BoundedFormatter::default()
            .render(format.as_bytes(), args)
            .unwrap();
        assert!(!staged.truncated());
        staged.to_string_lossy().into_owned()
    }

    #[test]
    fn short_modifiers_narrow_integers() {
        assert_eq!(fmt("%hhx", &[Int(-1)]), "ff");
        assert_eq!(fmt("%hx", &[Int(-1)]), "ffff");
        assert_eq!(fmt("%hd", &[Int(65535)]), "-1");
        assert_eq!(fmt("%hhd", &[UInt(200)]), "-56");
        assert_eq!(fmt("%hhu", &[Int(256)]), "0");
        assert_eq!(fmt("%ho", &[UInt(0x1_0008)]), "10");
        assert_eq!(fmt("%hhi", &[Char(0x80)]), "-128");
    }

    #[test]
    fn other_modifiers_keep_full_width() {
        assert_eq!(fmt("%x", &[Int(-1)]), "ffffffffffffffff");
        assert_eq!(fmt("%lx", &[Int(-1)]), "ffffffffffffffff");
        assert_eq!(fmt("%zu", &[UInt(u64::MAX)]), "18446744073709551615");
        assert_eq!(fmt("%d", &[UInt(200)]), "200");
    }

    #[test]
    fn huge_staging_limit_is_clamped() {
        let formatter = BoundedFormatter::new(FormatterConfig::new().staging_limit(usize::MAX));
        assert_eq!(formatter.config().effective_staging_limit(), MAX_STAGING_LIMIT);

        let staged = formatter.render(b"%*d", &[Int(1 << 40), Int(1)]).unwrap();
        assert!(staged.truncated());
        assert_eq!(staged.required(), 1 << 40);
        assert_eq!(staged.len(), MAX_STAGING_LIMIT);
        assert!(staged.as_bytes().iter().all(|&b| b == b' '));

        let strict = BoundedFormatter::new(
            FormatterConfig::new()
                .staging_limit(usize::MAX)
                .overflow(OverflowPolicy::Reject),
        );
        assert_eq!(
            strict.render(b"%*d", &[Int(1 << 40), Int(1)]),
            Err(MarshalError::StagingOverflow {
                required: 1 << 40,
                limit: MAX_STAGING_LIMIT
            })
        );
    }

    #[test]
    fn literals_and_percent() {
        assert_eq!(fmt("plain text", &[]), "plain text");
        assert_eq!(fmt("100%%", &[]), "100%");
        assert_eq!(fmt("", &[]), "");
    }

    #[test]
    fn integers() {
        assert_eq!(fmt("%d", &[Int(42)]), "42");
        assert_eq!(fmt("%i", &[Int(-7)]), "-7");
        assert_eq!(fmt("%5d|", &[Int(42)]), "   42|");
        assert_eq!(fmt("%-5d|", &[Int(42)]), "42   |");
        assert_eq!(fmt("%05d", &[Int(-42)]), "-0042");
        assert_eq!(fmt("%+d", &[Int(5)]), "+5");
        assert_eq!(fmt("% d", &[Int(5)]), " 5");
        assert_eq!(fmt("%.3d", &[Int(7)]), "007");
        assert_eq!(fmt("%8.3d", &[Int(7)]), "     007");
        assert_eq!(fmt("%.0d|", &[Int(0)]), "|");
        assert_eq!(fmt("%lld", &[Int(i64::MIN)]), "-9223372036854775808");
    }

    #[test]
    fn unsigned_conversions() {
        assert_eq!(fmt("%u", &[Int(-1)]), "18446744073709551615");
        assert_eq!(fmt("%zu", &[UInt(10)]), "10");
        assert_eq!(fmt("%x", &[UInt(255)]), "ff");
        assert_eq!(fmt("%#X", &[UInt(255)]), "0XFF");
        assert_eq!(fmt("%#x", &[UInt(0)]), "0");
        assert_eq!(fmt("%o", &[UInt(8)]), "10");
        assert_eq!(fmt("%#o", &[UInt(8)]), "010");
        assert_eq!(fmt("%#o", &[UInt(0)]), "0");
        assert_eq!(fmt("%08x", &[UInt(0xbeef)]), "0000beef");
        assert_eq!(fmt("%+u", &[UInt(3)]), "3");
    }

    #[test]
    fn chars_and_strings() {
        assert_eq!(fmt("%c", &[Char(b'A')]), "A");
        assert_eq!(fmt("%3c", &[Int(66)]), "  B");
        assert_eq!(fmt("%s", &["abc".into()]), "abc");
        assert_eq!(fmt("%.3s", &["abcdef".into()]), "abc");
        assert_eq!(fmt("%-6s|", &["ab".into()]), "ab    |");
        assert_eq!(fmt("%6s", &["ab".into()]), "    ab");
        assert_eq!(fmt("%.10s", &[Str(b"ab")]), "ab");
    }

    #[test]
    fn star_width_and_precision() {
        assert_eq!(fmt("%*d", &[Int(6), Int(42)]), "    42");
        assert_eq!(fmt("%*d|", &[Int(-4), Int(7)]), "7   |");
        assert_eq!(fmt("%.*s", &[Int(2), "abcdef".into()]), "ab");
        assert_eq!(fmt("%.*d", &[Int(-1), Int(5)]), "5");
    }

    #[test]
    fn pointers() {
        assert_eq!(fmt("%p", &[Ptr(0x1234)]), "0x1234");
        assert_eq!(fmt("%p", &[Ptr(0)]), "(nil)");
        assert_eq!(fmt("%10p", &[Ptr(0xab)]), "      0xab");
    }

    #[test]
    fn floats() {
        assert_eq!(fmt("%f", &[Double(3.14159)]), "3.141590");
        assert_eq!(fmt("%.2f", &[Double(2.345_678)]), "2.35");
        assert_eq!(fmt("%08.3f", &[Double(-3.14159)]), "-003.142");
        assert_eq!(fmt("%#.0f", &[Double(3.0)]), "3.");
        assert_eq!(fmt("%.3e", &[Double(12345.678)]), "1.235e+04");
        assert_eq!(fmt("%e", &[Double(0.0)]), "0.000000e+00");
        assert_eq!(fmt("%E", &[Double(1e-10)]), "1.000000E-10");
        assert_eq!(fmt("%f", &[Double(f64::INFINITY)]), "inf");
        assert_eq!(fmt("%F", &[Double(f64::NEG_INFINITY)]), "-INF");
        assert_eq!(fmt("%5.1f", &[Double(f64::NAN)]), "  nan");
    }

    #[test]
    fn general_floats() {
        assert_eq!(fmt("%g", &[Double(0.0001)]), "0.0001");
        assert_eq!(fmt("%g", &[Double(100_000.0)]), "100000");
        assert_eq!(fmt("%g", &[Double(1e6)]), "1e+06");
        assert_eq!(fmt("%g", &[Double(1.5)]), "1.5");
        assert_eq!(fmt("%g", &[Double(0.000_012_34)]), "1.234e-05");
        assert_eq!(fmt("%G", &[Double(1e-10)]), "1E-10");
        assert_eq!(fmt("%#g", &[Double(1.5)]), "1.50000");
        assert_eq!(fmt("%g", &[Double(0.0)]), "0");
        assert_eq!(fmt("%.3g", &[Double(999.9)]), "1e+03");
    }

    #[test]
    fn format_errors() {
        let formatter = BoundedFormatter::default();
        assert_eq!(
            formatter.measure(b"abc %", &[]),
            Err(MarshalError::InvalidFormat {
                position: 4,
                reason: "incomplete directive"
            })
        );
        assert_eq!(
            formatter.measure(b"%k", &[]),
            Err(MarshalError::InvalidFormat {
                position: 0,
                reason: "unsupported conversion"
            })
        );
        assert_eq!(
            formatter.measure(b"%d %d", &[Int(1)]),
            Err(MarshalError::MissingArgument { index: 1 })
        );
        assert_eq!(
            formatter.measure(b"%s", &[Int(1)]),
            Err(MarshalError::ArgumentMismatch {
                index: 0,
                conversion: 's'
            })
        );
        assert_eq!(
            formatter.measure(b"%*d", &["x".into(), Int(1)]),
            Err(MarshalError::ArgumentMismatch {
                index: 0,
                conversion: '*'
            })
        );
    }

    #[test]
    fn errors_leave_destination_untouched() {
        let mut dest = [0xAAu8; 8];
        assert!(format_bounded(&mut dest, b"%s", &[]).is_err());
        assert_eq!(dest, [0xAAu8; 8]);
    }

    #[test]
    fn fits_exactly() {
        let mut dest = [0xFFu8; 4];
        let out = format_bounded(&mut dest, b"%s", &["abc".into()]).unwrap();
        assert_eq!(
            out,
            Formatted {
                written: 3,
                required: 3,
                truncated: false
            }
        );
        assert_eq!(&dest, b"abc\0");
    }

    #[test]
    fn truncates_to_capacity_minus_one() {
        let mut buf = [0xFFu8; 32];
        let out = format_bounded(&mut buf[..3], b"%s", &["abc".into()]).unwrap();
        assert_eq!(out.written, 2);
        assert!(out.truncated);
        assert_eq!(&buf[..3], b"ab\0");
        assert!(buf[3..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn zero_capacity_fails_under_both_policies() {
        for policy in [OverflowPolicy::Truncate, OverflowPolicy::Reject] {
            let formatter = BoundedFormatter::new(FormatterConfig::new().overflow(policy));
            let err = formatter.format_into(&mut [], b"x", &[]).unwrap_err();
            assert_eq!(
                err,
                MarshalError::BufferTooSmall {
                    required: 2,
                    capacity: 0
                }
            );
        }
    }

    #[test]
    fn oversized_argument_truncates_at_staging_limit() {
        let long = vec![b'x'; 8000];
        let formatter = BoundedFormatter::new(FormatterConfig::new().staging_limit(1024));

        let staged = formatter.render(b"msg=%s", &[Str(&long)]).unwrap();
        assert_eq!(staged.len(), 1024);
        assert_eq!(staged.required(), 8004);
        assert!(staged.truncated());

        let mut buf = vec![0xEEu8; 4096 + 64];
        let out = formatter
            .format_into(&mut buf[..4096], b"msg=%s", &[Str(&long)])
            .unwrap();
        assert_eq!(out.written, 1024);
        assert_eq!(out.required, 8004);
        assert!(out.truncated);
        assert_eq!(&buf[..4], b"msg=");
        assert_eq!(buf[1024], 0);
        assert!(buf[1025..].iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn oversized_argument_rejected() {
        let long = vec![b'x'; 8000];
        let formatter = BoundedFormatter::new(
            FormatterConfig::new()
                .staging_limit(1024)
                .overflow(OverflowPolicy::Reject),
        );
        let mut dest = vec![0xEEu8; 16_384];
        let err = formatter
            .format_into(&mut dest, b"%s", &[Str(&long)])
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::StagingOverflow {
                required: 8000,
                limit: 1024
            }
        );
        assert!(dest.iter().all(|&b| b == 0xEE));

        let mut small = [0u8; 4];
        let err = formatter
            .format_into(&mut small, b"%s", &["abcd".into()])
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::BufferTooSmall {
                required: 5,
                capacity: 4
            }
        );
    }

    #[test]
    fn huge_star_width_stays_bounded() {
        let formatter = BoundedFormatter::new(FormatterConfig::new().staging_limit(64));
        let staged = formatter
            .render(b"%*d", &[Int(i64::MAX), Int(1)])
            .unwrap();
        assert_eq!(staged.len(), 64);
        assert!(staged.truncated());
    }

    #[test]
    fn rust_format_arguments() {
        let mut dest = [0u8; 8];
        let out = BoundedFormatter::default()
            .format_args_into(&mut dest, format_args!("{}-{}", "abc", 12345))
            .unwrap();
        assert_eq!(out.required, 9);
        assert_eq!(out.written, 7);
        assert_eq!(&dest, b"abc-123\0");
    }

    #[test]
    fn concurrent_calls_do_not_share_staging() {
        std::thread::scope(|scope| {
            for id in 0..8u32 {
                scope.spawn(move || {
                    for round in 0..200u32 {
                        let mut dest = [0u8; 64];
                        let out = format_bounded(
                            &mut dest,
                            b"thread %u round %u",
                            &[id.into(), round.into()],
                        )
                        .unwrap();
                        let expected = format!("thread {id} round {round}");
                        assert_eq!(&dest[..out.written], expected.as_bytes());
                    }
                });
            }
        });
    }

    proptest! {
        #[test]
        fn never_writes_past_capacity(
            text in prop::collection::vec(any::<u8>(), 0..512),
            capacity in 1usize..256,
            limit in 1usize..600,
        ) {
            let formatter = BoundedFormatter::new(FormatterConfig::new().staging_limit(limit));
            let mut buf = vec![0xA5u8; capacity + 16];
            let out = formatter
                .format_into(&mut buf[..capacity], b"[%s]", &[Str(&text)])
                .unwrap();

            let mut expected = vec![b'['];
            expected.extend_from_slice(&text);
            expected.push(b']');

            prop_assert!(out.written < capacity);
            prop_assert!(out.written <= limit);
            prop_assert_eq!(out.required, expected.len());
            prop_assert_eq!(&buf[..out.written], &expected[..out.written]);
            prop_assert_eq!(buf[out.written], 0);
            prop_assert!(buf[capacity..].iter().all(|&b| b == 0xA5));
            prop_assert_eq!(out.truncated, out.written < expected.len());
        }
    }
}
