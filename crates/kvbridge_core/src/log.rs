//! Engine log forwarding.
//!
//! The engine reports diagnostics through a printf-style callback. Messages
//! are rendered with the bounded formatter and re-emitted as `tracing`
//! events under the [`NATIVE_TARGET`] target.

use crate::error::{MarshalError, MarshalResult};
use crate::format::{BoundedFormatter, FormatArg};
use std::fmt;
use tracing::Level;

/// Target of every event forwarded from the engine.
pub const NATIVE_TARGET: &str = "kvbridge::native";

/// Engine log levels, most severe first.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeLogLevel {
    /// Unrecoverable failure.
    Fatal = 0,
    /// Error.
    Error = 1,
    /// Warning.
    Warn = 2,
    /// Notable but expected event.
    Notice = 3,
    /// Verbose information.
    Verbose = 4,
    /// Debug detail.
    Debug = 5,
    /// Trace detail.
    Trace = 6,
    /// Extra trace detail.
    Extra = 7,
}

impl NativeLogLevel {
    /// Raw value asking the engine to keep its current level.
    pub const DONT_CHANGE: i32 = -1;

    /// All levels, most severe first.
    pub const ALL: [NativeLogLevel; 8] = [
        NativeLogLevel::Fatal,
        NativeLogLevel::Error,
        NativeLogLevel::Warn,
        NativeLogLevel::Notice,
        NativeLogLevel::Verbose,
        NativeLogLevel::Debug,
        NativeLogLevel::Trace,
        NativeLogLevel::Extra,
    ];

    /// Parses a raw engine level.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::UnknownLogLevel`] for values outside `0..=7`,
    /// including [`NativeLogLevel::DONT_CHANGE`].
    pub fn from_raw(raw: i32) -> MarshalResult<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.code() == raw)
            .ok_or(MarshalError::UnknownLogLevel(raw))
    }

    /// Returns the raw engine level.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns the `tracing` level events of this level are emitted at.
    #[must_use]
    pub const fn tracing_level(self) -> Level {
        match self {
            NativeLogLevel::Fatal | NativeLogLevel::Error => Level::ERROR,
            NativeLogLevel::Warn => Level::WARN,
            NativeLogLevel::Notice | NativeLogLevel::Verbose => Level::INFO,
            NativeLogLevel::Debug => Level::DEBUG,
            NativeLogLevel::Trace | NativeLogLevel::Extra => Level::TRACE,
        }
    }

    /// Returns true if the current subscriber records this level.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            NativeLogLevel::Fatal | NativeLogLevel::Error => {
                tracing::enabled!(target: NATIVE_TARGET, Level::ERROR)
            }
            NativeLogLevel::Warn => tracing::enabled!(target: NATIVE_TARGET, Level::WARN),
            NativeLogLevel::Notice | NativeLogLevel::Verbose => {
                tracing::enabled!(target: NATIVE_TARGET, Level::INFO)
            }
            NativeLogLevel::Debug => tracing::enabled!(target: NATIVE_TARGET, Level::DEBUG),
            NativeLogLevel::Trace | NativeLogLevel::Extra => {
                tracing::enabled!(target: NATIVE_TARGET, Level::TRACE)
            }
        }
    }

    /// Returns the most verbose level the current subscriber records.
    ///
    /// `None` if even fatal messages would be dropped.
    #[must_use]
    pub fn max_enabled() -> Option<Self> {
        Self::ALL
            .into_iter()
            .rev()
            .find(|level| level.is_enabled())
    }
}

impl fmt::Display for NativeLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeLogLevel::Fatal => "fatal",
            NativeLogLevel::Error => "error",
            NativeLogLevel::Warn => "warn",
            NativeLogLevel::Notice => "notice",
            NativeLogLevel::Verbose => "verbose",
            NativeLogLevel::Debug => "debug",
            NativeLogLevel::Trace => "trace",
            NativeLogLevel::Extra => "extra",
        };
        f.write_str(name)
    }
}

/// Renders an engine log message and emits it as a `tracing` event.
///
/// Nothing is rendered when the level is disabled. A trailing newline, which
/// engine messages usually carry, is dropped.
///
/// # Errors
///
/// Returns the formatter's error if the message cannot be rendered.
pub fn log_native(
    formatter: &BoundedFormatter,
    level: NativeLogLevel,
    function: &str,
    line: u32,
    format: &[u8],
    args: &[FormatArg<'_>],
) -> MarshalResult<()> {
    if !level.is_enabled() {
        return Ok(());
    }
    let staged = formatter.render(format, args)?;
    let text = staged.to_string_lossy();
    let message = text.trim_end_matches('\n');
    let truncated = staged.truncated();

    match level {
        NativeLogLevel::Fatal | NativeLogLevel::Error => {
            tracing::error!(target: NATIVE_TARGET, native_level = %level, function, line, truncated, "{message}");
        }
        NativeLogLevel::Warn => {
            tracing::warn!(target: NATIVE_TARGET, native_level = %level, function, line, truncated, "{message}");
        }
        NativeLogLevel::Notice | NativeLogLevel::Verbose => {
            tracing::info!(target: NATIVE_TARGET, native_level = %level, function, line, truncated, "{message}");
        }
        NativeLogLevel::Debug => {
            tracing::debug!(target: NATIVE_TARGET, native_level = %level, function, line, truncated, "{message}");
        }
        NativeLogLevel::Trace | NativeLogLevel::Extra => {
            tracing::trace!(target: NATIVE_TARGET, native_level = %level, function, line, truncated, "{message}");
        }
    }
    Ok(())
}
