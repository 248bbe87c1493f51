//! Error types for marshaling operations.

use crate::handle::HandleKind;
use std::fmt;
use thiserror::Error;

/// Result type for marshaling operations.
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Which side of a two-region operation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionSide {
    /// The region bytes are read from.
    Source,
    /// The region bytes are written to.
    Destination,
}

impl fmt::Display for RegionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSide::Source => f.write_str("source"),
            RegionSide::Destination => f.write_str("destination"),
        }
    }
}

/// Errors raised by the marshaling layer itself.
///
/// Engine status codes are never turned into a `MarshalError`; they are
/// returned unchanged as [`crate::Status`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarshalError {
    /// An offset/length pair does not fit inside its region.
    #[error("{side} range out of bounds: offset {offset}, len {len}, size {size}")]
    OutOfBounds {
        /// The offending region.
        side: RegionSide,
        /// Requested start offset.
        offset: usize,
        /// Requested length.
        len: usize,
        /// Length of the region.
        size: usize,
    },

    /// A region has a null base but a non-zero length was requested.
    #[error("{side} region is null but {len} bytes were requested")]
    NullRegion {
        /// The offending region.
        side: RegionSide,
        /// Requested length.
        len: usize,
    },

    /// The destination cannot hold the output and the terminator.
    #[error("buffer too small: {required} bytes required, capacity {capacity}")]
    BufferTooSmall {
        /// Bytes needed including the NUL terminator.
        required: usize,
        /// Declared destination capacity.
        capacity: usize,
    },

    /// The rendered text exceeds the staging limit.
    #[error("staging overflow: rendered {required} bytes, limit {limit}")]
    StagingOverflow {
        /// Full rendered length.
        required: usize,
        /// Configured staging limit.
        limit: usize,
    },

    /// A format directive could not be parsed.
    #[error("invalid format directive at byte {position}: {reason}")]
    InvalidFormat {
        /// Byte offset of the `%` that starts the directive.
        position: usize,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A directive consumed more arguments than were supplied.
    #[error("format argument {index} is missing")]
    MissingArgument {
        /// Zero-based index of the missing argument.
        index: usize,
    },

    /// An argument's type does not fit its conversion.
    #[error("format argument {index} does not match conversion '%{conversion}'")]
    ArgumentMismatch {
        /// Zero-based argument index.
        index: usize,
        /// The conversion character.
        conversion: char,
    },

    /// A key or value is null or larger than the engine accepts.
    #[error("bad value size {size} (null or longer than {max})")]
    BadValSize {
        /// Length of the value.
        size: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Packed dup-fixed data cannot be split into equal elements.
    #[error("batch of {len} bytes cannot be split into {count} equal elements")]
    UnevenBatch {
        /// Length of the packed data.
        len: usize,
        /// Requested element count.
        count: usize,
    },

    /// A put was requested without any data value.
    #[error("put requires at least one data value")]
    EmptyValueSequence,

    /// A handle buffer is shorter than the engine's struct size.
    #[error("{kind} handle needs {native} bytes, only {available} available")]
    HandleSizeMismatch {
        /// Kind of handle.
        kind: HandleKind,
        /// Size reported by the engine.
        native: usize,
        /// Bytes available in the shorter buffer.
        available: usize,
    },

    /// The engine reported a log level outside its documented range.
    #[error("unknown native log level: {0}")]
    UnknownLogLevel(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_message() {
        let err = MarshalError::OutOfBounds {
            side: RegionSide::Destination,
            offset: 8,
            len: 4,
            size: 10,
        };
        assert_eq!(
            err.to_string(),
            "destination range out of bounds: offset 8, len 4, size 10"
        );
    }

    #[test]
    fn handle_mismatch_message() {
        let err = MarshalError::HandleSizeMismatch {
            kind: HandleKind::Cursor,
            native: 192,
            available: 64,
        };
        assert_eq!(
            err.to_string(),
            "cursor handle needs 192 bytes, only 64 available"
        );
    }
}
