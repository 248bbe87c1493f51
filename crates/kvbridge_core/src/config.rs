//! Bridge configuration.

use crate::format::{FormatterConfig, OverflowPolicy};

/// Configuration for a [`crate::Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Formatter limits and overflow policy.
    pub formatter: FormatterConfig,

    /// Maximum key size, overriding the engine's own limit when set.
    pub max_key_size: Option<usize>,

    /// Whether puts validate the key size before calling the engine.
    pub check_key_size: bool,

    /// Whether puts validate data values against the key size limit, as a
    /// sorted-duplicate table requires.
    pub check_dup_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            formatter: FormatterConfig::default(),
            max_key_size: None,   // engine decides
            check_key_size: true, // reject before the engine sees it
            check_dup_data: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the formatter configuration.
    #[must_use]
    pub const fn formatter(mut self, formatter: FormatterConfig) -> Self {
        self.formatter = formatter;
        self
    }

    /// Sets the formatter's staging limit.
    #[must_use]
    pub const fn staging_limit(mut self, limit: usize) -> Self {
        self.formatter.staging_limit = limit;
        self
    }

    /// Sets the formatter's overflow policy.
    #[must_use]
    pub const fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.formatter.overflow = policy;
        self
    }

    /// Sets the maximum key size.
    #[must_use]
    pub const fn max_key_size(mut self, size: usize) -> Self {
        self.max_key_size = Some(size);
        self
    }

    /// Sets whether puts validate the key size.
    #[must_use]
    pub const fn check_key_size(mut self, value: bool) -> Self {
        self.check_key_size = value;
        self
    }

    /// Sets whether puts validate data values against the key size limit.
    #[must_use]
    pub const fn check_dup_data(mut self, value: bool) -> Self {
        self.check_dup_data = value;
        self
    }
}
