//! # kvbridge Testkit
//!
//! Test utilities for kvbridge.
//!
//! This crate provides:
//! - A recording engine that captures every put it receives
//! - Guarded buffers that detect writes outside their body
//! - Property-based test generators using proptest
//! - Format test vectors shared with host bindings
//! - Concurrency stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use kvbridge_testkit::prelude::*;
//! use kvbridge_core::{Bridge, Config, PutFlags};
//!
//! let bridge = Bridge::new(RecordingEngine::new(), Config::default());
//! bridge
//!     .put_multiple(std::ptr::null_mut(), 1, b"k".into(), b"AA".into(), b"BBB".into(), PutFlags::UPSERT)
//!     .unwrap();
//! assert_eq!(bridge.engine().last_put().unwrap().data, vec![b"AA".to_vec(), b"BBB".to_vec()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod fixtures;
pub mod generators;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use engine::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
pub use vectors::*;
