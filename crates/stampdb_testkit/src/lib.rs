//! # stampdb Testkit
//!
//! Test utilities for stampdb.
//!
//! This crate provides:
//! - Storage fixtures backed by temp directories
//! - Property-based test generators using proptest
//! - Fault-injecting store engines
//! - Cross-crate integration test helpers
//! - A `tracing` subscriber for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stampdb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_storage() {
//!     with_temp_storage(|storage| async move {
//!         seed_objects(&storage, 2, 3).await;
//!         // ... test operations
//!     })
//!     .await;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
