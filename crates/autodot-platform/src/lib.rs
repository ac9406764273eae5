//! autodot-platform: platform-specific I/O boundary for autodot.
//!
//! This crate provides the gesture dispatch surface consumed by the core's
//! injection gate:
//!
//! - `EnigoDispatcher` - real pointer press injection via `enigo`
//! - `NoopDispatcher` - no-op stand-in for UI development and tests
//! - `error` - common error types

mod dispatch;
mod error;

pub use dispatch::{EnigoDispatcher, NoopDispatcher};
pub use error::{PlatformError, PlatformResult};
