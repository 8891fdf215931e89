//! `cadence-core` — shared configuration, constants, and result types.
//!
//! Everything here is consumed by more than one crate in the workspace:
//! the [`config::CadenceConfig`] loaded by the daemon, the scheduling
//! constants, and the [`result::ExecutionResult`] payload that travels from
//! the worker to every result subscriber.

pub mod config;
pub mod error;
pub mod result;

pub use config::CadenceConfig;
pub use error::{CoreError, Result};
pub use result::ExecutionResult;
