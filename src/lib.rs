//! Backend HTTP layer
//!
//! A Rust library for talking to a JSON backend API: serialized request
//! execution, ETag-based conditional caching and coalescing of concurrent
//! identical operations.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
