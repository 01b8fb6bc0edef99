//! Subtitle Service
//!
//! Fetches caption tracks for batches of video URLs through a pluggable
//! caption source, retries transient failures, caches results for a while,
//! and converts captions between SubRip, TTML, plain text and JSON.

#[macro_use]
mod macros;

pub mod cache;
pub mod config;
pub mod config_file;
pub mod error;
pub mod http;
pub mod processor;
pub mod quick;
pub mod retry;
pub mod source;
pub mod state;
pub mod stats;
pub mod storage;
pub mod subtitle;
pub mod validator;

#[cfg(test)]
mod integration;

pub use error::{Result, ServiceError};
