//! Core types and shared functionality for assetgate.
//!
//! This crate provides:
//! - In-memory search cache with an injectable clock
//! - Fallback search dataset loading
//! - Unified error types
//! - Bearer credential handling
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod credential;
pub mod error;
pub mod fallback;

pub use cache::{Clock, ManualClock, SearchCache, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use credential::AuthCredential;
pub use error::Error;
pub use fallback::{FallbackDataset, FallbackSource, FileFallback, StaticFallback};
