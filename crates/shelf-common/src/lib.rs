//! # shelf-common
//!
//! Shared configuration and error types for AppShelf.

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
