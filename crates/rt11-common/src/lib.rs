//! rt11dir Common - Shared types and utilities
//!
//! This crate provides the error definitions, configuration types and
//! value codecs (RAD50 short names, packed dates) used by the directory
//! engine and the command-line tool.

pub mod config;
pub mod date;
pub mod error;
pub mod types;

pub use config::Config;
pub use date::RtDate;
pub use error::{Error, Result};
pub use types::*;
