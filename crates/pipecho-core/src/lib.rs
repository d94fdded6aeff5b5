//! # pipecho core
//!
//! Core types and configuration for pipecho.
//!
//! This crate provides:
//! - The runtime [`Config`] shared by every unit of work (JSON5 loadable)
//! - The [`Message`] line type and the session-ending [`Sentinel`]
//! - The [`reverse`] transform the server applies to each line

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod types;

pub use config::{Config, ConfigError};
pub use types::{Message, Sentinel, reverse};
