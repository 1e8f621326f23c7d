//! Promowell Core - Shared types library.
//!
//! This crate provides common types used across Promowell components:
//! - `server` - Webhook receivers, sync jobs, and the dashboard API
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, platform GID parsing, and loose monetary parsing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
