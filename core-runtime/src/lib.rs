//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback control core:
//! - Logging and tracing bootstrap
//! - Bridge wiring and feature flags (`CoreConfig`)
//! - Event bus for user-visible notices
//!
//! ## Overview
//!
//! Hosts build a [`CoreConfig`](config::CoreConfig) once at process start,
//! initialize logging, and hand both to the playback layer. Everything here is
//! independent of any single video or screen.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
