//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the waveform player core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Settings registry with version tracking
//! - Task scheduling helpers
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the feature crates depend on.
//! It establishes the logging conventions, the host-bridge configuration and
//! the event broadcasting used throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod scheduler;
pub mod settings;

pub use error::{Error, Result};
