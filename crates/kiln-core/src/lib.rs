//! Core types and configuration for kiln.
//!
//! This crate defines the `kiln.toml` schema ([`KilnConfig`]) and the
//! error type returned while loading it.

pub mod config;
pub mod error;

pub use config::{
    ControlPlaneConfig, DeployConfig, ImageConfig, KilnConfig, SandboxConfig, StatusLabels, Step,
};
pub use error::{Error, Result};
