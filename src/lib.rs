//! runx - run Python scripts and package apps in disposable cached
//! environments
//!
//! Environments are identified purely by content-addressed filesystem
//! state: a deterministic fingerprint of their defining inputs names the
//! cache directory, and expiration is derived from directory age plus
//! marker files. No database, no daemon.

pub mod advisory;
pub mod cache;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod fingerprint;
pub mod net;
pub mod script;

pub use error::{RunxError, RunxResult};
