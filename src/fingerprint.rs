//! Deterministic environment fingerprinting
//!
//! A fingerprint identifies an environment by the inputs that define its end
//! state: the normalized requirement set, the interpreter spec, and the
//! provisioning and environment-creation arguments. Arguments passed to the
//! app at run time are excluded, so the same logical environment is reused
//! across invocations with different app arguments.
//!
//! The fingerprint is never stored anywhere; it *is* the cache directory's
//! name. Identical input tuples always hash to the same directory.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the hex fingerprint used as a cache directory name
pub const FINGERPRINT_LEN: usize = 15;

/// A cache directory identity derived from environment-defining inputs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint for an environment definition.
    ///
    /// Requirement strings are fed to the digest concatenated with no
    /// separator, in extracted order. This matches the historical scheme:
    /// adjacent strings with the same concatenation are indistinguishable,
    /// which is accepted rather than fixed, because inserting a separator
    /// would invalidate every pre-existing cache directory.
    pub fn compute(
        requirements: &[String],
        interpreter: &str,
        pip_args: &[String],
        venv_args: &[String],
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(requirements.concat().as_bytes());
        hasher.update(interpreter.as_bytes());
        hasher.update(pip_args.concat().as_bytes());
        hasher.update(venv_args.concat().as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    /// Reconstruct a fingerprint from an existing cache directory name.
    ///
    /// Returns `None` for names that cannot have been produced by
    /// [`Fingerprint::compute`], so sweep skips foreign directories.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        if name.len() == FINGERPRINT_LEN && name.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(name.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
