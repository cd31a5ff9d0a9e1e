//! Isolated environment handling
//!
//! An environment is a Python virtual environment on disk, either ephemeral
//! (cache-managed, named by fingerprint) or persistent (a long-lived
//! per-app install). `EnvHandle` is a cheap view over such a directory;
//! provisioning and process launch live in the submodules.

pub mod launch;
pub mod provision;

pub use launch::{find_on_path, replace_process, resolve_executable_name, PlatformFamily};
pub use provision::{PipProvisioner, Provisioner};

use crate::error::{RunxError, RunxResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata file describing what was installed into an environment
pub const METADATA_FILENAME: &str = "runx-metadata.json";

/// Package install metadata persisted inside the environment directory,
/// so a cached entry can resolve apps without reinstalling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Installed distribution name
    pub package: String,
    /// Executable scripts the package declared, in bin-directory order
    pub apps: Vec<String>,
}

/// A view over an environment directory
#[derive(Debug, Clone)]
pub struct EnvHandle {
    root: PathBuf,
}

impl EnvHandle {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The environment's executable directory (`bin`, `Scripts` on Windows)
    pub fn bin_dir(&self) -> PathBuf {
        let dir = match PlatformFamily::current() {
            PlatformFamily::Windows => "Scripts",
            PlatformFamily::Unix => "bin",
        };
        self.root.join(dir)
    }

    /// The environment's own interpreter
    pub fn python_path(&self) -> PathBuf {
        self.bin_dir()
            .join(resolve_executable_name("python", PlatformFamily::current()))
    }

    /// Path an app's executable would live at inside this environment
    pub fn app_path(&self, app_filename: &str) -> PathBuf {
        self.bin_dir().join(app_filename)
    }

    /// Whether the environment provides the named executable
    pub fn has_app(&self, app_filename: &str) -> bool {
        self.app_path(app_filename).is_file()
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILENAME)
    }

    /// Read install metadata written by a previous provisioning
    pub fn read_metadata(&self) -> RunxResult<PackageMetadata> {
        let path = self.metadata_path();
        if !path.is_file() {
            return Err(RunxError::MetadataMissing(self.root.clone()));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| RunxError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist install metadata into the environment directory
    pub fn write_metadata(&self, metadata: &PackageMetadata) -> RunxResult<()> {
        let path = self.metadata_path();
        let content = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, content)
            .map_err(|e| RunxError::io(format!("writing {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bin_dir_layout() {
        let env = EnvHandle::new(PathBuf::from("/envs/abc"));
        #[cfg(unix)]
        assert_eq!(env.bin_dir(), PathBuf::from("/envs/abc/bin"));
        #[cfg(windows)]
        assert_eq!(env.bin_dir(), PathBuf::from("/envs/abc/Scripts"));
    }

    #[test]
    fn has_app_checks_bin_dir() {
        let temp = TempDir::new().unwrap();
        let env = EnvHandle::new(temp.path().to_path_buf());
        fs::create_dir_all(env.bin_dir()).unwrap();
        fs::write(env.bin_dir().join("foo-cli"), "#!/bin/sh\n").unwrap();

        assert!(env.has_app("foo-cli"));
        assert!(!env.has_app("missing"));
    }

    #[test]
    fn metadata_round_trip() {
        let temp = TempDir::new().unwrap();
        let env = EnvHandle::new(temp.path().to_path_buf());
        let meta = PackageMetadata {
            package: "foo".to_string(),
            apps: vec!["foo-cli".to_string()],
        };

        env.write_metadata(&meta).unwrap();
        assert_eq!(env.read_metadata().unwrap(), meta);
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let temp = TempDir::new().unwrap();
        let env = EnvHandle::new(temp.path().to_path_buf());
        assert!(matches!(
            env.read_metadata(),
            Err(RunxError::MetadataMissing(_))
        ));
    }
}
