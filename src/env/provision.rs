//! Environment provisioning
//!
//! Narrow contract over the external tools that actually build isolated
//! runtimes: `python -m venv` for environment creation and `pip` for
//! installs. The trait exists so run resolution can be exercised against a
//! fake without spawning interpreters.

use crate::env::{EnvHandle, PackageMetadata};
use crate::error::{RunxError, RunxResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Provisions isolated environments and installs into them
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create a virtual environment at `root` using the given interpreter
    async fn create_env(
        &self,
        root: &Path,
        interpreter: &str,
        venv_args: &[String],
    ) -> RunxResult<EnvHandle>;

    /// Install a set of requirement specifiers into the environment
    async fn install_requirements(
        &self,
        env: &EnvHandle,
        requirements: &[String],
        pip_args: &[String],
    ) -> RunxResult<()>;

    /// Install a package (with its apps) and report what it declared.
    ///
    /// The returned metadata is also persisted into the environment so a
    /// cached entry can resolve apps later without reinstalling.
    async fn install_package(
        &self,
        env: &EnvHandle,
        package: &str,
        spec: &str,
        pip_args: &[String],
    ) -> RunxResult<PackageMetadata>;

    /// Version of an installed package, `None` when it isn't installed
    async fn installed_version(&self, env: &EnvHandle, package: &str) -> RunxResult<Option<String>>;
}

/// The real provisioner, shelling out to venv and pip
pub struct PipProvisioner;

#[async_trait]
impl Provisioner for PipProvisioner {
    async fn create_env(
        &self,
        root: &Path,
        interpreter: &str,
        venv_args: &[String],
    ) -> RunxResult<EnvHandle> {
        info!("Creating environment at {}", root.display());
        let output = Command::new(interpreter)
            .arg("-m")
            .arg("venv")
            .args(venv_args)
            .arg(root)
            .output()
            .await
            .map_err(|e| RunxError::command_failed(format!("{interpreter} -m venv"), e))?;

        if !output.status.success() {
            return Err(RunxError::EnvCreate {
                path: root.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(EnvHandle::new(root.to_path_buf()))
    }

    async fn install_requirements(
        &self,
        env: &EnvHandle,
        requirements: &[String],
        pip_args: &[String],
    ) -> RunxResult<()> {
        if requirements.is_empty() {
            debug!("No requirements to install");
            return Ok(());
        }
        info!("Installing {} requirement(s)", requirements.len());
        run_pip(env, pip_args, requirements).await.map_err(|reason| {
            RunxError::Install {
                what: requirements.join(", "),
                reason,
            }
        })
    }

    async fn install_package(
        &self,
        env: &EnvHandle,
        package: &str,
        spec: &str,
        pip_args: &[String],
    ) -> RunxResult<PackageMetadata> {
        info!("Installing package {spec}");
        let before = bin_entries(env)?;

        let target = [spec.to_string()];
        run_pip(env, pip_args, &target)
            .await
            .map_err(|reason| RunxError::Install {
                what: spec.to_string(),
                reason,
            })?;

        let after = bin_entries(env)?;
        let apps: Vec<String> = after.difference(&before).cloned().collect();
        debug!("Package {package} declared {} app(s)", apps.len());

        let metadata = PackageMetadata {
            package: package.to_string(),
            apps,
        };
        env.write_metadata(&metadata)?;
        Ok(metadata)
    }

    async fn installed_version(&self, env: &EnvHandle, package: &str) -> RunxResult<Option<String>> {
        let output = Command::new(env.python_path())
            .args(["-m", "pip", "show", package])
            .output()
            .await
            .map_err(|e| RunxError::command_failed("pip show", e))?;

        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_pip_show_version(&stdout))
    }
}

async fn run_pip(env: &EnvHandle, pip_args: &[String], targets: &[String]) -> Result<(), String> {
    let output = Command::new(env.python_path())
        .args(["-m", "pip", "install"])
        .args(pip_args)
        .args(targets)
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Names in the environment's bin directory, excluding the tooling that
/// venv itself installs.
fn bin_entries(env: &EnvHandle) -> RunxResult<BTreeSet<String>> {
    let bin = env.bin_dir();
    let mut names = BTreeSet::new();
    let iter = fs::read_dir(&bin)
        .map_err(|e| RunxError::io(format!("reading bin directory {}", bin.display()), e))?;
    for entry in iter {
        let entry = entry.map_err(|e| RunxError::io("reading bin directory entry", e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_venv_tooling(&name) {
            names.insert(name);
        }
    }
    Ok(names)
}

fn is_venv_tooling(name: &str) -> bool {
    let stem = name.strip_suffix(".exe").unwrap_or(name);
    stem.starts_with("python")
        || stem.starts_with("pip")
        || stem.starts_with("activate")
        || stem.starts_with("Activate")
        || stem.ends_with(".bat")
        || stem.ends_with(".ps1")
}

fn parse_pip_show_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Version:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venv_tooling_is_excluded() {
        assert!(is_venv_tooling("python"));
        assert!(is_venv_tooling("python3.12"));
        assert!(is_venv_tooling("pip3"));
        assert!(is_venv_tooling("activate"));
        assert!(is_venv_tooling("Activate.ps1"));
        assert!(is_venv_tooling("pip.exe"));
        assert!(!is_venv_tooling("foo-cli"));
        assert!(!is_venv_tooling("black"));
    }

    #[test]
    fn pip_show_version_parses() {
        let output = "Name: requests\nVersion: 2.32.3\nSummary: HTTP for Humans\n";
        assert_eq!(parse_pip_show_version(output), Some("2.32.3".to_string()));
    }

    #[test]
    fn pip_show_version_missing() {
        assert_eq!(parse_pip_show_version("Name: requests\n"), None);
        assert_eq!(parse_pip_show_version("Version: \n"), None);
    }
}
