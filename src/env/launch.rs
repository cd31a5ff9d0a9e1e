//! Process launch and executable name resolution
//!
//! The final action of a successful run replaces this process image with
//! the target application. `replace_process` is modeled as returning
//! `Infallible`: it either never returns or yields a launch error.

use crate::error::{RunxError, RunxResult};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Operating system families with distinct executable naming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Unix,
    Windows,
}

impl PlatformFamily {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

/// Executable filename for an app name on the given platform family.
///
/// The app name and the executable filename are distinct identities: on
/// Windows the filename carries an `.exe` suffix.
pub fn resolve_executable_name(app: &str, platform: PlatformFamily) -> String {
    match platform {
        PlatformFamily::Windows => format!("{app}.exe"),
        PlatformFamily::Unix => app.to_string(),
    }
}

/// Search the ambient PATH for an executable with this name
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in(std::env::split_paths(&path_var), name)
}

fn find_in(dirs: impl Iterator<Item = PathBuf>, name: &str) -> Option<PathBuf> {
    let filename = resolve_executable_name(name, PlatformFamily::current());
    dirs.map(|dir| dir.join(&filename)).find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Replace the current process image with `program`.
///
/// On success this never returns: the target application takes over the
/// process. On failure the error reports the command that could not be
/// launched. Extra environment variables are applied on top of the
/// inherited environment.
pub fn replace_process(
    program: &Path,
    args: &[String],
    extra_env: &[(String, String)],
) -> RunxResult<Infallible> {
    debug!("Executing {} with {} argument(s)", program.display(), args.len());

    let mut command = Command::new(program);
    command.args(args);
    for (key, value) in extra_env {
        command.env(key, value);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // exec only returns on failure
        let err = command.exec();
        Err(RunxError::Launch {
            command: program.display().to_string(),
            source: err,
        })
    }

    #[cfg(not(unix))]
    {
        let status = command.status().map_err(|e| RunxError::Launch {
            command: program.display().to_string(),
            source: e,
        })?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_name_per_platform() {
        assert_eq!(resolve_executable_name("foo", PlatformFamily::Unix), "foo");
        assert_eq!(
            resolve_executable_name("foo", PlatformFamily::Windows),
            "foo.exe"
        );
        assert_eq!(
            resolve_executable_name("foo-cli", PlatformFamily::Windows),
            "foo-cli.exe"
        );
    }

    #[cfg(unix)]
    #[test]
    fn find_in_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("plain");
        std::fs::write(&plain, "").unwrap();

        let exec = temp.path().join("tool");
        std::fs::write(&exec, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exec, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dirs = || vec![temp.path().to_path_buf()].into_iter();
        assert_eq!(find_in(dirs(), "tool"), Some(exec));
        assert_eq!(find_in(dirs(), "plain"), None);
        assert_eq!(find_in(dirs(), "missing"), None);
    }

    #[test]
    fn replace_process_reports_missing_program() {
        #[cfg(unix)]
        {
            // exec of a nonexistent path fails before any replacement, so
            // the test process survives to observe the error
            let err = replace_process(Path::new("/nonexistent/definitely-missing"), &[], &[])
                .unwrap_err();
            assert!(err.to_string().contains("Failed to launch"));
        }
    }
}
