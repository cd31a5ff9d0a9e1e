//! Advisory "newer version available" check
//!
//! A secondary, independently-expiring cache of the same shape as the
//! environment cache: a single `version-check` marker file inside an app's
//! persistent environment directory. The marker's age alone gates whether a
//! remote check is attempted, and it is refreshed *before* the query so
//! rapid subsequent invocations don't re-check redundantly.
//!
//! Everything here is best-effort. A failure anywhere aborts the check,
//! emits a diagnostic, and the run proceeds as if no newer version exists.

use crate::env::{EnvHandle, Provisioner};
use crate::error::{RunxError, RunxResult};
use crate::net;
use console::style;
use semver::Version;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Marker file gating the periodic version check
pub const MARKER_FILENAME: &str = "version-check";

/// How long a marker suppresses re-checking
pub const CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether a marker of this age calls for a fresh check.
///
/// `None` means no marker exists yet; that always triggers a check.
pub fn is_stale(marker_age: Option<Duration>) -> bool {
    marker_age.is_none_or(|age| age > CHECK_INTERVAL)
}

/// Age of the marker file, from its modification time
fn marker_age(marker: &Path) -> Option<Duration> {
    let modified = fs::metadata(marker).and_then(|m| m.modified()).ok()?;
    Some(modified.elapsed().unwrap_or(Duration::ZERO))
}

/// Answers "what is the latest published version of this package?"
pub trait VersionOracle {
    fn latest_published_version(&self, name: &str) -> RunxResult<Option<Version>>;
}

/// Version oracle backed by the package index's JSON API
pub struct IndexOracle {
    index_url: String,
}

impl IndexOracle {
    pub fn new(index_url: &str) -> Self {
        Self {
            index_url: index_url.trim_end_matches('/').to_string(),
        }
    }
}

impl VersionOracle for IndexOracle {
    fn latest_published_version(&self, name: &str) -> RunxResult<Option<Version>> {
        let url = format!("{}/pypi/{name}/json", self.index_url);
        let body = net::fetch_text(&url)?;
        Ok(version_from_index_json(&body).as_deref().and_then(parse_version_lenient))
    }
}

/// Pull `info.version` out of an index JSON document
fn version_from_index_json(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("info")?
        .get("version")?
        .as_str()
        .map(str::to_string)
}

/// Parse a version leniently into semantic-ordering form.
///
/// Python package versions are frequently two-component (`2.32`) or carry a
/// `v` prefix; missing components are padded with zero. Anything that
/// doesn't yield a leading numeric component aborts the check upstream.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }
    let mut parts = s.split('.').map(|p| p.parse::<u64>().ok());
    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

/// Run the advisory check for `app`, swallowing every failure.
///
/// `envs_dir` is the root of persistent per-app environments; apps that
/// were never installed persistently have no directory there and are
/// skipped.
pub async fn check_for_update(
    app: &str,
    envs_dir: &Path,
    oracle: &dyn VersionOracle,
    provisioner: &dyn Provisioner,
    upgrade_command: &[String],
) {
    let env_dir = envs_dir.join(app);
    if !env_dir.is_dir() {
        debug!("No persistent environment for {app}, skipping version check");
        return;
    }

    let marker = env_dir.join(MARKER_FILENAME);
    if !is_stale(marker_age(&marker)) {
        debug!("Version check for {app} is fresh, skipping");
        return;
    }

    // Refresh the marker before checking, so concurrent or rapid
    // subsequent invocations don't redundantly re-check.
    if let Err(e) = fs::File::create(&marker) {
        debug!("Could not write version-check marker for {app}: {e}");
        return;
    }

    if let Err(e) = try_check(app, &env_dir, oracle, provisioner, upgrade_command).await {
        debug!("Version check for {app} failed: {e}");
    }
}

async fn try_check(
    app: &str,
    env_dir: &Path,
    oracle: &dyn VersionOracle,
    provisioner: &dyn Provisioner,
    upgrade_command: &[String],
) -> RunxResult<()> {
    let Some(latest) = oracle.latest_published_version(app)? else {
        debug!("No published version found for {app}");
        return Ok(());
    };

    let env = EnvHandle::new(env_dir.to_path_buf());
    let Some(current) = provisioner
        .installed_version(&env, app)
        .await?
        .as_deref()
        .and_then(parse_version_lenient)
    else {
        debug!("Installed version of {app} is unknown or unparseable");
        return Ok(());
    };

    if latest <= current {
        debug!("{app} {current} is up to date (latest {latest})");
        return Ok(());
    }

    info!("{app} {current} is out of date, latest is {latest}");
    if upgrade_command.is_empty() {
        eprintln!(
            "{} A newer version of {} is available ({} -> {})",
            style("note:").cyan(),
            app,
            current,
            latest
        );
        return Ok(());
    }

    let status = Command::new(&upgrade_command[0])
        .args(&upgrade_command[1..])
        .arg(app)
        .status()
        .await
        .map_err(|e| RunxError::command_failed(upgrade_command.join(" "), e))?;
    if !status.success() {
        return Err(RunxError::command_exec(
            upgrade_command.join(" "),
            format!("exit status {status}"),
        ));
    }
    Ok(())
}
