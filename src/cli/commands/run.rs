//! Run command - resolve a target and execute it in the right environment
//!
//! The decision tree: classify the target as a local script, a remote
//! script, or a package spec; route scripts through requirement extraction
//! and packages through app resolution; reuse or build the cached
//! environment; hand the process over to the application.

use crate::advisory::{self, IndexOracle};
use crate::cache::{prepare_entry, CacheStore, Claim, FsStore};
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::env::{
    find_on_path, launch, EnvHandle, PipProvisioner, PlatformFamily, Provisioner,
};
use crate::error::{RunxError, RunxResult};
use crate::fingerprint::Fingerprint;
use crate::net;
use crate::script::{extract_requirements, Requirement};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What the user's target turned out to be
#[derive(Debug, PartialEq, Eq)]
enum TargetKind {
    /// An existing local file; its content is the script
    LocalScript(PathBuf),
    /// A URL with a scheme; content must be fetched
    RemoteScript(String),
    /// Anything else: a package specification
    Package,
}

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> RunxResult<()> {
    let store = FsStore::new(config.cache.dir(), config.cache.expiration_days);
    let provisioner = PipProvisioner;
    let interpreter = args
        .python
        .clone()
        .unwrap_or_else(|| config.interpreter.default.clone());

    // For package targets the app name is the bare distribution name even
    // when the target carries version constraints.
    let app_name = Requirement::parse(&args.target)
        .map(|r| r.name().to_string())
        .unwrap_or_else(|_| args.target.clone());

    if config.advisory.enabled && !args.no_advisory {
        let oracle = IndexOracle::new(&config.advisory.index_url);
        advisory::check_for_update(
            &app_name,
            &config.envs.dir(),
            &oracle,
            &provisioner,
            &config.advisory.upgrade_command,
        )
        .await;
    }

    // A --spec override skips content classification entirely: the spec is
    // the install source, the target stays the app name.
    let kind = if args.spec.is_some() {
        TargetKind::Package
    } else {
        classify_target(&args.target, args.path)?
    };

    match kind {
        TargetKind::LocalScript(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| RunxError::io(format!("reading script {}", path.display()), e))?;
            run_script(content, &args, &interpreter, &store, &provisioner).await
        }
        TargetKind::RemoteScript(url) => {
            info!("Detected url, downloading and executing as a script");
            let content = net::fetch_text(&url)?;
            run_script(content, &args, &interpreter, &store, &provisioner).await
        }
        TargetKind::Package => {
            let spec = args.spec.clone().unwrap_or_else(|| args.target.clone());
            run_package(&app_name, &spec, &args, &interpreter, &store, &provisioner).await
        }
    }
}

/// Classify the target without touching the network
fn classify_target(target: &str, path_required: bool) -> RunxResult<TargetKind> {
    let path = Path::new(target);
    if path.exists() {
        return Ok(TargetKind::LocalScript(path.to_path_buf()));
    }
    if path_required {
        return Err(RunxError::ScriptNotFound(path.to_path_buf()));
    }

    if has_url_scheme(target) {
        if !target.ends_with(".py") {
            return Err(RunxError::RemoteScriptSuffix(target.to_string()));
        }
        return Ok(TargetKind::RemoteScript(target.to_string()));
    }

    Ok(TargetKind::Package)
}

/// Whether the string parses as a URL with a scheme.
///
/// Single letters before the colon are excluded so Windows drive paths
/// like `C:\tools\x.py` don't classify as URLs.
fn has_url_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    scheme.len() >= 2
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Run script content, isolated when it declares requirements
async fn run_script(
    content: String,
    args: &RunArgs,
    interpreter: &str,
    store: &FsStore,
    provisioner: &dyn Provisioner,
) -> RunxResult<()> {
    let Some(requirements) = extract_requirements(&content)? else {
        // Pure code: no isolation, no cache involvement
        debug!("No requirements header, running with the ambient interpreter");
        let python = find_on_path(interpreter)
            .unwrap_or_else(|| PathBuf::from(interpreter));
        let never = launch::replace_process(&python, &script_argv(&content, &args.app_args), &[])?;
        match never {}
    };

    // The environment identity comes from the requirements, not the script
    // name: scripts sharing a normalized requirement set share an
    // environment, so fewer environments need managing.
    let fingerprint = Fingerprint::compute(
        &requirements,
        interpreter,
        &args.pip_args,
        &args.venv_args,
    );
    debug!("Script environment fingerprint: {fingerprint}");

    let use_cache = !args.no_cache;
    prepare_entry(store, &fingerprint, use_cache, None)?;

    let env = match store.claim(&fingerprint)? {
        Claim::Existing(path) => {
            info!("Reusing cached environment {}", path.display());
            EnvHandle::new(path)
        }
        Claim::Pending(pending) => {
            let pb = create_progress_bar("Creating environment...");
            let env = provisioner
                .create_env(pending.path(), interpreter, &args.venv_args)
                .await?;
            pb.set_message("Installing requirements...");
            provisioner
                .install_requirements(&env, &requirements, &args.pip_args)
                .await?;
            let path = pending.commit();
            pb.finish_and_clear();
            if !use_cache {
                store.mark_expired(&fingerprint)?;
            }
            EnvHandle::new(path)
        }
    };

    let never = launch::replace_process(
        &env.python_path(),
        &script_argv(&content, &args.app_args),
        &[],
    )?;
    match never {}
}

fn script_argv(content: &str, app_args: &[String]) -> Vec<String> {
    let mut argv = vec!["-c".to_string(), content.to_string()];
    argv.extend(app_args.iter().cloned());
    argv
}

/// Run an app from a package, reusing or building its cached environment
async fn run_package(
    app: &str,
    spec: &str,
    args: &RunArgs,
    interpreter: &str,
    store: &FsStore,
    provisioner: &dyn Provisioner,
) -> RunxResult<()> {
    if let Some(found) = find_on_path(app) {
        eprintln!(
            "{} {} is already on your PATH and installed at {}. Downloading and running anyway.",
            style("!").yellow(),
            app,
            found.display()
        );
    }

    let app_filename = launch::resolve_executable_name(app, PlatformFamily::current());
    debug!("Resolved app filename: {app_filename}");

    // A project-local __pypackages__ install wins over everything and
    // bypasses the cache entirely.
    let local_bin = local_packages_bin(&app_filename);
    if local_bin.is_file() {
        info!("Using app in local __pypackages__ directory at {}", local_bin.display());
        let never = launch::replace_process(&local_bin, &args.app_args, &local_packages_env())?;
        match never {}
    }
    if args.local {
        return Err(RunxError::LocalPackagesMissing(local_bin));
    }

    // The package spec itself is the single-element requirement set
    let requirements = vec![spec.to_string()];
    let fingerprint = Fingerprint::compute(
        &requirements,
        interpreter,
        &args.pip_args,
        &args.venv_args,
    );
    debug!("Package environment fingerprint: {fingerprint}");

    let use_cache = !args.no_cache;
    let expected_bin = EnvHandle::new(store.entry_path(&fingerprint)).app_path(&app_filename);
    prepare_entry(store, &fingerprint, use_cache, Some(&expected_bin))?;

    match store.claim(&fingerprint)? {
        Claim::Existing(path) => {
            let env = EnvHandle::new(path);
            if env.has_app(&app_filename) {
                info!("Reusing cached environment {}", env.root().display());
                let never = launch::replace_process(&env.app_path(&app_filename), &args.app_args, &[])?;
                match never {}
            }
            match env.read_metadata() {
                Ok(metadata) => {
                    // Cached env built for this spec, but under a different
                    // app name: resolve against the recorded apps.
                    finish_package(env, metadata, app, spec, args, store, &fingerprint, false)
                }
                Err(_) => {
                    // No metadata means a partial or foreign entry; rebuild
                    debug!("Cache entry {fingerprint} has no metadata, rebuilding");
                    store.clear(&fingerprint)?;
                    let Claim::Pending(pending) = store.claim(&fingerprint)? else {
                        return Err(RunxError::Internal(format!(
                            "cache entry {fingerprint} reappeared while rebuilding"
                        )));
                    };
                    build_package(pending, app, spec, args, interpreter, store, &fingerprint, provisioner)
                        .await
                }
            }
        }
        Claim::Pending(pending) => {
            info!("Environment location is {}", pending.path().display());
            build_package(pending, app, spec, args, interpreter, store, &fingerprint, provisioner)
                .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn build_package(
    pending: crate::cache::PendingEntry,
    app: &str,
    spec: &str,
    args: &RunArgs,
    interpreter: &str,
    store: &FsStore,
    fingerprint: &Fingerprint,
    provisioner: &dyn Provisioner,
) -> RunxResult<()> {
    let pb = create_progress_bar("Creating environment...");
    let env = provisioner
        .create_env(pending.path(), interpreter, &args.venv_args)
        .await?;
    pb.set_message(format!("Installing {spec}..."));
    let metadata = provisioner
        .install_package(&env, app, spec, &args.pip_args)
        .await?;
    let path = pending.commit();
    pb.finish_and_clear();

    finish_package(EnvHandle::new(path), metadata, app, spec, args, store, fingerprint, true)
}

/// Resolve the effective app inside a provisioned environment and launch it
#[allow(clippy::too_many_arguments)]
fn finish_package(
    env: EnvHandle,
    metadata: crate::env::PackageMetadata,
    app: &str,
    spec: &str,
    args: &RunArgs,
    store: &FsStore,
    fingerprint: &Fingerprint,
    freshly_built: bool,
) -> RunxResult<()> {
    let mut app = app.to_string();
    let mut app_filename = launch::resolve_executable_name(&app, PlatformFamily::current());

    if !env.has_app(&app_filename) {
        match resolve_app_fallback(&app, &metadata.package, &metadata.apps) {
            Some(substitute) => {
                println!("NOTE: running app '{substitute}' from '{}'", metadata.package);
                app = substitute.to_string();
                app_filename = launch::resolve_executable_name(&app, PlatformFamily::current());
            }
            None => {
                return Err(RunxError::app_not_found(
                    &app,
                    &metadata.package,
                    spec,
                    &metadata.apps,
                ));
            }
        }
    }

    // Expire fresh uncached builds before the exec: the directory stays in
    // place for this process and is swept by a future invocation.
    if args.no_cache && freshly_built {
        store.mark_expired(fingerprint)?;
    }

    let never = launch::replace_process(&env.app_path(&app_filename), &args.app_args, &[])?;
    match never {}
}

/// If the package declares exactly one app and the user asked for the
/// package by name, that app silently becomes the effective target.
fn resolve_app_fallback<'a>(requested: &str, package: &str, apps: &'a [String]) -> Option<&'a str> {
    if requested == package && apps.len() == 1 {
        Some(&apps[0])
    } else {
        None
    }
}

fn local_packages_bin(app_filename: &str) -> PathBuf {
    Path::new("__pypackages__").join("bin").join(app_filename)
}

fn local_packages_env() -> Vec<(String, String)> {
    let lib = Path::new("__pypackages__").join("lib");
    if lib.is_dir() {
        vec![("PYTHONPATH".to_string(), lib.display().to_string())]
    } else {
        Vec::new()
    }
}

fn create_progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EXPIRED_FILENAME;
    use crate::env::PackageMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Provisions by touching files: the bin directory gets one
    /// non-executable file per declared app, so the final launch fails in a
    /// recognizable way instead of replacing the test process.
    struct FakeProvisioner {
        apps: Vec<String>,
        env_builds: AtomicUsize,
    }

    impl FakeProvisioner {
        fn declaring(apps: &[&str]) -> Self {
            Self {
                apps: apps.iter().map(|s| s.to_string()).collect(),
                env_builds: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Provisioner for FakeProvisioner {
        async fn create_env(
            &self,
            root: &Path,
            _interpreter: &str,
            _venv_args: &[String],
        ) -> RunxResult<EnvHandle> {
            self.env_builds.fetch_add(1, Ordering::SeqCst);
            let env = EnvHandle::new(root.to_path_buf());
            std::fs::create_dir_all(env.bin_dir())
                .map_err(|e| RunxError::io("creating fake bin dir", e))?;
            Ok(env)
        }

        async fn install_requirements(
            &self,
            _env: &EnvHandle,
            _requirements: &[String],
            _pip_args: &[String],
        ) -> RunxResult<()> {
            Ok(())
        }

        async fn install_package(
            &self,
            env: &EnvHandle,
            package: &str,
            _spec: &str,
            _pip_args: &[String],
        ) -> RunxResult<PackageMetadata> {
            for app in &self.apps {
                std::fs::write(env.bin_dir().join(app), "")
                    .map_err(|e| RunxError::io("writing fake app", e))?;
            }
            let metadata = PackageMetadata {
                package: package.to_string(),
                apps: self.apps.clone(),
            };
            env.write_metadata(&metadata)?;
            Ok(metadata)
        }

        async fn installed_version(
            &self,
            _env: &EnvHandle,
            _package: &str,
        ) -> RunxResult<Option<String>> {
            Ok(None)
        }
    }

    fn package_args(no_cache: bool) -> RunArgs {
        RunArgs {
            target: "foo".to_string(),
            spec: None,
            path: false,
            python: None,
            pip_args: Vec::new(),
            venv_args: Vec::new(),
            local: false,
            no_cache,
            no_advisory: true,
            app_args: Vec::new(),
        }
    }

    fn package_fingerprint() -> Fingerprint {
        Fingerprint::compute(&["foo".to_string()], "python3", &[], &[])
    }

    #[tokio::test]
    async fn uncached_fresh_build_is_marked_for_expiry() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("cache"), 14);
        let provisioner = FakeProvisioner::declaring(&["foo"]);
        let args = package_args(true);

        let err = run_package("foo", "foo", &args, "python3", &store, &provisioner)
            .await
            .unwrap_err();
        assert!(matches!(err, RunxError::Launch { .. }));

        // The marker is written before the launch attempt, and the
        // directory itself survives until a later sweep.
        let entry = store.entry_path(&package_fingerprint());
        assert!(entry.join(EXPIRED_FILENAME).exists());
        assert!(entry.is_dir());
    }

    #[tokio::test]
    async fn cached_build_is_not_marked_and_gets_reused() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("cache"), 14);
        let provisioner = FakeProvisioner::declaring(&["foo"]);
        let args = package_args(false);

        let err = run_package("foo", "foo", &args, "python3", &store, &provisioner)
            .await
            .unwrap_err();
        assert!(matches!(err, RunxError::Launch { .. }));
        let entry = store.entry_path(&package_fingerprint());
        assert!(!entry.join(EXPIRED_FILENAME).exists());

        // Same inputs again: the existing entry is reused without another
        // provisioning round.
        let err = run_package("foo", "foo", &args, "python3", &store, &provisioner)
            .await
            .unwrap_err();
        assert!(matches!(err, RunxError::Launch { .. }));
        assert_eq!(provisioner.env_builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn package_run_substitutes_its_single_declared_app() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("cache"), 14);
        let provisioner = FakeProvisioner::declaring(&["foo-cli"]);
        let args = package_args(false);

        let err = run_package("foo", "foo", &args, "python3", &store, &provisioner)
            .await
            .unwrap_err();
        match err {
            RunxError::Launch { command, .. } => assert!(command.ends_with("foo-cli")),
            other => panic!("expected a launch attempt on foo-cli, got {other}"),
        }
    }

    #[tokio::test]
    async fn package_with_multiple_apps_lists_alternatives() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("cache"), 14);
        let provisioner = FakeProvisioner::declaring(&["a", "b"]);
        let args = package_args(false);

        let err = run_package("foo", "foo", &args, "python3", &store, &provisioner)
            .await
            .unwrap_err();
        assert!(matches!(err, RunxError::AppNotFound { .. }));
        let msg = err.to_string();
        assert!(msg.contains("'foo' executable script not found"));
        assert!(msg.contains("a - usage: 'runx run --spec foo a [arguments?]'"));
        assert!(msg.contains("b - usage: 'runx run --spec foo b [arguments?]'"));
    }

    #[test]
    fn classify_existing_path_is_script() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("tool.py");
        std::fs::write(&script, "print('hi')").unwrap();

        let kind = classify_target(script.to_str().unwrap(), false).unwrap();
        assert_eq!(kind, TargetKind::LocalScript(script));
    }

    #[test]
    fn classify_missing_mandated_path_fails() {
        let err = classify_target("/definitely/not/here.py", true).unwrap_err();
        assert!(matches!(err, RunxError::ScriptNotFound(_)));
    }

    #[test]
    fn classify_url_requires_py_suffix() {
        let kind = classify_target("https://example.test/tool.py", false).unwrap();
        assert_eq!(
            kind,
            TargetKind::RemoteScript("https://example.test/tool.py".to_string())
        );

        let err = classify_target("https://example.test/tool", false).unwrap_err();
        assert!(matches!(err, RunxError::RemoteScriptSuffix(_)));
    }

    #[test]
    fn classify_name_is_package() {
        assert_eq!(classify_target("black", false).unwrap(), TargetKind::Package);
        assert_eq!(
            classify_target("black==24.1.0", false).unwrap(),
            TargetKind::Package
        );
    }

    #[test]
    fn url_scheme_detection() {
        assert!(has_url_scheme("https://example.test/x.py"));
        assert!(has_url_scheme("ftp://example.test/x.py"));
        assert!(!has_url_scheme("black"));
        assert!(!has_url_scheme("black==1.0"));
        // Windows drive letters are not schemes
        assert!(!has_url_scheme(r"C:\tools\x.py"));
    }

    #[test]
    fn single_app_fallback_substitutes() {
        let apps = vec!["foo-cli".to_string()];
        assert_eq!(resolve_app_fallback("foo", "foo", &apps), Some("foo-cli"));
    }

    #[test]
    fn fallback_requires_package_name_match() {
        let apps = vec!["foo-cli".to_string()];
        assert_eq!(resolve_app_fallback("other", "foo", &apps), None);
    }

    #[test]
    fn fallback_requires_exactly_one_app() {
        let apps = vec!["a".to_string(), "b".to_string()];
        assert_eq!(resolve_app_fallback("foo", "foo", &apps), None);
        assert_eq!(resolve_app_fallback("foo", "foo", &[]), None);
    }

    #[test]
    fn script_argv_layout() {
        let argv = script_argv("print('x')", &["--flag".to_string()]);
        assert_eq!(argv, vec!["-c", "print('x')", "--flag"]);
    }
}
