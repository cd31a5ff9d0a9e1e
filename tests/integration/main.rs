//! Integration tests for runx

mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn runx() -> Command {
        Command::cargo_bin("runx").unwrap()
    }

    /// Config pointing every state directory into the temp dir, with the
    /// advisory check disabled so tests never touch the network.
    fn write_config(temp: &TempDir) -> std::path::PathBuf {
        let config_path = temp.path().join("config.toml");
        let content = format!(
            "[cache]\ndir = \"{}\"\n\n[envs]\ndir = \"{}\"\n\n[advisory]\nenabled = false\n",
            temp.path().join("cache").display(),
            temp.path().join("venvs").display(),
        );
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    fn help_displays() {
        runx()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("disposable cached"));
    }

    #[test]
    fn version_displays() {
        runx()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("runx"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);

        runx()
            .args(["--config", config.to_str().unwrap(), "cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached environments"));
    }

    #[test]
    fn cache_sweep_empty() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);

        runx()
            .args(["--config", config.to_str().unwrap(), "cache", "sweep"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to sweep"));
    }

    #[test]
    fn run_missing_mandated_path_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);

        runx()
            .args([
                "--config",
                config.to_str().unwrap(),
                "run",
                "--path",
                "/definitely/not/here.py",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does not exist"));
    }

    #[test]
    fn run_remote_script_requires_py_suffix() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);

        runx()
            .args([
                "--config",
                config.to_str().unwrap(),
                "run",
                "https://example.invalid/tool",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains(".py"));
    }

    #[test]
    fn run_script_with_malformed_requirement_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);
        let script = temp.path().join("bad.py");
        fs::write(&script, "# Requirements:\n# not a valid requirement!\nprint('hi')\n").unwrap();

        runx()
            .args([
                "--config",
                config.to_str().unwrap(),
                "run",
                script.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid requirement"));

        // A failed run leaves no cache entries behind
        assert!(!temp.path().join("cache").exists());
    }

    #[test]
    fn run_local_without_pypackages_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);

        runx()
            .current_dir(temp.path())
            .args([
                "--config",
                config.to_str().unwrap(),
                "run",
                "--local",
                "some-app-that-is-not-installed",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("was not found"));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        fs::write(&config, "not valid [[[").unwrap();

        runx()
            .args(["--config", config.to_str().unwrap(), "cache", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
