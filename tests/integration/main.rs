//! Integration tests for olcli

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A config file whose state directory lives in a temp dir
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let state = dir.path().join("state");
            let config = format!(
                "[service]\nbase_url = \"https://ol.invalid\"\n\n[paths]\nstate_dir = {:?}\n",
                state.display().to_string()
            );
            fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn state_dir(&self) -> PathBuf {
            self.dir.path().join("state")
        }

        fn olcli(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("olcli");
            cmd.env("OLCLI_CONFIG", self.config_path())
                .env_remove("OLCLI_EMAIL")
                .env_remove("OLCLI_PASSWORD");
            cmd
        }

        fn seed_cache(&self, content: &str) {
            fs::create_dir_all(self.state_dir()).unwrap();
            fs::write(self.state_dir().join("compile-cache.json"), content).unwrap();
        }
    }

    fn olcli() -> Command {
        cargo_bin_cmd!("olcli")
    }

    fn exists(path: &Path) -> bool {
        path.try_exists().unwrap()
    }

    #[test]
    fn help_displays() {
        olcli()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Overleaf"))
            .stdout(predicate::str::contains("compile"));
    }

    #[test]
    fn version_displays() {
        olcli()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("olcli"));
    }

    #[test]
    fn config_path_uses_flag() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[service]"))
            .stdout(predicate::str::contains("ttl_secs = 600"))
            .stdout(predicate::str::contains("https://ol.invalid"));
    }

    #[test]
    fn config_set_persists() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["config", "set", "cache.ttl_secs", "120"])
            .assert()
            .success();

        sandbox
            .olcli()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ttl_secs = 120"));
    }

    #[test]
    fn config_set_unknown_key() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let sandbox = Sandbox::new();
        fs::write(
            sandbox.config_path(),
            "[service]\nbase_url = \"ftp://ol.invalid\"\n",
        )
        .unwrap();

        sandbox
            .olcli()
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn logout_without_session() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("No stored session"));
    }

    #[test]
    fn logout_removes_session_files() {
        let sandbox = Sandbox::new();
        let state = sandbox.state_dir();
        fs::create_dir_all(&state).unwrap();
        fs::write(state.join("cookies.json"), "{}").unwrap();
        fs::write(state.join("csrf"), "token").unwrap();

        sandbox
            .olcli()
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged out"));

        assert!(!exists(&state.join("cookies.json")));
        assert!(!exists(&state.join("csrf")));
    }

    #[test]
    fn download_unknown_artifact_without_compile() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["download", "pdf", "--project", "P1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown artifact 'pdf'"))
            .stderr(predicate::str::contains("olcli compile"));
    }

    #[test]
    fn download_unknown_artifact_lists_cached_types() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache(r#"{"P1D1": {"pdf": "/p/P1/build/abc.pdf", "log": "/p/P1/build/abc.log", "expired": 4102444800}}"#);

        sandbox
            .olcli()
            .args(["download", "bbl", "--project", "P1", "--doc", "D1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Available: log, pdf"));
    }

    #[test]
    fn download_archive_requires_project() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["download", "zip"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--project"));
    }

    #[test]
    fn download_output_type_requires_project() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["download", "pdf"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("requires --project"));
    }

    #[test]
    fn projects_without_session_or_terminal() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .arg("projects")
            .assert()
            .failure()
            .stderr(predicate::str::contains("OLCLI_EMAIL"));
    }

    #[test]
    fn cache_list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached compile results"));

        sandbox
            .olcli()
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn cache_list_shows_entries() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache(r#"{"P1D1": {"pdf": "/p/P1/build/abc.pdf", "expired": 1700000600}}"#);

        sandbox
            .olcli()
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"key\": \"P1D1\""))
            .stdout(predicate::str::contains("\"fresh\": false"));
    }

    #[test]
    fn cache_clear_with_yes() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache(r#"{"P1D1": {"pdf": "/p/P1/build/abc.pdf", "expired": 1700000600}}"#);

        sandbox
            .olcli()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1"));

        assert!(!exists(&sandbox.state_dir().join("compile-cache.json")));
    }

    #[test]
    fn compile_rejects_bad_project_url() {
        let sandbox = Sandbox::new();
        sandbox
            .olcli()
            .args(["compile", "https://ol.invalid/settings"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("project id"));
    }
}
