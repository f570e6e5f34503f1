//! Integration tests for the pkghub binary

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Workspace with its own config file and catalog database
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "database: {}\nhttpTimeout: 5\n",
            dir.path().join("catalog.db").display()
        );
        std::fs::write(dir.path().join("config.yaml"), config).unwrap();
        Self { dir }
    }

    fn config_path(&self) -> &Path {
        self.dir.path()
    }

    /// Run pkghub, optionally acting as a user
    fn run(&self, as_user: Option<&str>, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pkghub"));
        cmd.arg("--config")
            .arg(self.config_path().join("config.yaml"))
            .env_remove("PKGHUB_USER")
            .env_remove("PKGHUB_LOG")
            .env_remove("PKGHUB_REPO_PASSWORD")
            .env_remove("CLICOLOR_FORCE");
        if let Some(user) = as_user {
            cmd.args(["--as-user", user]);
        }
        cmd.args(args).output().expect("Failed to execute pkghub")
    }

    fn ok(&self, as_user: Option<&str>, args: &[&str]) -> String {
        let output = self.run(as_user, args);
        assert!(
            output.status.success(),
            "pkghub {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Register alice and bob, with alice a member of acme
    fn seeded() -> Self {
        let ws = Self::new();
        ws.ok(None, &["user", "add", "alice", "--email", "alice@example.com"]);
        ws.ok(None, &["user", "add", "bob", "--email", "bob@example.com"]);
        ws.ok(Some("alice"), &["org", "add", "acme", "--display-name", "Acme"]);
        ws
    }
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

mod repo_command {
    use super::*;

    #[test]
    fn test_add_and_list_json() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &[
                "repo",
                "add",
                "charts",
                "https://charts.example.com",
                "--private",
                "--username",
                "user",
                "--password",
                "secret",
            ],
        );

        let stdout = ws.ok(None, &["repo", "list", "--json"]);
        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("Output should be valid JSON");
        let repos = json.as_array().unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0]["name"], "charts");
        assert_eq!(repos[0]["kind"], 0);
        assert_eq!(repos[0]["user_alias"], "alice");
        assert_eq!(repos[0]["auth_user"], "");
        assert_eq!(repos[0]["auth_pass"], "");

        let stdout = ws.ok(None, &["repo", "list", "--json", "--show-auth"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json[0]["auth_pass"], "secret");
    }

    #[test]
    fn test_list_table() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com"],
        );
        ws.ok(
            Some("alice"),
            &[
                "repo",
                "add",
                "rules",
                "https://github.com/acme/rules",
                "--kind",
                "falco",
                "--org",
                "acme",
            ],
        );
        ws.ok(None, &["repo", "verify", "rules"]);

        let stdout = ws.ok(None, &["repo", "list"]);
        insta::assert_snapshot!(stdout.trim_end(), @r"
        NAME                     KIND   OWNER            STATUS   URL
        charts                   helm   alice            -        https://charts.example.com
        rules                    falco  org:acme         verified https://github.com/acme/rules
        ");
    }

    #[test]
    fn test_list_by_org_and_kind() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com"],
        );
        ws.ok(
            Some("alice"),
            &[
                "repo",
                "add",
                "ops",
                "https://github.com/acme/ops",
                "--kind",
                "olm",
                "--org",
                "acme",
            ],
        );

        let stdout = ws.ok(Some("alice"), &["repo", "list", "--org", "acme", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "ops");

        // Organization listings are for members only
        let output = ws.run(None, &["repo", "list", "--org", "acme", "--show-auth"]);
        assert_eq!(exit_code(&output), 4);
        let output = ws.run(Some("bob"), &["repo", "list", "--org", "acme", "--show-auth"]);
        assert_eq!(exit_code(&output), 4);

        let stdout = ws.ok(None, &["repo", "list", "--kind", "helm", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "charts");

        let stdout = ws.ok(Some("alice"), &["repo", "list", "--mine", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_add_requires_user() {
        let ws = Workspace::seeded();
        let output = ws.run(None, &["repo", "add", "charts", "https://charts.example.com"]);
        assert_eq!(exit_code(&output), 4);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("--as-user"));
    }

    #[test]
    fn test_unknown_acting_user() {
        let ws = Workspace::seeded();
        let output = ws.run(Some("mallory"), &["repo", "list"]);
        assert_eq!(exit_code(&output), 3);
    }

    #[test]
    fn test_invalid_kind() {
        let ws = Workspace::seeded();
        let output = ws.run(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com", "--kind", "npm"],
        );
        assert_eq!(exit_code(&output), 2);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("helm, falco, opa, olm"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let ws = Workspace::seeded();
        let output = ws.run(
            Some("alice"),
            &["repo", "add", "rules", "oci://ghcr.io/acme/rules", "--kind", "falco"],
        );
        assert_eq!(exit_code(&output), 2);
    }

    #[test]
    fn test_duplicate_name_in_same_scope() {
        let ws = Workspace::seeded();
        let args = ["repo", "add", "charts", "https://charts.example.com"];
        ws.ok(Some("alice"), &args);

        let output = ws.run(Some("alice"), &args);
        assert_eq!(exit_code(&output), 6);

        // Another owner scope may reuse the name
        ws.ok(Some("bob"), &args);
    }

    #[test]
    fn test_show_and_delete() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com"],
        );

        let stdout = ws.ok(Some("alice"), &["repo", "show", "charts", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json["url"], "https://charts.example.com");
        assert!(json["repository_id"].as_str().is_some());

        // Repositories outside the caller's scopes are invisible to delete
        let output = ws.run(Some("bob"), &["repo", "delete", "charts"]);
        assert_eq!(exit_code(&output), 3);

        ws.ok(Some("alice"), &["repo", "delete", "charts"]);
        let output = ws.run(Some("alice"), &["repo", "show", "charts"]);
        assert_eq!(exit_code(&output), 3);
    }

    #[test]
    fn test_update_keeps_kind() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com"],
        );
        ws.ok(
            Some("alice"),
            &[
                "repo",
                "update",
                "charts",
                "--url",
                "https://new.example.com",
                "--display-name",
                "Charts",
            ],
        );

        let stdout = ws.ok(None, &["repo", "show", "charts", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json["url"], "https://new.example.com");
        assert_eq!(json["display_name"], "Charts");
        assert_eq!(json["kind"], 0);
    }

    #[test]
    fn test_transfer_to_org() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com"],
        );
        ws.ok(Some("alice"), &["repo", "transfer", "charts", "--org", "acme"]);

        let stdout = ws.ok(None, &["repo", "show", "charts", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json["organization_name"], "acme");
        assert!(json.get("user_id").is_none());

        // bob is not a member of acme
        let output = ws.run(Some("bob"), &["repo", "transfer", "charts"]);
        assert_ne!(exit_code(&output), 0);
    }

    #[test]
    fn test_available() {
        let ws = Workspace::seeded();
        ws.ok(
            Some("alice"),
            &["repo", "add", "charts", "https://charts.example.com"],
        );

        let stdout = ws.ok(None, &["repo", "available", "repositoryName", "charts"]);
        assert!(stdout.contains("is taken"));
        let stdout = ws.ok(None, &["repo", "available", "userAlias", "carol"]);
        assert!(stdout.contains("is available"));

        let output = ws.run(None, &["repo", "available", "packageName", "x"]);
        assert_eq!(exit_code(&output), 2);
    }
}

mod org_command {
    use super::*;

    #[test]
    fn test_add_member() {
        let ws = Workspace::seeded();

        // bob cannot add himself to an organization he is not in
        let output = ws.run(Some("bob"), &["org", "add-member", "acme", "bob"]);
        assert_eq!(exit_code(&output), 4);

        ws.ok(Some("alice"), &["org", "add-member", "acme", "bob"]);
        ws.ok(
            Some("bob"),
            &[
                "repo",
                "add",
                "charts",
                "https://charts.example.com",
                "--org",
                "acme",
            ],
        );
    }

    #[test]
    fn test_add_member_unknown_org() {
        let ws = Workspace::seeded();
        let output = ws.run(Some("alice"), &["org", "add-member", "nope", "bob"]);
        assert_eq!(exit_code(&output), 3);
    }
}
