#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const SCHEMA: &str = r#"{
  "models": {
    "person": {
      "plural": "people",
      "relations": {
        "posts": { "type": "hasMany", "model": "post", "foreignKey": "authorId" }
      }
    },
    "post": {
      "relations": {
        "author": { "type": "belongsTo", "model": "person" },
        "comments": { "type": "hasMany", "model": "comment" },
        "tags": { "type": "hasMany", "model": "tag", "through": "postTag" }
      }
    },
    "comment": {
      "relations": {
        "post": { "type": "belongsTo", "model": "post" }
      }
    },
    "tag": { "idType": "string" },
    "postTag": {}
  }
}"#;

pub const DATA: &str = r#"{
  "person": [
    { "id": 1, "name": "Ada" },
    { "id": 2, "name": "Grace" }
  ],
  "post": [
    { "id": 1, "title": "Hello", "authorId": 1 }
  ],
  "comment": [
    { "id": 1, "body": "a", "postId": 1 },
    { "id": 2, "body": "b", "postId": 1 },
    { "id": 3, "body": "c", "postId": 1 }
  ],
  "tag": [
    { "id": "rust", "label": "Rust" },
    { "id": "web", "label": "Web" }
  ],
  "postTag": [
    { "id": 1, "postId": 1, "tagId": "rust" }
  ]
}"#;

/// Schema and data files in a temporary directory, plus an isolated HOME.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("schema.json"), SCHEMA).expect("write schema");
        std::fs::write(dir.path().join("data.json"), DATA).expect("write data");
        std::fs::create_dir_all(dir.path().join("home")).expect("create home");
        Self { dir }
    }

    pub fn schema(&self) -> PathBuf {
        self.dir.path().join("schema.json")
    }

    pub fn data(&self) -> PathBuf {
        self.dir.path().join("data.json")
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Run a subcommand with `--schema` and `--data` pointing at the fixture.
    pub fn run(&self, command: &str, args: &[&str]) -> Output {
        let schema = self.schema();
        let data = self.data();
        let mut full = vec![
            command,
            "--schema",
            schema.to_str().expect("utf-8 path"),
            "--data",
            data.to_str().expect("utf-8 path"),
        ];
        full.extend_from_slice(args);
        run_cli_with_home(&full, &self.home())
    }

    pub fn run_success(&self, command: &str, args: &[&str]) -> String {
        let output = self.run(command, args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {} {:?}\nstderr: {}", command, args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

/// Run the CLI binary with an isolated HOME and no link environment.
pub fn run_cli_with_home(args: &[&str], home: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_relink"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env_remove("RELINK_HOST");
    cmd.env_remove("RELINK_BASE_PATH");
    cmd.env_remove("RELINK_SCHEMA");
    cmd.env_remove("RELINK_DATA");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Parse stdout as one JSON document.
pub fn parse_document(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout is a JSON document")
}
