//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing gt CLI behavior plus a town
//! scaffold and a stub `bd` binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns the path to a binary, checking llvm-cov target directory first.
/// This works with both standard builds and llvm-cov coverage runs.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. compiled by a removed worktree
/// into a shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    // Check for llvm-cov target directory first
    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    // Standard target directory (works when CARGO_MANIFEST_DIR is correct)
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // Fallback: resolve relative to the test binary itself.
    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where gt is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the gt binary.
fn gt_binary() -> PathBuf {
    binary_path("gt")
}

/// Create a CLI builder for gt commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// A scaffolded town directory for black-box specs.
pub struct SpecTown {
    pub dir: tempfile::TempDir,
}

impl SpecTown {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn events_file(&self) -> PathBuf {
        self.root().join(".events.jsonl")
    }

    /// Path of the stub-bd PATH prefix directory.
    pub fn stub_bin(&self) -> PathBuf {
        self.root().join(".stub-bin")
    }

    /// Install a stub `bd` that prints `reply` and exits 0.
    pub fn stub_bd(&self, reply: &str) {
        let bin = self.stub_bin();
        std::fs::create_dir_all(&bin).unwrap();
        let reply_file = self.root().join(".stub-bd-reply.json");
        std::fs::write(&reply_file, reply).unwrap();
        let script = format!("#!/bin/sh\ncat {}\n", reply_file.display());
        let path = bin.join("bd");
        std::fs::write(&path, script).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }
}

/// Scaffold a town with one registered rig `gastown` (prefix `gt`).
pub fn make_town() -> SpecTown {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("mayor")).unwrap();
    std::fs::write(root.join("mayor/town.json"), r#"{"name":"spectown"}"#).unwrap();
    std::fs::write(
        root.join("mayor/rigs.json"),
        r#"{"rigs":{"gastown":{"prefix":"gt","default_branch":"main"}}}"#,
    )
    .unwrap();
    std::fs::create_dir_all(root.join(".beads")).unwrap();
    std::fs::write(
        root.join(".beads/routes.jsonl"),
        "{\"prefix\":\"hq-\",\"path\":\".\"}\n{\"prefix\":\"gt-\",\"path\":\"gastown\"}\n",
    )
    .unwrap();
    std::fs::create_dir_all(root.join("gastown")).unwrap();
    SpecTown { dir }
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
    path_prefix: Option<PathBuf>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: Vec::new(),
            path_prefix: None,
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set working directory
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Run inside a scaffolded town (cwd + stub-bd PATH prefix).
    pub fn town(mut self, town: &SpecTown) -> Self {
        self.dir = Some(town.root().to_path_buf());
        self.path_prefix = Some(town.stub_bin());
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(gt_binary());
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        // Prevent the parent shell's agent identity from leaking into
        // specs; they decide their own role context explicitly.
        for key in ["GT_ROLE", "GT_RIG", "GT_POLECAT", "GT_CREW", "BD_ACTOR"] {
            cmd.env_remove(key);
        }

        if let Some(prefix) = self.path_prefix {
            let path = std::env::var("PATH").unwrap_or_default();
            cmd.env("PATH", format!("{}:{}", prefix.display(), path));
        }

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    /// Get stdout as string
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Get stderr as string
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stdout does not contain substring.
    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}
