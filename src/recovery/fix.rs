//! Corrective Actions
//!
//! Caller-described fixes attached to `fix` error patterns, and the command
//! runner used by `run_command` fixes.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

// == Fix Action ==
/// A corrective action, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixAction {
    /// Write `content` to `file`, creating parent directories
    CreateFile {
        file: PathBuf,
        #[serde(default)]
        content: String,
    },
    /// Remove `file`; a missing file is not an error
    DeleteFile { file: PathBuf },
    /// Regex replace-all of `search` with `replace` inside `file`
    ModifyFile {
        file: PathBuf,
        search: String,
        replace: String,
    },
    /// Run a shell command through the configured `CommandRunner`
    RunCommand { command: String },
}

// == Command Runner ==
/// Capability to run an external command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command`, returning its stdout, or an error if it could not be
    /// started or exited unsuccessfully.
    async fn run(&self, command: &str) -> Result<String>;
}

/// Runs commands with `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner {
    /// Working directory; inherits the process's when None
    pub working_dir: Option<PathBuf>,
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> Result<String> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute '{}'", command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("'{}' failed ({}): {}", command, output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// == Apply Fix ==
/// Applies a corrective action.
///
/// `run_command` fails when no runner is configured.
pub async fn apply_fix(fix: &FixAction, runner: Option<&dyn CommandRunner>) -> Result<()> {
    match fix {
        FixAction::CreateFile { file, content } => {
            if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(file, content)
                .await
                .with_context(|| format!("Failed to write {}", file.display()))?;
            info!("Fix created {}", file.display());
        }
        FixAction::DeleteFile { file } => match tokio::fs::remove_file(file).await {
            Ok(()) => info!("Fix deleted {}", file.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Fix delete skipped, {} does not exist", file.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", file.display()))
            }
        },
        FixAction::ModifyFile {
            file,
            search,
            replace,
        } => {
            let pattern = Regex::new(search)
                .with_context(|| format!("Invalid search expression '{}'", search))?;
            let content = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let modified = pattern.replace_all(&content, replace.as_str());
            tokio::fs::write(file, modified.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", file.display()))?;
            info!("Fix modified {}", file.display());
        }
        FixAction::RunCommand { command } => {
            let Some(runner) = runner else {
                bail!("No command runner configured for '{}'", command);
            };
            runner.run(command).await?;
            info!("Fix ran '{}'", command);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &str) -> Result<String> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(String::new())
        }
    }

    #[test]
    fn test_fix_action_json_shape() {
        let fix: FixAction = serde_json::from_str(
            r#"{"action": "create_file", "file": "package.json", "content": "{}"}"#,
        )
        .unwrap();
        assert_eq!(
            fix,
            FixAction::CreateFile {
                file: PathBuf::from("package.json"),
                content: "{}".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_file_makes_parents() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("nested").join("package.json");

        apply_fix(
            &FixAction::CreateFile {
                file: file.clone(),
                content: "{\"name\": \"project\"}".to_string(),
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&file).await.unwrap(),
            "{\"name\": \"project\"}"
        );
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let fix = FixAction::DeleteFile {
            file: dir.path().join("absent.lock"),
        };
        assert!(apply_fix(&fix, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_modify_file_replaces_all() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        tokio::fs::write(&file, "port = 80\nadmin_port = 80\n").await.unwrap();

        let fix = FixAction::ModifyFile {
            file: file.clone(),
            search: r"= 80\b".to_string(),
            replace: "= 8080".to_string(),
        };
        apply_fix(&fix, None).await.unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&file).await.unwrap(),
            "port = 8080\nadmin_port = 8080\n"
        );
    }

    #[tokio::test]
    async fn test_run_command_uses_runner() {
        let runner = RecordingRunner::default();
        let fix = FixAction::RunCommand {
            command: "npm install".to_string(),
        };

        apply_fix(&fix, Some(&runner)).await.unwrap();
        assert_eq!(*runner.commands.lock().unwrap(), vec!["npm install"]);
    }

    #[tokio::test]
    async fn test_run_command_without_runner_fails() {
        let fix = FixAction::RunCommand {
            command: "make".to_string(),
        };
        assert!(apply_fix(&fix, None).await.is_err());
    }

    #[tokio::test]
    async fn test_shell_runner_reports_failure() {
        let runner = ShellCommandRunner::default();
        assert_eq!(runner.run("echo hello").await.unwrap().trim(), "hello");
        assert!(runner.run("exit 3").await.is_err());
    }
}
