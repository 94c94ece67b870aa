//! External failure oracle: run a command against a scratch copy of the
//! document and read the failure off its exit status and stderr.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, trace};

use shrink_snapshot::{BuildExceptionProvider, CheckError, ExceptionComparator};

use crate::config::OracleConfig;
use crate::document::TextDocument;

const FILE_PLACEHOLDER: &str = "{file}";

/// What identifies a failure of the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSignature {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// First non-empty line of stderr.
    pub message: String,
}

impl fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "exit {}: {}", code, self.message),
            None => write!(f, "killed: {}", self.message),
        }
    }
}

impl FailureSignature {
    fn from_output(exit_code: Option<i32>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr);
        let message = stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();
        Self { exit_code, message }
    }
}

/// Same exit code, and the same message unless messages are ignored.
#[derive(Debug, Clone, Copy)]
pub struct FailureComparator {
    compare_message: bool,
}

impl FailureComparator {
    pub fn new(compare_message: bool) -> Self {
        Self { compare_message }
    }
}

impl ExceptionComparator<FailureSignature> for FailureComparator {
    fn are_equal(&self, initial: &FailureSignature, current: &FailureSignature) -> bool {
        initial.exit_code == current.exit_code
            && (!self.compare_message || initial.message == current.message)
    }
}

/// Runs a command on the rendered document.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    scratch_dir: PathBuf,
    file_name: String,
}

impl CommandOracle {
    /// `file_name` keeps the input's name (and extension) on scratch files,
    /// for tools that care about it.
    pub fn from_config(config: &OracleConfig, file_name: &str) -> anyhow::Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("Oracle command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: config.timeout(),
            scratch_dir: config.scratch_dir(),
            file_name: file_name.to_string(),
        })
    }

    /// A fresh scratch file, removed when the guard is dropped.
    fn scratch_file(&self) -> Result<NamedTempFile, CheckError> {
        tempfile::Builder::new()
            .prefix("shrink-")
            .suffix(&format!("-{}", self.file_name))
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| {
                CheckError::Oracle(format!(
                    "failed to create a scratch file in {}: {}",
                    self.scratch_dir.display(),
                    e
                ))
            })
    }

    fn arguments(&self, path: &Path) -> Vec<String> {
        let path = path.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(FILE_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(FILE_PLACEHOLDER, &path)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(path.into_owned());
        }
        args
    }

    async fn run(&self, path: &Path) -> Result<FailureSignature, CheckError> {
        let args = self.arguments(path);
        trace!(program = %self.program, ?args, "Running oracle");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CheckError::Oracle(format!(
                    "failed to run {}: {}",
                    self.program, e
                )))
            }
            Err(_) => {
                return Err(CheckError::Oracle(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )))
            }
        };

        if output.status.success() {
            return Err(CheckError::NoFailure);
        }
        let signature = FailureSignature::from_output(output.status.code(), &output.stderr);
        debug!(%signature, "Oracle reported failure");
        Ok(signature)
    }
}

#[async_trait]
impl BuildExceptionProvider<TextDocument> for CommandOracle {
    type Signature = FailureSignature;

    async fn check_compilation(&self, context: &TextDocument) -> Result<FailureSignature, CheckError> {
        // Dropping the guard deletes the file, also when this future is dropped mid-check.
        let scratch = self.scratch_file()?;
        let path = scratch.path().to_path_buf();
        tokio::fs::write(&path, context.render())
            .await
            .map_err(|e| CheckError::Oracle(format!("failed to write {}: {}", path.display(), e)))?;

        let result = self.run(&path).await;

        if let Err(e) = scratch.close() {
            debug!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(command: &[&str], dir: &Path) -> CommandOracle {
        let config = OracleConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            timeout_secs: 5,
            scratch_dir: Some(dir.to_path_buf()),
            compare_message: true,
        };
        CommandOracle::from_config(&config, "input.txt").unwrap()
    }

    #[test]
    fn test_signature_uses_first_stderr_line() {
        let signature = FailureSignature::from_output(Some(2), b"\n  \n  error: boom  \nmore\n");
        assert_eq!(signature.exit_code, Some(2));
        assert_eq!(signature.message, "error: boom");
        assert_eq!(signature.to_string(), "exit 2: error: boom");
    }

    #[test]
    fn test_comparator() {
        let a = FailureSignature {
            exit_code: Some(1),
            message: "x".into(),
        };
        let b = FailureSignature {
            exit_code: Some(1),
            message: "y".into(),
        };
        assert!(!FailureComparator::new(true).are_equal(&a, &b));
        assert!(FailureComparator::new(false).are_equal(&a, &b));
        assert!(!FailureComparator::new(false).are_equal(
            &a,
            &FailureSignature {
                exit_code: Some(2),
                message: "x".into()
            }
        ));
    }

    #[test]
    fn test_placeholder_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let path = Path::new("/tmp/doc.txt");

        let with = oracle(&["sh", "-c", "cat {file}"], dir.path());
        assert_eq!(with.arguments(path), vec!["-c", "cat /tmp/doc.txt"]);

        let without = oracle(&["wc", "-l"], dir.path());
        assert_eq!(without.arguments(path), vec!["-l", "/tmp/doc.txt"]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(CommandOracle::from_config(&OracleConfig::default(), "x").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_oracle_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let failing = TextDocument::parse("ok\n\nboom\n");
        let passing = TextDocument::parse("ok\n");

        let grep = oracle(
            &["sh", "-c", "if grep -q boom {file}; then echo 'found boom' >&2; exit 3; fi"],
            dir.path(),
        );
        let signature = grep.check_compilation(&failing).await.unwrap();
        assert_eq!(
            signature,
            FailureSignature {
                exit_code: Some(3),
                message: "found boom".into()
            }
        );
        assert_eq!(grep.check_compilation(&passing).await, Err(CheckError::NoFailure));

        let missing = oracle(&["/definitely/not/a/program"], dir.path());
        assert!(matches!(
            missing.check_compilation(&failing).await,
            Err(CheckError::Oracle(_))
        ));

        // Scratch files are cleaned up after every run.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_oracle_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut slow = oracle(&["sh", "-c", "sleep 5 # {file}"], dir.path());
        slow.timeout = Duration::from_millis(100);

        let result = slow.check_compilation(&TextDocument::parse("x\n")).await;
        assert!(matches!(result, Err(CheckError::Oracle(message)) if message.contains("timed out")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_check_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let slow = oracle(&["sh", "-c", "sleep 5 # {file}"], dir.path());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(200),
            slow.check_compilation(&TextDocument::parse("x\n")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_scratch_file_keeps_input_name() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = oracle(&["true"], dir.path()).scratch_file().unwrap();
        let name = scratch.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("shrink-"));
        assert!(name.ends_with("-input.txt"));
        assert_eq!(scratch.path().parent(), Some(dir.path()));
    }
}
