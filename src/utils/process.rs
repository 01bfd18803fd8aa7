//! Host subprocess plumbing shared by the docker, kubectl and helm wrappers

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

use super::dryrun;

/// Failure running a host CLI
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Required tool '{program}' not found on PATH")]
    NotFound { program: String },

    #[error("Failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed ({}): {stderr}", exit_label(*.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl CommandError {
    /// Standard error of the failed command, empty when it never ran
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A host CLI invocation. Secrets travel through `stdin`, never through argv.
#[derive(Debug, Clone)]
pub struct HostCommand {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
    kubeconfig: Option<PathBuf>,
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            kubeconfig: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` to the process on stdin
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Point kubectl/helm at a specific kubeconfig
    pub fn kubeconfig(mut self, kubeconfig: Option<&Path>) -> Self {
        self.kubeconfig = kubeconfig.map(Path::to_path_buf);
        self
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Shell-quoted rendering used in logs and dry-run output
    pub fn display(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }

    /// Run the command and capture its output
    pub fn output(&self) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command = %self.display(), "running host command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(kc) = &self.kubeconfig {
            cmd.env("KUBECONFIG", kc);
        }

        let mut child = cmd.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound {
                    program: self.program.clone(),
                }
            } else {
                CommandError::Io {
                    program: self.program.clone(),
                    source,
                }
            }
        })?;

        if let (Some(input), Some(mut pipe)) = (&self.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .map_err(|source| CommandError::Io {
                    program: self.program.clone(),
                    source,
                })?;
            // Dropping the pipe closes stdin so the child sees EOF
        }

        let output = child.wait_with_output().map_err(|source| CommandError::Io {
            program: self.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::debug!(command = %self.display(), stderr = %stderr.trim(), "host command failed");
            return Err(CommandError::Failed {
                command: self.display(),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    /// Run a command that changes host or cluster state. Skipped under --dry-run.
    pub fn run_mutating(&self) -> Result<CommandOutput, CommandError> {
        if dryrun::is_dry_run() {
            dryrun::log_action(&self.display());
            return Ok(CommandOutput::default());
        }
        self.output()
    }
}
