//! Fluent builder for external commands.
//!
//! Every collaborator of chainbuild is a subprocess: git, apt-cache,
//! apt-get, dpkg, dpkg-buildpackage, lsb_release. This builder gives them a
//! single execution path with a uniform timeout policy, tracing output, and
//! error mapping, instead of scattering `tokio::process::Command` setups
//! around the codebase.
//!
//! Commands never rely on the process-global working directory: callers pass
//! the directory explicitly via [`ProcessCommand::current_dir`], which keeps
//! concurrent top-level builds safe.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::DEFAULT_COMMAND_TIMEOUT;
use crate::core::ChainbuildError;

/// Captured output of a completed command.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Whether the command exited with status zero.
    pub success: bool,
}

/// Builder for a single external command invocation.
///
/// Defaults: output captured, [`DEFAULT_COMMAND_TIMEOUT`] applied, working
/// directory inherited unless set.
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl ProcessCommand {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: Some(DEFAULT_COMMAND_TIMEOUT),
            context: None,
        }
    }

    /// Build a `sh -c <script>` invocation, for configured shell snippets
    /// such as the prebuild command.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command in `dir` instead of the inherited working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Override the default timeout.
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = Some(duration);
        self
    }

    /// Tag log lines and error messages with an operation description.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Execute and return the captured output regardless of exit status.
    ///
    /// Spawn failures and timeouts are errors; a non-zero exit status is
    /// reported through [`ProcessOutput::success`] so callers with retry or
    /// best-effort semantics can decide for themselves.
    pub async fn run(self) -> Result<ProcessOutput> {
        let start = std::time::Instant::now();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        if let Some(ref ctx) = self.context {
            tracing::debug!(target: "process", "({}) executing: {} {}", ctx, self.program, self.args.join(" "));
        } else {
            tracing::debug!(target: "process", "executing: {} {}", self.program, self.args.join(" "));
        }

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result
                    .with_context(|| format!("failed to execute {}", self.program))?,
                Err(_) => {
                    tracing::warn!(
                        target: "process",
                        "command timed out after {}s: {} {}",
                        duration.as_secs(),
                        self.program,
                        self.args.join(" ")
                    );
                    return Err(ChainbuildError::CommandTimeout {
                        program: self.program,
                        seconds: duration.as_secs(),
                    }
                    .into());
                }
            }
        } else {
            output_future
                .await
                .with_context(|| format!("failed to execute {}", self.program))?
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        if !success {
            tracing::debug!(
                target: "process",
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            );
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "process::perf",
                "{} {} took {:.2}s",
                self.program,
                self.args.first().map(String::as_str).unwrap_or(""),
                elapsed.as_secs_f64()
            );
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            success,
        })
    }

    /// Execute, treating a non-zero exit status as an error.
    pub async fn execute(self) -> Result<ProcessOutput> {
        let program = self.program.clone();
        let output = self.run().await?;
        if !output.success {
            let stderr = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            return Err(ChainbuildError::CommandFailed { program, stderr }.into());
        }
        Ok(output)
    }

    /// Execute and return trimmed stdout; non-zero exit is an error.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute and report whether the command succeeded.
    ///
    /// Only spawn failures and timeouts propagate as errors.
    pub async fn succeeds(self) -> Result<bool> {
        let output = self.run().await?;
        Ok(output.success)
    }
}
