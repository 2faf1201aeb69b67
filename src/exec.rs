use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::error::KiraError;

/// One external command plus the policy it runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    retries: u32,
    tolerate_failure: bool,
    stdout: Option<Utf8PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            retries: 0,
            tolerate_failure: false,
            stdout: None,
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

    /// Re-run up to `retries` more times after a non-zero exit.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Log a final non-zero exit instead of failing.
    pub fn tolerate_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }

    /// Send stdout to `path`; only stderr is logged.
    pub fn stdout_to(mut self, path: &Utf8Path) -> Self {
        self.stdout = Some(path.to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn retry_count(&self) -> u32 {
        self.retries
    }

    pub fn tolerates_failure(&self) -> bool {
        self.tolerate_failure
    }

    pub fn stdout_path(&self) -> Option<&Utf8Path> {
        self.stdout.as_deref()
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

pub trait CommandRunner {
    fn execute(&self, invocation: &Invocation) -> Result<(), KiraError>;
    fn is_available(&self, program: &str) -> bool;
}

/// Runs invocations as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn run_once(&self, invocation: &Invocation) -> Result<ExitStatus, KiraError> {
        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arguments()).stdin(Stdio::null());

        match invocation.stdout_path() {
            Some(path) => {
                let sink = File::create(path.as_std_path()).map_err(|err| {
                    KiraError::Filesystem(format!("create {path}: {err}"))
                })?;
                let output = cmd
                    .stdout(Stdio::from(sink))
                    .stderr(Stdio::piped())
                    .output()
                    .map_err(|err| spawn_error(invocation, err))?;
                log_lines("Standard error of subprocess:", &output.stderr);
                Ok(output.status)
            }
            None => {
                // Both streams share one file so the transcript keeps their interleaving.
                let mut transcript = tempfile::tempfile()
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?;
                let stdout = transcript
                    .try_clone()
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?;
                let stderr = transcript
                    .try_clone()
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?;
                let status = cmd
                    .stdout(Stdio::from(stdout))
                    .stderr(Stdio::from(stderr))
                    .status()
                    .map_err(|err| spawn_error(invocation, err))?;

                let mut captured = Vec::new();
                transcript
                    .seek(SeekFrom::Start(0))
                    .and_then(|_| transcript.read_to_end(&mut captured))
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?;
                log_lines("Output of subprocess:", &captured);
                Ok(status)
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, invocation: &Invocation) -> Result<(), KiraError> {
        let mut remaining = invocation.retry_count();
        loop {
            info!("Commands:");
            info!("{}", invocation.command_line());
            let status = self.run_once(invocation)?;
            if status.success() {
                return Ok(());
            }

            let code = status.code();
            if remaining > 0 {
                info!(
                    "Exit code {}, retrying {remaining} more times",
                    display_code(code)
                );
                remaining -= 1;
                continue;
            }
            if invocation.tolerates_failure() {
                warn!(
                    "Exit code was {}, but we will continue anyway",
                    display_code(code)
                );
                return Ok(());
            }
            return Err(KiraError::Execution {
                program: invocation.program().to_string(),
                code,
            });
        }
    }

    fn is_available(&self, program: &str) -> bool {
        if program.contains(std::path::MAIN_SEPARATOR) {
            return Path::new(program).exists();
        }
        find_in_path(program).is_some()
    }
}

fn spawn_error(invocation: &Invocation, err: std::io::Error) -> KiraError {
    KiraError::Spawn {
        program: invocation.program().to_string(),
        message: err.to_string(),
    }
}

fn log_lines(heading: &str, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    info!("{heading}");
    for line in String::from_utf8_lossy(bytes).lines() {
        info!("{line}");
    }
}

fn display_code(code: Option<i32>) -> String {
    code.map(|code| code.to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
