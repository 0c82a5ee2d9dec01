//! Interpreter-backed implementation of the code execution capability.

use std::{
    io::{ErrorKind, Write},
    path::PathBuf,
    process::{Command, Stdio},
    time::Instant,
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::application::executor::{CodeExecutor, ExecutionFault, FaultOrigin};

/// Runs each unit through an external interpreter.
///
/// The unit is written to a temporary file passed as the last argument. Stdout is the
/// snippet's output; a non-zero exit is a fault carrying stderr.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    interpreter: PathBuf,
    args: Vec<String>,
}

impl ProcessExecutor {
    pub fn new(interpreter: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            args,
        }
    }

    fn origin(&self, exit_code: Option<i32>) -> FaultOrigin {
        let location = match exit_code {
            Some(code) => format!("{} (exit {code})", self.interpreter.display()),
            None => format!("{} (terminated by signal)", self.interpreter.display()),
        };
        FaultOrigin::new(location, None)
    }
}

impl From<&crate::config::ExecutorSettings> for ProcessExecutor {
    fn from(settings: &crate::config::ExecutorSettings) -> Self {
        Self::new(settings.interpreter.clone(), settings.args.clone())
    }
}

impl CodeExecutor for ProcessExecutor {
    fn execute(&self, source: &str, out: &mut String) -> Result<(), ExecutionFault> {
        let started_at = Instant::now();
        let spawn_origin = || FaultOrigin::new(self.interpreter.display().to_string(), None);

        let mut unit = NamedTempFile::new().map_err(|err| {
            ExecutionFault::new(format!("failed to stage snippet: {err}")).with_origin(spawn_origin())
        })?;
        unit.write_all(source.as_bytes())
            .and_then(|()| unit.flush())
            .map_err(|err| {
                ExecutionFault::new(format!("failed to stage snippet: {err}"))
                    .with_origin(spawn_origin())
            })?;

        let output = Command::new(&self.interpreter)
            .args(&self.args)
            .arg(unit.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                warn!(
                    target = "infra::executor",
                    op = "execute",
                    result = "spawn_error",
                    interpreter = %self.interpreter.display(),
                    error = %err,
                    "Failed to spawn interpreter"
                );
                let message = if err.kind() == ErrorKind::NotFound {
                    format!("interpreter `{}` not found", self.interpreter.display())
                } else {
                    format!("failed to spawn interpreter: {err}")
                };
                ExecutionFault::new(message).with_origin(spawn_origin())
            })?;

        // Output written before a failure stays visible.
        out.push_str(&String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                "interpreter exited with failure".to_string()
            } else {
                stderr
            };
            return Err(ExecutionFault::new(message).with_origin(self.origin(output.status.code())));
        }

        debug!(
            target = "infra::executor",
            op = "execute",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            "Snippet executed"
        );
        Ok(())
    }
}
