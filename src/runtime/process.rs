//! Subprocess execution.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn command_output_impl(&self, program: &Path, args: &[String]) -> Result<Output> {
        Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute {:?}", program))
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use std::path::Path;

    #[cfg(unix)]
    #[test]
    fn test_command_output_captures_stdout() {
        let runtime = RealRuntime;
        let output = runtime
            .command_output(Path::new("/bin/sh"), &["-c".to_string(), "echo ok".to_string()])
            .unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");
    }

    #[test]
    fn test_command_output_missing_program_errors() {
        let runtime = RealRuntime;
        let result = runtime.command_output(Path::new("/nonexistent/program"), &[]);
        assert!(result.is_err());
    }
}
