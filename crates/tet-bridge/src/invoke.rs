use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::TetError;

/// Runs the external tet mesher as a subprocess.
///
/// The invocation is treated as a pure function from a PLC file on disk to
/// a set of output files; nothing is streamed and no retry is attempted.
#[derive(Debug, Clone)]
pub struct TetgenRunner {
    pub executable: PathBuf,
    pub workdir: PathBuf,
}

impl TetgenRunner {
    pub fn new(executable: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            workdir: workdir.into(),
        }
    }

    /// Invoke the mesher on `input` with the given option string and wait
    /// for it to terminate.
    pub fn invoke(&self, options: &str, input: &str) -> Result<(), TetError> {
        info!(
            executable = %self.executable.display(),
            options,
            input,
            "calling tet mesher"
        );
        let status = Command::new(&self.executable)
            .current_dir(&self.workdir)
            .arg(options)
            .arg(input)
            .status()
            .map_err(|e| TetError::TetgenFailed {
                message: format!("failed to start {}: {}", self.executable.display(), e),
            })?;

        if !status.success() {
            return Err(TetError::TetgenFailed {
                message: format!("mesher exited with status {}", status),
            });
        }
        Ok(())
    }

    /// Verify that the expected output files for iteration `iter` of the
    /// given stem exist, returning the common `<stem>.<iter>` prefix.
    pub fn expect_outputs(&self, stem: &str, iter: u32) -> Result<PathBuf, TetError> {
        let base = self.workdir.join(format!("{}.{}", stem, iter));
        for suffix in ["node", "ele", "face"] {
            let path = with_suffix(&base, suffix);
            if !path.exists() {
                return Err(TetError::MissingOutput { path });
            }
        }
        Ok(base)
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_reports_tetgen_failed() {
        let runner = TetgenRunner::new("/nonexistent/tetgen-binary", std::env::temp_dir());
        let err = runner.invoke("-pq1.2", "boundaries.smesh").unwrap_err();
        match err {
            TetError::TetgenFailed { message } => {
                assert!(message.contains("tetgen-binary"), "{}", message)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn absent_outputs_report_missing_output() {
        let runner = TetgenRunner::new("tetgen", std::env::temp_dir());
        let err = runner.expect_outputs("no-such-stem", 1).unwrap_err();
        assert!(matches!(err, TetError::MissingOutput { .. }));
    }
}
