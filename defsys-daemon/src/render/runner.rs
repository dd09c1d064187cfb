//! Execution of generated R scripts.
//!
//! The renderer talks to R through the [`ScriptRunner`] trait so the cache
//! logic can be exercised without an R installation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One script execution.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// The generated script.
    pub script: PathBuf,
    /// Where the script is expected to draw the image.
    pub output: PathBuf,
    /// Working directory for the process.
    pub workdir: PathBuf,
}

/// Outcome of a finished process.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can execute a tree script.
///
/// Implementations block; the renderer calls them from the blocking pool.
pub trait ScriptRunner: Send + Sync {
    /// Run the job. An `Err` means the process could not be started.
    fn run(&self, job: &RenderJob) -> io::Result<RunOutput>;

    /// Program name for logs.
    fn program(&self) -> &Path;
}

/// Runs scripts with `Rscript --vanilla`.
#[derive(Debug, Clone)]
pub struct RscriptRunner {
    program: PathBuf,
}

impl RscriptRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ScriptRunner for RscriptRunner {
    fn run(&self, job: &RenderJob) -> io::Result<RunOutput> {
        let output = Command::new(&self.program)
            .arg("--vanilla")
            .arg(&job.script)
            .current_dir(&job.workdir)
            .stdin(Stdio::null())
            .output()?;

        Ok(RunOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn program(&self) -> &Path {
        &self.program
    }
}
