//! External command execution.
//!
//! The harness shells out for two things: building/flashing the application
//! under test, and performing USB control transfers. Both capture stdout and
//! treat a non-zero exit as fatal, with stderr embedded in the error.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not be started at all.
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully.
    #[error("External command '{program}' has finished with an error (exit code: {code})\n{stderr}")]
    Failed {
        program: String,
        /// Exit code, or -1 when the process was terminated by a signal.
        code: i32,
        stderr: String,
    },
}

/// Run an external command, capturing its output.
///
/// On success returns captured stdout with trailing whitespace trimmed; the
/// caller decides whether to parse it. A non-zero exit is a
/// [`CommandError::Failed`] carrying captured stderr.
pub fn run<I, S>(program: &str, args: I) -> Result<String, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    debug!(program, "running external command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .trim_end()
        .to_string())
}

/// Build and flash the application in `app_dir` onto the device.
///
/// `command` is the configured build command (see
/// [`CommandsConfig`](crate::config::CommandsConfig)); its stdout is returned
/// untouched beyond trailing-whitespace trimming.
pub fn build_application(command: &str, app_dir: &Path) -> Result<String, CommandError> {
    run(command, [app_dir.as_os_str()])
}
