//! External command execution.
//!
//! Used to run the documentation generator and `git`.

use crate::log;
use anyhow::{Context, Result};
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output},
};

/// Run an external command, log its output and return it.
///
/// A non-zero exit status is not an error here; callers inspect
/// `output.status` themselves.
///
/// # Examples
/// ```ignore
/// exec!(&config.generator; config.doxyfile.as_os_str())?;
/// ```
#[macro_export]
macro_rules! exec {
    ($cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec(
            &$crate::utils::command::to_cmd_vec($cmd),
            &$crate::utils::command::filter_args(&[$($crate::utils::command::to_os($arg)),*]),
        )
    }};
}

/// Like [`exec!`] but without logging anything.
#[macro_export]
macro_rules! capture {
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::capture(
            Some($root),
            &$crate::utils::command::to_cmd_vec($cmd),
            &$crate::utils::command::filter_args(&[$($crate::utils::command::to_os($arg)),*]),
        )
    }};
}

/// Convert to OsString.
#[inline]
pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
    s.into()
}

/// Trait for converting to command vector.
pub trait ToCmd {
    fn to_cmd(self) -> Vec<OsString>;
}

impl<const N: usize> ToCmd for [&str; N] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.into_iter().map(OsString::from).collect()
    }
}

impl ToCmd for &[String] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.iter().map(OsString::from).collect()
    }
}

impl ToCmd for &Vec<String> {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.iter().map(OsString::from).collect()
    }
}

/// Convert command to Vec<OsString>.
#[inline]
pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
    cmd.to_cmd()
}

/// Filter out empty args.
#[inline]
pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
    args.iter().filter(|a| !a.is_empty()).cloned().collect()
}

/// Execute a command in the current directory, wait for it and log its output.
///
/// # Errors
/// Returns error only if the command cannot be started.
pub fn exec(cmd: &[OsString], args: &[OsString]) -> Result<Output> {
    let (name, output) = run(None, cmd, args)?;
    log_output(&name, &output);
    Ok(output)
}

/// Execute a command and wait for it without logging.
pub fn capture(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<Output> {
    run(root, cmd, args).map(|(_, output)| output)
}

fn run(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Output)> {
    let (name, mut command) = prepare(root, cmd, args)?;
    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;
    Ok((name, output))
}

/// Prepare a Command from components.
fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| Path::new(s).file_name())
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

/// Log stdout and stderr lines under the command's name; on failure print
/// stderr as-is.
fn log_output(name: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let error_msg = stderr.trim();
        if !error_msg.is_empty() {
            eprintln!("{error_msg}");
        }
        return;
    }

    for line in stdout.lines().chain(stderr.lines()) {
        if !line.trim().is_empty() {
            log!(name; "{line}");
        }
    }
}
