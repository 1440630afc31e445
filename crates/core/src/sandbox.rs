//! Output assembly for the execution sandbox
//!
//! The shell runs the code; these functions decide what the user sees. Output
//! is an ordered list of lines. A fault never escapes as an error: it becomes
//! the last line.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Matches the `TypeError: ...` style summary a JavaScript runtime prints for
/// an uncaught exception
const ERROR_LINE_PATTERN: &str = r"(?m)^(?:[A-Z][A-Za-z]*)?Error(?: \[[A-Z_]+\])?: .*$";

/// Why a run did not finish cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The runtime exited with a failure status
    Exited { code: Option<i32>, stderr: String },
    /// The runtime could not be started
    Spawn(String),
    TimedOut(Duration),
}

/// Single-entry output for a language the sandbox cannot run
pub fn unsupported(language_name: &str, native_name: &str) -> Vec<String> {
    vec![format!(
        "Running {language_name} code is not supported here. Use {native_name} for direct execution."
    )]
}

pub fn format_fault(description: &str) -> String {
    format!("Execution error: {description}")
}

/// Human-readable summary of a fault
pub fn describe_fault(fault: &Fault) -> String {
    match fault {
        Fault::Exited { code, stderr } => {
            static ERROR_LINE: OnceLock<Option<Regex>> = OnceLock::new();
            let summary = ERROR_LINE
                .get_or_init(|| Regex::new(ERROR_LINE_PATTERN).ok())
                .as_ref()
                .and_then(|re| re.find(stderr).map(|m| m.as_str().trim().to_string()))
                .or_else(|| {
                    stderr
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .last()
                        .map(str::to_string)
                });

            match (summary, code) {
                (Some(summary), _) => summary,
                (None, Some(code)) => format!("process exited with status {code}"),
                (None, None) => "process terminated by a signal".to_string(),
            }
        }
        Fault::Spawn(reason) => format!("could not start the runtime: {reason}"),
        Fault::TimedOut(limit) => format!("timed out after {limit:?}"),
    }
}

/// Parse `v20.11.0` into `(major, minor)`
pub fn parse_runtime_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().trim_start_matches('v').split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Runtime flags that confine a run to `scratch`
///
/// File reads and writes are limited to the scratch directory; child
/// processes, worker threads and native addons are denied. `None` when the
/// runtime predates the permission model, in which case nothing may run.
pub fn permission_args(version: (u32, u32), scratch: &Path) -> Option<Vec<String>> {
    let flag = match version {
        (major, _) if major < 20 => return None,
        (20 | 21, _) | (22, 0..=12) | (23, 0..=4) => "--experimental-permission",
        _ => "--permission",
    };
    let scratch = scratch.display();

    Some(vec![
        flag.to_string(),
        format!("--allow-fs-read={scratch}"),
        format!("--allow-fs-write={scratch}"),
    ])
}

/// Captured stdout in order, followed by the fault line if there was one
pub fn assemble(stdout: &str, fault: Option<&Fault>) -> Vec<String> {
    let mut output: Vec<String> = stdout.lines().map(str::to_string).collect();

    if let Some(fault) = fault {
        output.push(format_fault(&describe_fault(fault)));
    }

    output
}
