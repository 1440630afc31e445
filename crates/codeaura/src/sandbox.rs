use codeaura_core::registry::Registry;
use codeaura_core::sandbox::{
    assemble, parse_runtime_version, permission_args, unsupported, Fault,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Runtime binary looked up on `PATH` when no override is given
pub const DEFAULT_JS_RUNTIME: &str = "node";

/// Default limit for a single run
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runs source in the native language through a local JavaScript runtime
///
/// Each run gets a fresh scratch directory, an empty environment and its own
/// process group. The runtime's permission model limits file access to that
/// directory and denies child processes, so nothing survives between runs.
#[derive(Debug, Clone)]
pub struct Sandbox {
    runtime: Option<PathBuf>,
    timeout: Duration,
}

impl Sandbox {
    /// Resolve the runtime binary; `runtime` may be a name or a path
    pub fn new(runtime: Option<&str>, timeout: Duration) -> Self {
        let name = runtime.unwrap_or(DEFAULT_JS_RUNTIME);
        let runtime = which::which(name).ok();

        match &runtime {
            Some(path) => log::debug!("JavaScript runtime: {}", path.display()),
            None => log::debug!("no JavaScript runtime found for `{name}`"),
        }

        Self { runtime, timeout }
    }

    pub fn runtime(&self) -> Option<&PathBuf> {
        self.runtime.as_ref()
    }

    /// Execute `source` and return its output lines
    ///
    /// Languages other than the registry's native one are never executed.
    pub async fn run(&self, registry: &Registry, language: &str, source: &str) -> Vec<String> {
        if !registry.is_native(language) {
            return unsupported(
                registry.display_name(language),
                registry.display_name(registry.native_language()),
            );
        }

        let Some(runtime) = &self.runtime else {
            return assemble(
                "",
                Some(&Fault::Spawn(
                    "no JavaScript runtime found; install Node.js or set CODE_AURA_JS_RUNTIME"
                        .to_string(),
                )),
            );
        };

        let (stdout, fault) = self.execute(runtime, source).await;
        assemble(&stdout, fault.as_ref())
    }

    /// `(major, minor)` reported by the runtime, if it answers `--version`
    pub async fn runtime_version(&self) -> Option<(u32, u32)> {
        let runtime = self.runtime.as_ref()?;
        let output = tokio::process::Command::new(runtime)
            .arg("--version")
            .env_clear()
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;
        parse_runtime_version(&String::from_utf8_lossy(&output.stdout))
    }

    async fn execute(&self, runtime: &Path, source: &str) -> (String, Option<Fault>) {
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => return (String::new(), Some(Fault::Spawn(e.to_string()))),
        };
        let scratch_path = scratch
            .path()
            .canonicalize()
            .unwrap_or_else(|_| scratch.path().to_path_buf());

        let Some((major, minor)) = self.runtime_version().await else {
            return (
                String::new(),
                Some(Fault::Spawn(format!(
                    "{} did not report a Node.js version",
                    runtime.display()
                ))),
            );
        };
        let Some(isolation) = permission_args((major, minor), &scratch_path) else {
            return (
                String::new(),
                Some(Fault::Spawn(format!(
                    "Node.js {major}.{minor} cannot isolate runs; version 20 or newer is required"
                ))),
            );
        };

        let mut command = tokio::process::Command::new(runtime);
        command
            .args(&isolation)
            .arg("-")
            .current_dir(&scratch_path)
            .env_clear()
            .env("NODE_NO_WARNINGS", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return (String::new(), Some(Fault::Spawn(e.to_string()))),
        };
        let pid = child.id();
        log::debug!(
            "spawned {} (pid {pid:?}) in {}",
            runtime.display(),
            scratch_path.display()
        );

        let stdout = Arc::new(Mutex::new(Vec::new()));
        let stderr = Arc::new(Mutex::new(Vec::new()));
        let mut stdout_task = tokio::spawn(drain(child.stdout.take(), Arc::clone(&stdout)));
        let mut stderr_task = tokio::spawn(drain(child.stderr.take(), Arc::clone(&stderr)));
        let stdin = child.stdin.take();

        // Feeding the source, the exit and both drains share one deadline
        let finished = tokio::time::timeout(self.timeout, async {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(source.as_bytes()).await {
                    log::warn!("failed to write source to the runtime: {e}");
                }
            }
            let status = child.wait().await;
            let _ = (&mut stdout_task).await;
            let _ = (&mut stderr_task).await;
            status
        })
        .await;

        kill_group(pid);

        let fault = match finished {
            Ok(Ok(status)) if status.success() => None,
            Ok(Ok(status)) => Some(Fault::Exited {
                code: status.code(),
                stderr: String::new(),
            }),
            Ok(Err(e)) => Some(Fault::Spawn(e.to_string())),
            Err(_) => {
                log::warn!("run exceeded {:?}, killing the runtime", self.timeout);
                if let Err(e) = child.kill().await {
                    log::debug!("runtime already gone: {e}");
                }
                stdout_task.abort();
                stderr_task.abort();
                Some(Fault::TimedOut(self.timeout))
            }
        };

        let fault = match fault {
            Some(Fault::Exited { code, .. }) => Some(Fault::Exited {
                code,
                stderr: take_text(&stderr),
            }),
            other => other,
        };

        (take_text(&stdout), fault)
    }
}

/// Copy everything `reader` yields into `sink`, chunk by chunk, so a run cut
/// short still keeps what it printed
async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, sink: Arc<Mutex<Vec<u8>>>) {
    let Some(mut reader) = reader else {
        return;
    };
    let mut chunk = [0u8; 4096];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => match sink.lock() {
                Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                Err(_) => break,
            },
            Err(e) => {
                log::warn!("failed to read runtime output: {e}");
                break;
            }
        }
    }
}

fn take_text(buf: &Mutex<Vec<u8>>) -> String {
    buf.lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// SIGKILL every process left in the run's group
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    if let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        // The runtime leads its own group, so -pid reaches only this run
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new(None, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    #[tokio::test]
    async fn test_non_native_language_is_not_executed() {
        let registry = Registry::builtin();
        let marker = std::env::temp_dir().join("codeaura-sandbox-marker");
        let source = format!("open('{}', 'w').write('ran')", marker.display());

        let output = sandbox().run(&registry, "python", &source).await;

        assert_eq!(output.len(), 1);
        assert!(output[0].contains("not supported"));
        assert!(output[0].contains("Python"));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_runtime_reports_fault_line() {
        let registry = Registry::builtin();
        let sandbox = Sandbox::new(
            Some("codeaura-no-such-runtime"),
            Duration::from_secs(1),
        );

        let output = sandbox
            .run(&registry, "javascript", "console.log(1)")
            .await;

        assert_eq!(output.len(), 1);
        assert!(output[0].starts_with("Execution error: could not start the runtime"));
    }

    /// A sandbox whose runtime supports isolation, or `None` to skip
    async fn isolated_sandbox(timeout: Duration) -> Option<Sandbox> {
        let sandbox = Sandbox::new(None, timeout);
        match sandbox.runtime_version().await {
            Some(version) if version.0 >= 20 => Some(sandbox),
            _ => {
                eprintln!("skipping: no Node.js 20+ runtime installed");
                None
            }
        }
    }

    #[tokio::test]
    async fn test_two_lines_in_order() {
        let Some(sandbox) = isolated_sandbox(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
        else {
            return;
        };
        let registry = Registry::builtin();

        let output = sandbox
            .run(
                &registry,
                "javascript",
                "console.log('first');\nconsole.log('second');\n",
            )
            .await;

        assert_eq!(output, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_fault_is_appended_after_output() {
        let Some(sandbox) = isolated_sandbox(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
        else {
            return;
        };
        let registry = Registry::builtin();

        let output = sandbox
            .run(
                &registry,
                "javascript",
                "console.log('before');\nthrow new TypeError('boom');\n",
            )
            .await;

        assert_eq!(output.len(), 2);
        assert_eq!(output[0], "before");
        assert_eq!(output[1], "Execution error: TypeError: boom");
    }

    #[tokio::test]
    async fn test_runs_do_not_share_state() {
        let Some(sandbox) = isolated_sandbox(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
        else {
            return;
        };
        let registry = Registry::builtin();

        sandbox
            .run(
                &registry,
                "javascript",
                "require('fs').writeFileSync('state.txt', 'x');",
            )
            .await;
        let output = sandbox
            .run(
                &registry,
                "javascript",
                "console.log(require('fs').existsSync('state.txt'));",
            )
            .await;

        assert_eq!(output, vec!["false"]);
    }

    #[tokio::test]
    async fn test_write_outside_scratch_is_denied() {
        let Some(sandbox) = isolated_sandbox(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
        else {
            return;
        };
        let registry = Registry::builtin();
        let marker = std::env::temp_dir().join(format!(
            "codeaura-outside-scratch-{}.txt",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&marker);
        let source = format!(
            "require('fs').writeFileSync({:?}, 'x');\nconsole.log('written');\n",
            marker.display().to_string()
        );

        let output = sandbox.run(&registry, "javascript", &source).await;

        assert!(!marker.exists());
        assert_eq!(output.len(), 1);
        assert!(output[0].starts_with("Execution error:"));
    }

    #[tokio::test]
    async fn test_child_processes_are_denied() {
        let Some(sandbox) = isolated_sandbox(Duration::from_secs(1)).await else {
            return;
        };
        let registry = Registry::builtin();
        let source = "const { spawn } = require('child_process');\n\
             spawn('sleep', ['8'], { stdio: ['ignore', 'inherit', 'inherit'], detached: true }).unref();\n\
             console.log('x');\n\
             while (true) {}\n";

        let started = std::time::Instant::now();
        let output = sandbox.run(&registry, "javascript", source).await;

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(output.last().unwrap().starts_with("Execution error:"));
    }

    #[tokio::test]
    async fn test_long_run_times_out() {
        let Some(sandbox) = isolated_sandbox(Duration::from_millis(500)).await else {
            return;
        };
        let registry = Registry::builtin();

        let started = std::time::Instant::now();
        let output = sandbox
            .run(&registry, "javascript", "console.log('start'); while (true) {}")
            .await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(
            output.last().unwrap(),
            "Execution error: timed out after 500ms"
        );
    }
}
