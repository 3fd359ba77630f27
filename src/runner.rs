//! Compiles generated C source and runs the resulting program.
//!
//! Both child processes are supervised the same way: stdout and stderr are
//! read line by line on their own threads and forwarded over a channel, while
//! the supervising thread polls for exit, timeout and cancellation.

use crate::config::BuilderConfig;
use chrono::{DateTime, Local, TimeDelta};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long output may keep arriving after the child has exited.
const DRAIN_LIMIT: Duration = Duration::from_secs(2);
/// Lines kept in a [`RunReport`] and in compiler error output.
pub const MAX_REPORT_LINES: usize = 1000;
const SOURCE_FILE: &str = "main.c";
const PROGRAM_FILE: &str = "gooey_app";

/// Shared stop flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancels `token` when a line reading `q` or `quit` arrives on `input`.
/// End of input leaves the token alone.
pub fn cancel_on_quit<R>(input: R, token: CancelToken) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            if matches!(line.trim(), "q" | "quit") {
                info!("stop requested");
                token.cancel();
                break;
            }
        }
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Compile => "compile",
            Stage::Run => "run",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => s,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("compiler `{compiler}` not found: {source}")]
    CompilerNotFound {
        compiler: String,
        #[source]
        source: which::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("compilation failed (exit code {code:?}):\n{output}")]
    CompileFailed { code: Option<i32>, output: String },
    #[error("{stage} step exceeded {limit:?}")]
    Timeout { stage: Stage, limit: Duration },
    #[error("{stage} step cancelled")]
    Cancelled { stage: Stage },
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub compiler: PathBuf,
    /// `None` when the program was terminated by a signal.
    pub exit_code: Option<i32>,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    /// The last [`MAX_REPORT_LINES`] lines of output.
    pub lines: Vec<OutputLine>,
    /// Older lines that were streamed but not kept.
    pub dropped_lines: usize,
}

/// Keeps the most recent lines of a stream, counting the ones it let go.
#[derive(Debug)]
struct Tail<T> {
    lines: VecDeque<T>,
    cap: usize,
    dropped: usize,
}

impl<T> Tail<T> {
    fn new(cap: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            cap,
            dropped: 0,
        }
    }

    fn push(&mut self, line: T) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }
}

impl RunReport {
    pub fn elapsed(&self) -> TimeDelta {
        self.finished - self.started
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Compiles `source` with the configured compiler and runs the program.
/// Every output line of the program is passed to `on_line` as it arrives.
pub fn build_and_run(
    source: &str,
    config: &BuilderConfig,
    cancel: &CancelToken,
    mut on_line: impl FnMut(&OutputLine),
) -> Result<RunReport, RunError> {
    let compiler = which::which(&config.compiler).map_err(|source| RunError::CompilerNotFound {
        compiler: config.compiler.clone(),
        source,
    })?;

    let workdir = tempfile::Builder::new().prefix("gooey-run-").tempdir()?;
    let program = compile(source, &compiler, config, workdir.path(), cancel)?;

    let started = Local::now();
    info!(program = %program.display(), "starting program");
    let child = Command::new(&program)
        .current_dir(workdir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut tail = Tail::new(MAX_REPORT_LINES);
    let run_timeout = config.run_timeout_secs.map(Duration::from_secs);
    let status = supervise(child, Stage::Run, run_timeout, cancel, |line| {
        on_line(&line);
        tail.push(line);
    })?;
    let finished = Local::now();

    let report = RunReport {
        compiler,
        exit_code: status.code(),
        started,
        finished,
        lines: tail.lines.into(),
        dropped_lines: tail.dropped,
    };
    info!(
        exit_code = ?report.exit_code,
        elapsed_ms = report.elapsed().num_milliseconds(),
        dropped_lines = report.dropped_lines,
        "program finished"
    );
    Ok(report)
}

fn compile(
    source: &str,
    compiler: &Path,
    config: &BuilderConfig,
    dir: &Path,
    cancel: &CancelToken,
) -> Result<PathBuf, RunError> {
    let source_path = dir.join(SOURCE_FILE);
    let program = dir.join(PROGRAM_FILE);
    std::fs::write(&source_path, source)?;

    debug!(compiler = %compiler.display(), flags = ?config.compile_flags, "compiling");
    let child = Command::new(compiler)
        .arg(&source_path)
        .arg("-o")
        .arg(&program)
        .args(&config.compile_flags)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut output = Tail::new(MAX_REPORT_LINES);
    let limit = Duration::from_secs(config.compile_timeout_secs);
    let status = supervise(child, Stage::Compile, Some(limit), cancel, |line| {
        output.push(line.text().to_string());
    })?;
    let output = Vec::from(output.lines);
    if !status.success() {
        return Err(RunError::CompileFailed {
            code: status.code(),
            output: output.join("\n"),
        });
    }
    for line in &output {
        warn!(target: "compiler", "{line}");
    }
    Ok(program)
}

/// Waits for `child`, forwarding its output, and kills it on timeout or
/// cancellation.
fn supervise(
    mut child: Child,
    stage: Stage,
    limit: Option<Duration>,
    cancel: &CancelToken,
    mut on_line: impl FnMut(OutputLine),
) -> Result<ExitStatus, RunError> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, OutputLine::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, OutputLine::Stderr, tx.clone()));
    }
    drop(tx);

    let started = Instant::now();
    let mut streams_open = true;
    let status = loop {
        if streams_open {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => on_line(line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => streams_open = false,
            }
        } else {
            thread::sleep(POLL_INTERVAL);
        }

        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            terminate(&mut child, stage);
            return Err(RunError::Cancelled { stage });
        }
        if let Some(limit) = limit
            && started.elapsed() >= limit
        {
            terminate(&mut child, stage);
            return Err(RunError::Timeout { stage, limit });
        }
    };

    // The child is gone, but a process it started can keep the pipes open.
    let deadline = Instant::now() + DRAIN_LIMIT;
    loop {
        match rx.recv_deadline(deadline) {
            Ok(line) => on_line(line),
            Err(RecvTimeoutError::Disconnected) => {
                for reader in readers {
                    if reader.join().is_err() {
                        warn!(%stage, "output reader panicked");
                    }
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(%stage, "output still open after exit; detaching readers");
                break;
            }
        }
    }
    debug!(%stage, code = ?status.code(), "child exited");
    Ok(status)
}

fn terminate(child: &mut Child, stage: Stage) {
    warn!(%stage, pid = child.id(), "terminating child process");
    if let Err(err) = child.kill() {
        debug!(%err, "kill failed, child probably exited");
    }
    if let Err(err) = child.wait() {
        debug!(%err, "wait after kill failed");
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    source: R,
    wrap: fn(String) -> OutputLine,
    tx: Sender<OutputLine>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if tx.send(wrap(line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_with(compiler: &str) -> BuilderConfig {
        BuilderConfig {
            compiler: compiler.to_string(),
            ..BuilderConfig::default()
        }
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_quit_line_cancels() {
        let token = CancelToken::new();
        let input = std::io::Cursor::new("hello\n  q \nignored\n");
        cancel_on_quit(input, token.clone()).join().unwrap();
        assert!(token.is_cancelled());

        let token = CancelToken::new();
        cancel_on_quit(std::io::Cursor::new("quiet\n"), token.clone())
            .join()
            .unwrap();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_missing_compiler() {
        let err = build_and_run(
            "int main(void) { return 0; }",
            &config_with("gooey-no-such-compiler-7f3a"),
            &CancelToken::new(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, RunError::CompilerNotFound { .. }));
        assert!(err.to_string().contains("gooey-no-such-compiler-7f3a"));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_supervise_collects_both_streams() {
        let mut lines = Vec::new();
        let status = supervise(
            shell("echo one; echo two >&2; echo three; exit 3"),
            Stage::Run,
            None,
            &CancelToken::new(),
            |line| lines.push(line),
        )
        .unwrap();
        assert_eq!(status.code(), Some(3));

        let stdout: Vec<&OutputLine> = lines
            .iter()
            .filter(|l| matches!(l, OutputLine::Stdout(_)))
            .collect();
        assert_eq!(
            stdout,
            vec![
                &OutputLine::Stdout("one".into()),
                &OutputLine::Stdout("three".into())
            ]
        );
        assert!(lines.contains(&OutputLine::Stderr("two".into())));
    }

    #[cfg(unix)]
    #[test]
    fn test_supervise_timeout_kills_child() {
        let started = Instant::now();
        let err = supervise(
            shell("sleep 10"),
            Stage::Run,
            Some(Duration::from_millis(200)),
            &CancelToken::new(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Timeout { stage: Stage::Run, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_supervise_cancel_from_other_thread() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            remote.cancel();
        });
        let err = supervise(shell("sleep 10"), Stage::Compile, None, &token, |_| {}).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, RunError::Cancelled { stage: Stage::Compile }));
    }

    #[test]
    fn test_tail_keeps_latest_lines() {
        let mut tail = Tail::new(3);
        for n in 0..10 {
            tail.push(n);
        }
        assert_eq!(Vec::from(tail.lines), vec![7, 8, 9]);
        assert_eq!(tail.dropped, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_supervise_does_not_wait_on_inherited_pipes() {
        // The background sleep keeps stdout open after the shell exits.
        let started = Instant::now();
        let mut lines = Vec::new();
        let status = supervise(
            shell("sleep 10 & echo done"),
            Stage::Run,
            None,
            &CancelToken::new(),
            |line| lines.push(line),
        )
        .unwrap();
        assert!(status.success());
        assert_eq!(lines, vec![OutputLine::Stdout("done".into())]);
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[cfg(unix)]
    #[test]
    fn test_build_and_run_with_stub_compiler() {
        use std::os::unix::fs::PermissionsExt;

        // Stands in for gcc: `$1` is the source, `$3` the output path.
        let tools = tempfile::tempdir().unwrap();
        let cc = tools.path().join("fake-cc");
        std::fs::write(
            &cc,
            concat!(
                "#!/bin/sh\n",
                "printf '#!/bin/sh\\necho hello from %s\\n' \"$(basename \"$1\")\" > \"$3\"\n",
                "chmod +x \"$3\"\n",
            ),
        )
        .unwrap();
        std::fs::set_permissions(&cc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = config_with(cc.to_str().unwrap());
        config.run_timeout_secs = Some(10);
        let mut streamed = Vec::new();
        let report = build_and_run(
            "int main(void) { return 0; }",
            &config,
            &CancelToken::new(),
            |line| streamed.push(line.clone()),
        )
        .unwrap();

        assert!(report.success());
        assert_eq!(report.lines, vec![OutputLine::Stdout("hello from main.c".into())]);
        assert_eq!(report.dropped_lines, 0);
        assert_eq!(streamed, report.lines);
        assert!(report.finished >= report.started);
    }

    #[cfg(unix)]
    #[test]
    fn test_compile_failure_reports_output() {
        use std::os::unix::fs::PermissionsExt;

        let tools = tempfile::tempdir().unwrap();
        let cc = tools.path().join("broken-cc");
        std::fs::write(&cc, "#!/bin/sh\necho 'main.c:1: error: nope' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&cc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = build_and_run(
            "int main(void) {",
            &config_with(cc.to_str().unwrap()),
            &CancelToken::new(),
            |_| {},
        )
        .unwrap_err();
        match err {
            RunError::CompileFailed { code, output } => {
                assert_eq!(code, Some(1));
                assert!(output.contains("error: nope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
