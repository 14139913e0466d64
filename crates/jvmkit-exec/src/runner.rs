//! Child process execution in three modes.
//!
//! - [`run_interactive_inherit`]: child shares the controlling terminal, no
//!   capture.
//! - [`run_interactive_pumped`]: piped stdio with one blocking pump thread per
//!   direction; for callers whose own stdin is not a real terminal.
//! - [`run_captured`]: piped stdout/stderr drained by per-stream reader
//!   threads into an ordered chunk log while the parent polls for exit. The
//!   same bytes are mirrored to the caller's [`OutputSink`] as they arrive.
//!
//! Reading both pipes concurrently is what prevents the classic deadlock: a
//! child filling one pipe's buffer (>64KB) while the parent blocks on the
//! other. The captured-mode loop returns only after the child has exited and
//! both readers have hit EOF, so no trailing output is lost.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use jvmkit_core::config::ExecConfig;
use jvmkit_core::observability;

use crate::error::ExecError;

/// Origin stream of a captured chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// One drained read from a child pipe, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: StreamSource,
    pub bytes: Vec<u8>,
}

/// Outcome of a captured run. Chunk order within one stream matches write
/// order; interleaving *across* stdout and stderr reflects drain timing and is
/// best-effort only; two independent OS pipes give no true total order.
#[derive(Debug)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub chunks: Vec<OutputChunk>,
}

impl ProcessResult {
    /// Concatenated stdout-origin bytes, in order.
    pub fn stdout_bytes(&self) -> Vec<u8> {
        self.bytes_for(StreamSource::Stdout)
    }

    /// Concatenated stderr-origin bytes, in order.
    pub fn stderr_bytes(&self) -> Vec<u8> {
        self.bytes_for(StreamSource::Stderr)
    }

    fn bytes_for(&self, stream: StreamSource) -> Vec<u8> {
        self.chunks
            .iter()
            .filter(|c| c.stream == stream)
            .flat_map(|c| c.bytes.iter().copied())
            .collect()
    }
}

/// Live mirror target for captured output. Called from reader threads as
/// chunks arrive, before the run completes.
pub trait OutputSink: Sync {
    fn chunk(&self, stream: StreamSource, bytes: &[u8]);
}

/// Default sink: forward child stdout/stderr to our own stdout/stderr.
pub struct MirrorSink;

impl OutputSink for MirrorSink {
    fn chunk(&self, stream: StreamSource, bytes: &[u8]) {
        match stream {
            StreamSource::Stdout => {
                let mut out = io::stdout();
                let _ = out.write_all(bytes);
                let _ = out.flush();
            }
            StreamSource::Stderr => {
                let mut err = io::stderr();
                let _ = err.write_all(bytes);
                let _ = err.flush();
            }
        }
    }
}

/// Environment overrides for a child process: `Some` sets a variable, `None`
/// removes it from the inherited environment.
pub type EnvOverride = (String, Option<String>);

fn apply_env(command: &mut Command, env: &[EnvOverride]) {
    for (key, value) in env {
        match value {
            Some(v) => {
                command.env(key, v);
            }
            None => {
                command.env_remove(key);
            }
        }
    }
}

fn base_command<'a>(cmd: &'a [String], env: &[EnvOverride], cwd: &Path) -> Result<(Command, &'a str), ExecError> {
    let program = cmd.first().ok_or(ExecError::EmptyCommand)?;
    let mut command = Command::new(program);
    command.args(&cmd[1..]).current_dir(cwd);
    apply_env(&mut command, env);
    Ok((command, program.as_str()))
}

/// Run a child that shares the controlling terminal directly (no capture).
/// Fails with [`ExecError::Shellout`] on non-zero exit.
pub fn run_interactive_inherit(cmd: &[String], env: &[EnvOverride], cwd: &Path) -> Result<(), ExecError> {
    let (mut command, program) = base_command(cmd, env, cwd)?;
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    observability::audit_process_spawned(program, &cmd[1..], &cwd.display().to_string());
    let start = Instant::now();
    let status = command.status().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let exit_code = status.code().unwrap_or(-1);
    observability::audit_process_completed(program, exit_code, start.elapsed().as_millis() as u64, 0);

    if exit_code != 0 {
        return Err(ExecError::Shellout {
            exit_code,
            output: Vec::new(),
        });
    }
    Ok(())
}

/// Run a child with piped stdio and manual stream pumps, for callers whose
/// own stdin is a buffered/replayed source rather than a real terminal.
///
/// Three pumps: our stdin → child stdin, child stdout → our stdout, child
/// stderr → our stderr, each a blocking byte copy until its *source* ends.
/// The stdin pump is detached (our stdin may only reach EOF after the child
/// exits); the output pumps are joined so everything the child wrote is
/// flushed before this returns.
pub fn run_interactive_pumped(cmd: &[String], env: &[EnvOverride], cwd: &Path) -> Result<(), ExecError> {
    let (mut command, program) = base_command(cmd, env, cwd)?;
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    observability::audit_process_spawned(program, &cmd[1..], &cwd.display().to_string());
    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if let Some(mut child_stdin) = child.stdin.take() {
        // Ends when our stdin hits EOF; dropping the handle closes the
        // child's stdin pipe.
        thread::spawn(move || {
            let _ = io::copy(&mut io::stdin(), &mut child_stdin);
        });
    }
    let out_pump = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let _ = io::copy(&mut out, &mut io::stdout());
        })
    });
    let err_pump = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let _ = io::copy(&mut err, &mut io::stderr());
        })
    });

    let status = child.wait()?;
    if let Some(handle) = out_pump {
        let _ = handle.join();
    }
    if let Some(handle) = err_pump {
        let _ = handle.join();
    }

    let exit_code = status.code().unwrap_or(-1);
    observability::audit_process_completed(program, exit_code, start.elapsed().as_millis() as u64, 0);

    if exit_code != 0 {
        return Err(ExecError::Shellout {
            exit_code,
            output: Vec::new(),
        });
    }
    Ok(())
}

/// Run a child with captured stdout/stderr, mirroring output to `sink` live
/// while recording it.
///
/// Per-stream reader threads append tagged chunks to a shared ordered log;
/// the parent polls `try_wait` with a short sleep (`JVMKIT_POLL_INTERVAL_MS`)
/// instead of blocking on either pipe. Returns only once the child has exited
/// and both pipes are fully drained. On non-zero exit the captured log rides
/// along in [`ExecError::Shellout`].
pub fn run_captured(
    cmd: &[String],
    env: &[EnvOverride],
    cwd: &Path,
    sink: &dyn OutputSink,
) -> Result<ProcessResult, ExecError> {
    let (mut command, program) = base_command(cmd, env, cwd)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    observability::audit_process_spawned(program, &cmd[1..], &cwd.display().to_string());
    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let poll_interval = ExecConfig::from_env().poll_interval;
    let log: Mutex<Vec<OutputChunk>> = Mutex::new(Vec::new());
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let exit_code = thread::scope(|scope| -> Result<i32, ExecError> {
        let log_ref = &log;
        let mut readers = Vec::new();
        if let Some(out) = stdout {
            readers.push(scope.spawn(move || drain_stream(out, StreamSource::Stdout, log_ref, sink)));
        }
        if let Some(err) = stderr {
            readers.push(scope.spawn(move || drain_stream(err, StreamSource::Stderr, log_ref, sink)));
        }

        let wait_result = wait_for_exit(&mut child, poll_interval);
        // Readers run to per-pipe EOF, so joining them after exit guarantees
        // the log holds every byte the child wrote.
        for handle in readers {
            let _ = handle.join();
        }
        wait_result
    })?;

    let chunks = log.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    let captured_bytes: usize = chunks.iter().map(|c| c.bytes.len()).sum();
    observability::audit_process_completed(
        program,
        exit_code,
        start.elapsed().as_millis() as u64,
        captured_bytes,
    );

    if exit_code != 0 {
        return Err(ExecError::Shellout {
            exit_code,
            output: chunks,
        });
    }
    Ok(ProcessResult { exit_code, chunks })
}

fn wait_for_exit(child: &mut Child, poll_interval: std::time::Duration) -> Result<i32, ExecError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code().unwrap_or(-1)),
            Ok(None) => thread::sleep(poll_interval),
            Err(e) => return Err(e.into()),
        }
    }
}

fn drain_stream(
    mut src: impl Read,
    stream: StreamSource,
    log: &Mutex<Vec<OutputChunk>>,
    sink: &dyn OutputSink,
) {
    let mut buf = [0u8; 8192];
    loop {
        match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                sink.chunk(stream, &buf[..n]);
                let mut log = log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                log.push(OutputChunk {
                    stream,
                    bytes: buf[..n].to_vec(),
                });
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NullSink;
    impl OutputSink for NullSink {
        fn chunk(&self, _stream: StreamSource, _bytes: &[u8]) {}
    }

    /// Sink that records what it was fed, to check live mirroring.
    struct CollectSink(Mutex<Vec<u8>>);
    impl OutputSink for CollectSink {
        fn chunk(&self, stream: StreamSource, bytes: &[u8]) {
            if stream == StreamSource::Stdout {
                self.0.lock().unwrap().extend_from_slice(bytes);
            }
        }
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[cfg(unix)]
    #[test]
    fn captured_stdout_is_byte_exact() {
        let result = run_captured(&sh("printf 'hello world'"), &[], &cwd(), &NullSink).unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout_bytes(), b"hello world");
    }

    #[cfg(unix)]
    #[test]
    fn captured_chunks_are_tagged_by_origin() {
        let result =
            run_captured(&sh("printf out; printf err >&2"), &[], &cwd(), &NullSink).unwrap();
        assert_eq!(result.stdout_bytes(), b"out");
        assert_eq!(result.stderr_bytes(), b"err");
    }

    #[cfg(unix)]
    #[test]
    fn captured_output_is_mirrored_to_sink_as_well() {
        let sink = CollectSink(Mutex::new(Vec::new()));
        let result = run_captured(&sh("printf mirrored"), &[], &cwd(), &sink).unwrap();
        assert_eq!(result.stdout_bytes(), b"mirrored");
        assert_eq!(sink.0.into_inner().unwrap(), b"mirrored");
    }

    #[cfg(unix)]
    #[test]
    fn captured_nonzero_exit_carries_code_and_log() {
        let err = run_captured(&sh("printf partial; exit 7"), &[], &cwd(), &NullSink).unwrap_err();
        match err {
            ExecError::Shellout { exit_code, output } => {
                assert_eq!(exit_code, 7);
                let stdout: Vec<u8> = output
                    .iter()
                    .filter(|c| c.stream == StreamSource::Stdout)
                    .flat_map(|c| c.bytes.iter().copied())
                    .collect();
                assert_eq!(stdout, b"partial");
            }
            other => panic!("expected Shellout, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn captured_large_output_does_not_deadlock() {
        // Well past the 64KB pipe buffer on both streams.
        let script = "i=0; while [ $i -lt 2000 ]; do printf '0123456789012345678901234567890123456789'; printf 'e' >&2; i=$((i+1)); done";
        let result = run_captured(&sh(script), &[], &cwd(), &NullSink).unwrap();
        assert_eq!(result.stdout_bytes().len(), 2000 * 40);
        assert_eq!(result.stderr_bytes().len(), 2000);
    }

    #[cfg(unix)]
    #[test]
    fn env_override_sets_variable_for_child() {
        let env = vec![("JVMKIT_TEST_CHILD_VAR".to_string(), Some("abc".to_string()))];
        let result = run_captured(
            &sh("printf \"$JVMKIT_TEST_CHILD_VAR\""),
            &env,
            &cwd(),
            &NullSink,
        )
        .unwrap();
        assert_eq!(result.stdout_bytes(), b"abc");
    }

    #[cfg(unix)]
    #[test]
    fn env_override_none_removes_inherited_variable() {
        std::env::set_var("JVMKIT_TEST_REMOVED_VAR", "leaky");
        let env = vec![("JVMKIT_TEST_REMOVED_VAR".to_string(), None)];
        let result = run_captured(
            &sh("printf \"${JVMKIT_TEST_REMOVED_VAR:-unset}\""),
            &env,
            &cwd(),
            &NullSink,
        )
        .unwrap();
        std::env::remove_var("JVMKIT_TEST_REMOVED_VAR");
        assert_eq!(result.stdout_bytes(), b"unset");
    }

    #[cfg(unix)]
    #[test]
    fn inherit_mode_nonzero_exit_raises_shellout() {
        let err = run_interactive_inherit(&sh("exit 3"), &[], &cwd()).unwrap_err();
        assert!(matches!(err, ExecError::Shellout { exit_code: 3, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn pumped_mode_waits_for_exit_and_reports_failure() {
        assert!(run_interactive_pumped(&sh("exit 0"), &[], &cwd()).is_ok());
        let err = run_interactive_pumped(&sh("exit 9"), &[], &cwd()).unwrap_err();
        assert!(matches!(err, ExecError::Shellout { exit_code: 9, .. }));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = run_captured(&[], &[], &cwd(), &NullSink).unwrap_err();
        assert!(matches!(err, ExecError::EmptyCommand));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let cmd = vec!["jvmkit-definitely-not-a-program".to_string()];
        let err = run_captured(&cmd, &[], &cwd(), &NullSink).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
