//! Structured audit events for process execution and artifact packaging.
//!
//! Events are emitted through `tracing` with a JSON payload so a subscriber
//! can route them to an audit log. Info-level events are suppressed when
//! `JVMKIT_QUIET` is set.

use crate::config::ObservabilityConfig;

fn enabled() -> bool {
    !ObservabilityConfig::from_env().quiet
}

pub fn audit_process_spawned(program: &str, args: &[String], cwd: &str) {
    if !enabled() {
        return;
    }
    tracing::info!(
        target: "jvmkit::audit",
        event = "process_spawned",
        payload = %serde_json::json!({
            "program": program,
            "args": args,
            "cwd": cwd,
        }),
    );
}

pub fn audit_process_completed(program: &str, exit_code: i32, duration_ms: u64, captured_bytes: usize) {
    if !enabled() {
        return;
    }
    tracing::info!(
        target: "jvmkit::audit",
        event = "process_completed",
        payload = %serde_json::json!({
            "program": program,
            "exit_code": exit_code,
            "duration_ms": duration_ms,
            "captured_bytes": captured_bytes,
        }),
    );
}

pub fn audit_artifact_written(kind: &str, path: &str, entries: usize, skipped: usize) {
    if !enabled() {
        return;
    }
    tracing::info!(
        target: "jvmkit::audit",
        event = "artifact_written",
        payload = %serde_json::json!({
            "kind": kind,
            "path": path,
            "entries": entries,
            "skipped_duplicates": skipped,
        }),
    );
}

pub fn audit_sandbox_opened(classpath_entries: usize, libraries: usize) {
    if !enabled() {
        return;
    }
    tracing::info!(
        target: "jvmkit::audit",
        event = "sandbox_opened",
        payload = %serde_json::json!({
            "classpath_entries": classpath_entries,
            "libraries": libraries,
        }),
    );
}
