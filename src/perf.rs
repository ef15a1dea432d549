//! Timings and the playback trace log.
//!
//! `--perf` prints how long startup, reloads and headless runs take.
//! `--trace-log PATH` writes every player transition, dispatched step and
//! watcher event to `PATH`, stamped with wall-clock milliseconds since the
//! log was opened. Both are process-wide and set once from the command line.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

static TIMINGS: AtomicBool = AtomicBool::new(false);
static TRACE: LazyLock<Mutex<Option<TraceLog>>> = LazyLock::new(|| Mutex::new(None));

/// Prints its lifetime on drop when timings are on.
#[derive(Debug)]
#[must_use = "a timing scope measures until it is dropped"]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        eprintln!("[perf] {}: {elapsed_ms:.2} ms", self.name);
    }
}

struct TraceLog {
    opened: Instant,
    lines: usize,
    out: BufWriter<File>,
}

impl TraceLog {
    fn create(path: &Path) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "# codeplay trace")?;
        out.flush()?;
        Ok(Self {
            opened: Instant::now(),
            lines: 0,
            out,
        })
    }

    fn write(&mut self, name: &str, detail: &str) -> io::Result<()> {
        let ms = self.opened.elapsed().as_secs_f64() * 1000.0;
        self.lines += 1;
        writeln!(self.out, "{:>6} [{ms:>10.3} ms] {name}: {detail}", self.lines)?;
        self.out.flush()
    }
}

fn trace() -> MutexGuard<'static, Option<TraceLog>> {
    TRACE.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    TIMINGS.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    TIMINGS.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Open the trace log at `path`, replacing any open one; `None` closes it.
pub fn set_trace_log(path: Option<&Path>) -> io::Result<()> {
    let log = path.map(TraceLog::create).transpose()?;
    *trace() = log;
    Ok(())
}

pub fn is_tracing() -> bool {
    trace().is_some()
}

/// Number of events written since the trace log was opened.
pub fn traced_events() -> usize {
    trace().as_ref().map_or(0, |log| log.lines)
}

/// Append one event to the trace log, if open. Write failures close it.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut guard = trace();
    let Some(log) = guard.as_mut() else {
        return;
    };
    if let Err(err) = log.write(name, detail.as_ref()) {
        tracing::warn!(%err, "trace log closed after write failure");
        *guard = None;
    }
}
