//! Reload trigger for the scenario file.
//!
//! Editors save in many ways (truncate and write, write a temp file and
//! rename, ...), so the parent directory is watched and any event naming
//! the scenario, or the directory itself, counts as a change. Changes are
//! reported once the file has been quiet for the debounce period.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::perf;

pub struct ScenarioWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    scenario: PathBuf,
    file_name: Option<OsString>,
    quiet_period: Duration,
    last_change: Option<Instant>,
}

impl ScenarioWatcher {
    /// Watch `path`, reporting changes after `quiet_period` without events.
    ///
    /// # Errors
    /// Fails when the platform watcher cannot be created or the directory
    /// cannot be watched.
    pub fn new(path: impl AsRef<Path>, quiet_period: Duration) -> notify::Result<Self> {
        // Backends report canonical paths.
        let scenario = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let file_name = scenario.file_name().map(ToOwned::to_owned);
        let dir = parent_dir(&scenario);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(scenario = %scenario.display(), "watching scenario");

        Ok(Self {
            _watcher: watcher,
            rx,
            dir,
            scenario,
            file_name,
            quiet_period,
            last_change: None,
        })
    }

    pub fn scenario_path(&self) -> &Path {
        &self.scenario
    }

    /// Drain pending events; true once a change has settled.
    pub fn poll_changed(&mut self) -> bool {
        let mut touched = false;
        for event in self.rx.try_iter() {
            match event {
                Ok(event) if self.concerns_scenario(&event) => touched = true,
                Ok(event) => perf::log_event("watcher.skip", format!("{:?}", event.kind)),
                Err(err) => warn!(%err, "scenario watcher error"),
            }
        }
        if touched {
            self.last_change = Some(Instant::now());
        }

        match self.last_change {
            Some(at) if at.elapsed() >= self.quiet_period => {
                self.last_change = None;
                perf::log_event("watcher.changed", self.scenario.display().to_string());
                true
            }
            _ => false,
        }
    }

    /// Time left until a pending change settles.
    pub fn pending_for(&self) -> Option<Duration> {
        self.last_change
            .map(|at| self.quiet_period.saturating_sub(at.elapsed()))
    }

    fn concerns_scenario(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            *path == self.dir
                || *path == self.scenario
                || path.file_name().is_some_and(|name| Some(name) == self.file_name.as_deref())
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
