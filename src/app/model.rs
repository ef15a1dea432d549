use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::player::{Player, PlayerConfig, PlayerState};
use crate::scenario::Scenario;

use super::{build_player, load_scenario};

const TOAST_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// The complete front-end state.
#[derive(Debug)]
pub struct Model {
    pub player: Player,
    pub scenario_path: PathBuf,
    /// Rebuilds the player on reload.
    pub config: PlayerConfig,
    /// Draw the compile button.
    pub has_compile: bool,
    pub watch_enabled: bool,
    pub help_visible: bool,
    /// First code line shown.
    pub scroll_offset: usize,
    pub terminal_size: (u16, u16),
    pub should_quit: bool,
    toast: Option<Toast>,
}

impl Model {
    pub fn new(scenario_path: PathBuf, scenario: Scenario, config: PlayerConfig) -> Self {
        let has_compile = scenario.has_compile_step();
        Self {
            player: build_player(scenario, config.clone()),
            scenario_path,
            config,
            has_compile,
            ..Self::default()
        }
    }

    /// Load the scenario again and start over with a fresh player.
    pub(super) fn reload_from_disk(&mut self) -> Result<()> {
        let scenario = load_scenario(&self.scenario_path, &self.config)?;
        self.config.fast_forward = self.player.is_fast_forward();
        self.has_compile = scenario.has_compile_step();
        self.player = build_player(scenario, self.config.clone());
        self.scroll_offset = 0;
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.player.state() == PlayerState::Playing
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_LIFETIME,
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    /// Scroll so that `line` is among the `height` visible code lines.
    pub fn keep_line_visible(&mut self, line: usize, height: usize) {
        if height == 0 {
            return;
        }
        if line < self.scroll_offset {
            self.scroll_offset = line;
        } else if line >= self.scroll_offset + height {
            self.scroll_offset = line + 1 - height;
        }
    }
}

// Implement Default for Model to allow std::mem::take
impl Default for Model {
    fn default() -> Self {
        Self {
            player: build_player(Scenario::default(), PlayerConfig::default()),
            scenario_path: PathBuf::new(),
            config: PlayerConfig::default(),
            has_compile: false,
            watch_enabled: false,
            help_visible: false,
            scroll_offset: 0,
            terminal_size: (80, 24),
            should_quit: false,
            toast: None,
        }
    }
}
