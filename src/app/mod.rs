//! Interactive terminal front end.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: the player and the state around it
//! - [`Message`]: key presses, clock ticks and file changes
//! - [`update`]: applies a message to the model
//! - [`App::run`]: main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Model, ToastLevel};
pub use update::{Message, update};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::editor::EditorBuffer;
use crate::player::{DEFAULT_LOCALE, Player, PlayerConfig};
use crate::scenario::Scenario;
use crate::texts::CLICK_HINT;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    scenario_path: PathBuf,
    watch_enabled: bool,
    config: PlayerConfig,
    autoplay: bool,
}

impl App {
    pub fn new(scenario_path: PathBuf) -> Self {
        Self {
            scenario_path,
            watch_enabled: false,
            config: PlayerConfig::default(),
            autoplay: false,
        }
    }

    /// Reload the scenario when the file changes.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    pub fn with_player_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start playing as soon as the terminal is up.
    pub const fn with_autoplay(mut self, enabled: bool) -> Self {
        self.autoplay = enabled;
        self
    }
}

/// Load `path` and prepare it for the configured locale.
///
/// The first message of the scenario learns how to continue playback
/// (the click hint from the text table).
pub fn load_scenario(path: &Path, config: &PlayerConfig) -> Result<Scenario> {
    let mut scenario = Scenario::load(path)
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;
    let locale = config.locale.as_deref().unwrap_or(DEFAULT_LOCALE);
    scenario.annotate_first_message(config.texts.get(CLICK_HINT), locale);
    debug!(
        steps = scenario.steps.len(),
        mode = ?scenario.editor_mode(),
        "scenario loaded"
    );
    Ok(scenario)
}

/// A player over a fresh terminal editor buffer.
pub fn build_player(scenario: Scenario, config: PlayerConfig) -> Player {
    Player::new(Box::new(EditorBuffer::empty()), scenario, config)
}
