// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. player::PlayerState)
    clippy::module_name_repetitions
)]

//! # Codeplay
//!
//! Scripted playback of code-editing tutorials.
//!
//! A scenario is a list of steps (type this, select that, show a message,
//! pretend to compile) that a [`player::Player`] performs against an
//! [`editor::Editor`], with pause, skip, rewind and fast-forward.
//!
//! ## Architecture
//!
//! The core is single-threaded and clock-free: actions schedule
//! continuations on a virtual-clock [`timer::TimerRegistry`] which the
//! embedding drives with [`player::Player::tick`]. The terminal front end
//! follows The Elm Architecture (TEA):
//! - **Model**: the player plus front-end state
//! - **Message**: key presses, clock ticks, file changes
//! - **Update**: applies a message to the model
//! - **View**: renders the stage and the editor
//!
//! ## Modules
//!
//! - [`player`]: playback state machine
//! - [`registry`]: action lookup and option parsing
//! - [`locate`]: position resolver for structural addresses
//! - [`editor`]: editor contract and rope-backed buffer
//! - [`stage`]: roadmap, annotations, compile button
//! - [`scenario`]: scenario files
//! - [`app`] / [`ui`]: terminal front end
//! - [`watcher`]: scenario reload on change

mod actions;
pub mod app;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod locate;
pub mod perf;
pub mod player;
pub mod registry;
pub mod scenario;
pub mod stage;
pub mod texts;
pub mod timer;
pub mod ui;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::editor::{Editor, EditorBuffer, Pos, Range};
    pub use crate::error::PlayerError;
    pub use crate::player::{Next, Player, PlayerConfig, PlayerState};
    pub use crate::registry::{ActionRegistry, ActionSpec};
    pub use crate::scenario::{Scenario, Step};
}
