//! Terminal rendering of the stage.
//!
//! - [`render`]: layout, code area with cursor and selections
//! - `status`: roadmap, compile button, status and toast bars
//! - `overlays`: annotation bubbles and the help popup
//! - [`style`]: colors

pub mod style;

mod overlays;
mod render;
mod status;

pub use render::{Areas, areas, code_cell, line_number_width, render};

/// Columns between the gutter and the code.
pub const GUTTER_PADDING: u16 = 1;
