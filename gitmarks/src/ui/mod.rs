//! Rendering.
//!
//! [`render`] is the single entry point, called once per `AppEvent::Render`
//! inside `terminal.draw()`. Layout arithmetic lives in `layout`; each panel
//! has its own module.

pub mod code_view;
pub mod feedback_panel;
pub mod file_tree;
pub mod help;
pub mod keybindings;
mod layout;
pub mod roster;

use ratatui::Frame;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Draws one frame.
///
/// Viewport heights and panel rects are written back into `state` first so
/// the next keypress can size page scrolls and hit-test clicks. The one-frame
/// lag is not noticeable.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [left, center, right, status_bar] = compute_layout(frame, state);

    state.tree_viewport_height = inner_rect(left).height;
    state.code_viewport_height = inner_rect(center).height;
    state.feedback_viewport_height = inner_rect(right).height;
    state.panel_rects = [left, center, right];

    if left.width > 0 {
        file_tree::render_file_tree(frame, left, state, theme);
    }
    if center.width > 0 {
        code_view::render_code(frame, center, state, theme);
    }
    if right.width > 0 {
        feedback_panel::render_feedback(frame, right, state, theme);
    }
    render_status_bar(frame, status_bar, state, theme);

    match state.mode {
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, state.help_scroll),
        Mode::Roster => roster::render_roster_overlay(frame, state, theme),
        _ => {}
    }
}
