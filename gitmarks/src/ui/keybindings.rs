//! Key and mouse dispatch.
//!
//! Branches on `state.mode` first so every mode has its own handler. Handlers
//! only mutate `AppState`; anything that needs the network or the draft store
//! is queued there and drained by the main loop.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use gitmarks_core::roles::MemberAction;
use gitmarks_core::types::ClassroomRole;
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PanelFocus};

/// Whether the event loop keeps running after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::ConfirmQuit => handle_confirm_quit(key, state),
        Mode::Normal => handle_normal(key, state),
        Mode::Insert => handle_insert(key, state),
        Mode::Roster => handle_roster(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }
    if let Some(action) = handle_panel_key(key, state) {
        return action;
    }

    match key.code {
        KeyCode::Char('H') | KeyCode::BackTab => state.focus = state.focus.prev(),
        KeyCode::Char('L') | KeyCode::Tab => state.focus = state.focus.next(),

        KeyCode::Char('<') => state.shrink_code_panel(),
        KeyCode::Char('>') => state.grow_code_panel(),

        KeyCode::Char('c') => state.begin_compose(),
        KeyCode::Char('e') => state.begin_edit(),
        KeyCode::Char('x') => state.discard_selected(),
        KeyCode::Char('a') => state.apply_rubric(),
        KeyCode::Char('S') => state.submit(),

        KeyCode::Char('n') => state.next_work(),
        KeyCode::Char('p') => state.prev_work(),
        KeyCode::Char('r') => state.refresh(),
        KeyCode::Char('R') => state.open_roster(),

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
        }

        KeyCode::Char('q') | KeyCode::Esc => {
            if state.request_quit() {
                return KeyAction::Quit;
            }
        }

        _ => {}
    }
    KeyAction::Continue
}

/// Keys whose meaning depends on the focused panel.
fn handle_panel_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    match (state.focus, key.code) {
        (PanelFocus::FileTree, KeyCode::Enter | KeyCode::Char('l')) => state.open_selected(),
        (PanelFocus::FileTree, KeyCode::Char('h')) => state.collapse_selected(),

        (PanelFocus::Code, KeyCode::Char('}')) => state.next_feedback_line(),
        (PanelFocus::Code, KeyCode::Char('{')) => state.prev_feedback_line(),
        (PanelFocus::Code, KeyCode::Char(']')) => state.cycle_line_entry(true),
        (PanelFocus::Code, KeyCode::Char('[')) => state.cycle_line_entry(false),
        (PanelFocus::Code, KeyCode::Enter) => state.begin_compose(),

        (PanelFocus::Feedback, KeyCode::Char(' ') | KeyCode::Enter) => state.toggle_rubric_item(),

        _ => return None,
    }
    Some(KeyAction::Continue)
}

/// j / k / g / G and the Ctrl page keys.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        KeyCode::PageDown => state.full_page_down(),
        KeyCode::PageUp => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// ConfirmQuit mode
// ---------------------------------------------------------------------------

fn handle_confirm_quit(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::Quit,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Roster mode
// ---------------------------------------------------------------------------

fn handle_roster(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.move_roster_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => state.move_roster_cursor(-1),
        KeyCode::Char('g') | KeyCode::Home => state.move_roster_cursor(isize::MIN),
        KeyCode::Char('G') | KeyCode::End => state.move_roster_cursor(isize::MAX),

        KeyCode::Char('a') => state.act_on_member(MemberAction::Invite),
        KeyCode::Char('d') => state.act_on_member(MemberAction::Deny),
        KeyCode::Char('v') => state.act_on_member(MemberAction::Revoke),
        KeyCode::Char('x') => state.act_on_member(MemberAction::Remove),

        KeyCode::Char('t') => state.issue_token(ClassroomRole::Student),
        KeyCode::Char('T') => state.issue_token(ClassroomRole::Ta),
        KeyCode::Char('r') => state.open_roster(),

        KeyCode::Char('R') | KeyCode::Char('q') | KeyCode::Esc => state.close_roster(),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => state.cancel_compose(),
        KeyCode::Enter => state.commit_compose(),
        KeyCode::Tab | KeyCode::BackTab => {
            if let Some(composer) = state.composer.as_mut() {
                composer.switch_field();
            }
        }
        KeyCode::Backspace => {
            if let Some(composer) = state.composer.as_mut() {
                composer.backspace();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(composer) = state.composer.as_mut() {
                composer.push(c);
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Left click focuses a panel; the wheel scrolls by 3.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_mouse_click(mouse.column, mouse.row, state),
        MouseEventKind::ScrollUp => match state.mode {
            Mode::HelpOverlay => state.help_scroll = state.help_scroll.saturating_sub(3),
            Mode::Roster => state.move_roster_cursor(-3),
            _ => state.scroll_up(3),
        },
        MouseEventKind::ScrollDown => match state.mode {
            Mode::HelpOverlay => state.help_scroll = state.help_scroll.saturating_add(3),
            Mode::Roster => state.move_roster_cursor(3),
            _ => state.scroll_down(3),
        },
        _ => {}
    }
    KeyAction::Continue
}

/// Collapsed (zero-width) panels cannot take focus.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) {
    if state.mode != Mode::Normal {
        return;
    }
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::FileTree;
    } else if center.contains(pos) {
        state.focus = PanelFocus::Code;
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Feedback;
    }
}
