//! Three-panel layout and status bar.
//!
//! Pure arithmetic over the frame size, recomputed every draw. At 120 columns
//! and wider the file tree, code browser and feedback panel share the width by
//! `AppState::{left,center,right}_pct`; narrower terminals show only the
//! focused panel, and the feedback panel whenever the composer is open.
//! `Spacing::Overlap(1)` plus `MergeStrategy::Fuzzy` lets adjacent borders
//! share one column.

use ratatui::{
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
    Frame,
};

use crate::app::{AppState, Mode, PanelFocus, ToastKind};
use crate::theme::Theme;

/// `[left, center, right, status_bar]` for the current frame.
///
/// The status bar always takes the last row. Below 120 columns exactly one
/// panel gets the main area and the other two come back with zero width, so
/// callers must skip rendering any rect whose width is 0. The composer forces
/// the feedback panel regardless of focus.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let horizontal = (if term_width >= 120 {
        Layout::horizontal([
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ])
    } else if state.focus == PanelFocus::FileTree && state.mode != Mode::Insert {
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(0), Constraint::Length(0)])
    } else if state.focus == PanelFocus::Feedback || state.mode == Mode::Insert {
        Layout::horizontal([Constraint::Length(0), Constraint::Length(0), Constraint::Fill(1)])
    } else {
        Layout::horizontal([Constraint::Length(0), Constraint::Fill(1), Constraint::Length(0)])
    })
    .spacing(Spacing::Overlap(1));

    let [left, center, right] = main_area.layout(&horizontal);
    [left, center, right, status_bar]
}

/// Panel area inside its 1-cell border.
///
/// Matches what [`panel_block`] leaves for content, so viewport heights
/// measured here agree with what the panels draw. A zero-sized `area` yields
/// a zero-sized rect.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered block; thick when focused.
///
/// `Fuzzy` merging is needed because `Exact` mis-joins thick and plain
/// borders where a focused panel meets an unfocused one.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// One-row status bar, never blank.
///
/// Left to right: the mode badge, the selected repository with its position
/// in the assignment, the staged count, the manual score (with the projected
/// score after staged feedback when it differs), submission progress and the
/// signed-in login. The tail is the quit confirmation while one is pending,
/// otherwise the newest toast.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::Roster => (" MEMBERS ", theme.status_mode_normal),
        Mode::Normal | Mode::ConfirmQuit | Mode::HelpOverlay => (" NORMAL ", theme.status_mode_normal),
    };

    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().fg(mode_fg).add_modifier(Modifier::BOLD),
    )];

    if let Some(work) = &state.work {
        spans.push(Span::raw(format!(
            " {}/{}  {}/{} ",
            work.work.org_name, work.work.repo_name, work.row_num, work.total_student_works
        )));
    } else if state.loading.work {
        spans.push(Span::raw(" loading… "));
    }

    let staged = state.staging.staged().len();
    if staged > 0 {
        spans.push(Span::styled(
            format!(" {staged} staged "),
            Style::default().fg(theme.feedback_pending),
        ));
    }
    if state.work.is_some() {
        let score = state.staging.manual_score().unwrap_or(0);
        let projected = state.staging.projected_score();
        let text = if projected == score {
            format!(" score {score} ")
        } else {
            format!(" score {score} → {projected} ")
        };
        spans.push(Span::raw(text));
    }
    if state.staging.is_submitting() {
        spans.push(Span::raw(" submitting… "));
    }
    if let Some(user) = &state.user {
        spans.push(Span::raw(format!(" @{} ", user.login)));
    }

    if state.mode == Mode::ConfirmQuit {
        spans.push(Span::styled(
            " Quit with unsubmitted feedback? (y/n) ",
            Style::default().fg(theme.toast_error).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(toast) = state.latest_toast() {
        let fg = match toast.kind {
            ToastKind::Success => theme.toast_success,
            ToastKind::Error => theme.toast_error,
        };
        spans.push(Span::styled(format!(" {} ", toast.message), Style::default().fg(fg)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
