//! Code browser panel.
//!
//! Each source line gets a line-number gutter and a change marker taken from
//! the file's [`DiffMemo`](gitmarks_core::diff_memo::DiffMemo). Feedback on a
//! line is rendered as indented rows directly beneath it. Text is shown plain
//! until the highlight thread delivers styled lines.

use std::collections::BTreeSet;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use gitmarks_core::feedback::{LineFeedback, LineFeedbackState};

use crate::app::{AppState, OpenFile, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_code(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::Code;
    let title = match &state.open_file {
        Some(file) => match file.language {
            Some(lang) => format!("{} [{lang}]", file.path),
            None => file.path.clone(),
        },
        None => "Code".to_owned(),
    };
    frame.render_widget(panel_block(title, is_focused, theme), area);
    let inner = inner_rect(area);

    let Some(file) = state.open_file.as_ref() else {
        let msg = if state.tree_rows.is_empty() { "" } else { "Select a file with Enter" };
        frame.render_widget(Paragraph::new(msg).style(Style::default().fg(theme.line_number)), inner);
        return;
    };
    if file.lines.is_none() {
        frame.render_widget(Paragraph::new("Loading..."), inner);
        return;
    }

    let annotated: BTreeSet<usize> = state.staging.lines_with_feedback(&file.path).into_iter().collect();
    let height = inner.height as usize;
    state.code_scroll = follow_cursor(state.code_scroll, state.code_cursor, height, |i| {
        if annotated.contains(&(i + 1)) {
            1 + state.staging.line_feedback(&file.path, i + 1).len()
        } else {
            1
        }
    });

    let lines = build_lines(state, file, &annotated, height, theme, is_focused);
    frame.render_widget(Paragraph::new(lines), inner);
}

/// First line to draw so the cursor line and its feedback rows are visible.
/// `rows_for(i)` is the number of screen rows line `i` occupies.
fn follow_cursor(scroll: usize, cursor: usize, height: usize, rows_for: impl Fn(usize) -> usize) -> usize {
    if cursor < scroll || height == 0 {
        return cursor;
    }
    let mut start = scroll;
    while start < cursor && (start..=cursor).map(&rows_for).sum::<usize>() > height {
        start += 1;
    }
    start
}

fn build_lines(
    state: &AppState,
    file: &OpenFile,
    annotated: &BTreeSet<usize>,
    height: usize,
    theme: &Theme,
    is_focused: bool,
) -> Vec<Line<'static>> {
    let count = file.line_count();
    let width = count.max(1).to_string().len();
    let mut out = Vec::with_capacity(height);

    for i in state.code_scroll..count {
        if out.len() >= height {
            break;
        }
        let is_cursor = i == state.code_cursor;
        let mut line = source_line(file, i, width, theme);
        if is_cursor {
            let bg = if is_focused { theme.cursor_line_bg } else { theme.status_bar_bg };
            line = line.style(Style::default().bg(bg));
        }
        out.push(line);

        if annotated.contains(&(i + 1)) {
            let entries = state.staging.line_feedback(&file.path, i + 1);
            let selected = is_cursor.then_some(state.line_entry_cursor.min(entries.len().saturating_sub(1)));
            for (n, entry) in entries.iter().enumerate() {
                out.push(feedback_row(entry, width, selected == Some(n), theme));
            }
        }
    }
    out
}

fn source_line(file: &OpenFile, i: usize, width: usize, theme: &Theme) -> Line<'static> {
    let number = Span::styled(format!("{:>width$} ", i + 1), Style::default().fg(theme.line_number));
    let marker = if file.memo.is_diff(i) {
        Span::styled("▎", Style::default().fg(theme.diff_marker))
    } else {
        Span::raw(" ")
    };

    let mut spans = vec![number, marker, Span::raw(" ")];
    match file.highlighted.as_ref().and_then(|h| h.get(i)) {
        Some(styled) => spans.extend(styled.spans.iter().cloned()),
        None => {
            let text = file.lines.as_ref().and_then(|l| l.get(i)).cloned().unwrap_or_default();
            spans.push(Span::styled(text, Style::default().fg(theme.plain_text)));
        }
    }
    Line::from(spans)
}

fn feedback_row(entry: &LineFeedback<'_>, width: usize, selected: bool, theme: &Theme) -> Line<'static> {
    let (tag, color) = match entry.state {
        LineFeedbackState::Confirmed => ("", theme.feedback_confirmed),
        LineFeedbackState::PendingEdit => (" [edited]", theme.feedback_pending),
        LineFeedbackState::PendingCreate => (" [new]", theme.feedback_pending),
    };
    let fb = entry.feedback;
    let points_color = match fb.points {
        p if p > 0 => theme.points_addition,
        p if p < 0 => theme.points_deduction,
        _ => theme.points_neutral,
    };
    let mut style = Style::default().fg(color);
    if selected {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    let mut spans = vec![
        Span::raw(" ".repeat(width + 3)),
        Span::styled("┃ ", Style::default().fg(color)),
        Span::styled(fb.body.clone(), style),
        Span::styled(format!(" ({:+})", fb.points), Style::default().fg(points_color)),
        Span::styled(tag, Style::default().fg(color).add_modifier(Modifier::ITALIC)),
    ];
    if let Some(ta) = &fb.ta_username {
        spans.push(Span::styled(format!("  @{ta}"), Style::default().fg(theme.line_number)));
    }
    Line::from(spans)
}
