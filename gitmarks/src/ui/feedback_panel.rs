//! Feedback panel: the work header with its score, the composer while in
//! Insert mode, the assignment rubric, and the feedback on the cursor line
//! including the word-level history of edited entries.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use similar::{ChangeTag, TextDiff};

use gitmarks_core::feedback::LineFeedbackState;
use gitmarks_core::rubric::ItemImpact;
use gitmarks_core::types::Feedback;

use crate::app::{AppState, ComposerField, ComposerTarget, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_feedback(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::Feedback;
    frame.render_widget(panel_block("Feedback", is_focused, theme), area);
    let inner = inner_rect(area);

    let mut lines = Vec::new();
    header_lines(state, theme, &mut lines);
    composer_lines(state, theme, &mut lines);
    let cursor_row = rubric_lines(state, theme, is_focused, &mut lines);
    line_feedback_lines(state, theme, &mut lines);

    let height = inner.height as usize;
    let scroll = cursor_row.map_or(0, |row| (row + 1).saturating_sub(height));
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
        inner,
    );
}

fn heading(text: impl Into<String>, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD),
    ))
}

fn header_lines(state: &AppState, theme: &Theme, out: &mut Vec<Line<'static>>) {
    let Some(work) = &state.work else {
        let msg = if state.loading.work { "Loading student work..." } else { "No student work selected" };
        out.push(Line::raw(msg));
        return;
    };
    out.push(heading(work.contributor_names(), theme));
    out.push(Line::raw(format!("{}/{}", work.work.org_name, work.work.repo_name)));

    let score = state.staging.manual_score().unwrap_or(0);
    let projected = state.staging.projected_score();
    let mut spans = vec![Span::raw(format!("Manual score: {score}"))];
    if projected != score {
        spans.push(Span::styled(
            format!(" → {projected}"),
            Style::default().fg(theme.feedback_pending),
        ));
    }
    out.push(Line::from(spans));
    if let Some(auto) = work.work.auto_grader_score {
        out.push(Line::raw(format!("Autograder: {auto}")));
    }
    out.push(Line::raw(""));
}

fn composer_lines(state: &AppState, theme: &Theme, out: &mut Vec<Line<'static>>) {
    let Some(composer) = &state.composer else {
        return;
    };
    let title = match &composer.target {
        ComposerTarget::New { path, line } => format!("New feedback on {path}:{line}"),
        ComposerTarget::Edit { id } => format!("Editing feedback #{id}"),
    };
    out.push(heading(title, theme));

    let field = |label: &str, value: &str, active: bool| {
        let cursor = if active { "▏" } else { "" };
        let style = if active {
            Style::default().fg(theme.status_mode_insert)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(theme.line_number)),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    };
    out.push(field("Comment", &composer.body, composer.field == ComposerField::Body));
    out.push(field("Points", &composer.points, composer.field == ComposerField::Points));
    out.push(Line::styled(
        "Enter save · Tab switch field · Esc cancel",
        Style::default().fg(theme.line_number),
    ));
    out.push(Line::raw(""));
}

/// Appends the rubric and returns the row index of the cursor item.
fn rubric_lines(state: &AppState, theme: &Theme, is_focused: bool, out: &mut Vec<Line<'static>>) -> Option<usize> {
    let Some(rubric) = &state.rubric else {
        if state.loading.rubric {
            out.push(Line::raw("Loading rubric..."));
        }
        return None;
    };
    out.push(heading(format!("Rubric: {}", rubric.rubric.name), theme));

    let applied = state.applied_rubric_items();
    let mut cursor_row = None;
    for (i, item) in rubric.rubric_items.iter().enumerate() {
        let selected = item.id.is_some_and(|id| state.rubric_selection.contains(id));
        let impact = ItemImpact::of(item.point_value);
        let color = match impact {
            ItemImpact::Addition => theme.points_addition,
            ItemImpact::Deduction => theme.points_deduction,
            ItemImpact::Neutral => theme.points_neutral,
        };
        let mut line = Line::from(vec![
            Span::raw(if selected { "[x] " } else { "[ ] " }),
            Span::styled(
                format!("{}{:<3} ", impact.symbol(), item.point_value.unwrap_or(0).abs()),
                Style::default().fg(color),
            ),
            Span::raw(item.explanation.clone()),
        ]);
        if item.id.is_some_and(|id| applied.contains(&id)) {
            line.push_span(Span::styled(" (on this line)", Style::default().fg(theme.line_number)));
        }
        if is_focused && i == state.rubric_cursor {
            line = line.style(Style::default().add_modifier(Modifier::REVERSED));
            cursor_row = Some(out.len());
        }
        out.push(line);
    }
    out.push(Line::styled(
        "Space select · a apply to cursor line",
        Style::default().fg(theme.line_number),
    ));
    out.push(Line::raw(""));
    cursor_row
}

fn line_feedback_lines(state: &AppState, theme: &Theme, out: &mut Vec<Line<'static>>) {
    let Some((path, line)) = state.cursor_location() else {
        return;
    };
    let entries = state.cursor_entries();
    out.push(heading(format!("{path}:{line}"), theme));
    if entries.is_empty() {
        out.push(Line::styled("No feedback on this line (c to add)", Style::default().fg(theme.line_number)));
        return;
    }

    for (n, entry) in entries.iter().enumerate() {
        let (label, color) = match entry.state {
            LineFeedbackState::Confirmed => ("submitted", theme.feedback_confirmed),
            LineFeedbackState::PendingEdit => ("edit pending", theme.feedback_pending),
            LineFeedbackState::PendingCreate => ("new, pending", theme.feedback_pending),
        };
        let fb = entry.feedback;
        let marker = if n == state.line_entry_cursor.min(entries.len() - 1) { "› " } else { "  " };
        let mut meta = format!("{:+} · {label}", fb.points);
        if let Some(ta) = &fb.ta_username {
            meta.push_str(&format!(" · @{ta}"));
        }
        out.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(meta, Style::default().fg(color)),
        ]));
        out.push(Line::from(vec![Span::raw("  "), Span::raw(fb.body.clone())]));
        history_lines(fb, theme, out);
    }
}

/// One word-diffed row per version change, oldest first.
fn history_lines(fb: &Feedback, theme: &Theme, out: &mut Vec<Line<'static>>) {
    let Some(history) = fb.history.as_deref().filter(|h| !h.is_empty()) else {
        return;
    };
    out.push(Line::styled("  history:", Style::default().fg(theme.line_number)));
    let versions: Vec<&Feedback> = history.iter().chain(std::iter::once(fb)).collect();
    for pair in versions.windows(2) {
        let (old, new) = (pair[0], pair[1]);
        let mut spans = vec![Span::raw("   ")];
        spans.extend(word_diff_spans(&old.body, &new.body, theme));
        if old.points != new.points {
            spans.push(Span::styled(
                format!("  ({:+} → {:+})", old.points, new.points),
                Style::default().fg(theme.history_context),
            ));
        }
        out.push(Line::from(spans));
    }
}

/// Word-level diff of two comment bodies merged into one row: removed words
/// struck through, added words bold.
fn word_diff_spans(old: &str, new: &str, theme: &Theme) -> Vec<Span<'static>> {
    let diff = TextDiff::from_words(old, new);
    diff.iter_all_changes()
        .map(|change| {
            let text = change.value().to_owned();
            match change.tag() {
                ChangeTag::Delete => Span::styled(
                    text,
                    Style::default().fg(theme.history_removed).add_modifier(Modifier::CROSSED_OUT),
                ),
                ChangeTag::Insert => Span::styled(
                    text,
                    Style::default().fg(theme.history_added).add_modifier(Modifier::BOLD),
                ),
                ChangeTag::Equal => Span::styled(text, Style::default().fg(theme.history_context)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_diff_marks_changed_words_only() {
        let theme = Theme::dark();
        let spans = word_diff_spans("off by one", "off by two", &theme);
        let removed: String = spans
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::CROSSED_OUT))
            .map(|s| s.content.as_ref())
            .collect();
        let added: String = spans
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::BOLD))
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(removed, "one");
        assert_eq!(added, "two");
    }

    #[test]
    fn history_renders_one_row_per_change() {
        let theme = Theme::dark();
        let v1 = Feedback::comment("a.rs", 1, "bad name", -1);
        let v2 = Feedback::comment("a.rs", 1, "poor name", -1);
        let current = Feedback {
            history: Some(vec![v1, v2]),
            ..Feedback::comment("a.rs", 1, "poor variable name", -2)
        };
        let mut out = Vec::new();
        history_lines(&current, &theme, &mut out);
        assert_eq!(out.len(), 3);
        assert!(out[2].to_string().contains("(-1 → -2)"));
    }
}
