//! Help overlay: a centred modal drawn over the panels. `Clear` erases the
//! background first, inside the same draw call.

use ratatui::{
    layout::Constraint,
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::Theme;

/// Narrowest terminal the overlay is drawn in.
pub const MIN_WIDTH: u16 = 60;

/// Skipped below [`MIN_WIDTH`] columns, where the modal would collapse to
/// nothing.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < MIN_WIDTH {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help · j/k scroll, ? or Esc to dismiss ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Down / up (tree row, code line, rubric item)"),
        Line::from("  g / G         Top / bottom"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  Ctrl-f / b    Full page down / up"),
        Line::from("  H / L / Tab   Move panel focus"),
        Line::from("  < / >         Shrink / grow the code panel"),
        Line::from(""),
        Line::from("Files"),
        Line::from("  Enter / l     Open file or toggle directory"),
        Line::from("  h             Collapse directory / go to parent"),
        Line::from(""),
        Line::from("Code"),
        Line::from("  { / }         Previous / next line with feedback"),
        Line::from("  [ / ]         Select previous / next feedback on the line"),
        Line::from("  c             Comment on the cursor line"),
        Line::from("  e             Edit the selected feedback"),
        Line::from("  x             Discard the selected staged feedback"),
        Line::from(""),
        Line::from("Rubric"),
        Line::from("  Space         Select / deselect the rubric item"),
        Line::from("  a             Apply selected items to the cursor line"),
        Line::from(""),
        Line::from("Grading"),
        Line::from("  S             Submit all staged feedback"),
        Line::from("  n / p         Next / previous student work"),
        Line::from("  r             Refresh the current work"),
        Line::from(""),
        Line::from("Members (R)"),
        Line::from("  R             Open / close the classroom member list"),
        Line::from("  a / d         Invite / deny a join request"),
        Line::from("  v             Revoke a pending organization invite"),
        Line::from("  x             Remove an active member"),
        Line::from("  t / T         Issue a student / TA invite token"),
        Line::from(""),
        Line::from("Composer (Insert mode)"),
        Line::from("  Tab           Switch between comment and points"),
        Line::from("  Enter         Stage the feedback"),
        Line::from("  Esc           Cancel"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help"),
        Line::from("  q / Esc       Quit (confirms while feedback is staged)"),
    ])
}
