//! Roster overlay: classroom members with their role and membership status.
//! The footer lists the keys that apply to the selected row and the last
//! invite token issued.

use ratatui::{
    layout::{Constraint, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use gitmarks_core::roles::MemberAction;
use gitmarks_core::types::{ClassroomUser, ClassroomUserStatus};

use crate::app::AppState;
use crate::theme::Theme;
use crate::ui::help::MIN_WIDTH;

pub fn render_roster_overlay(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let Some(roster) = &state.roster else { return };
    if frame.area().width < MIN_WIDTH {
        return;
    }

    let area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, area);

    let block = Block::bordered()
        .title(format!(" Members ({}) · R or Esc to close ", roster.members.len()))
        .border_style(Style::default().fg(theme.border_active));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [list_area, footer] = inner.layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(2)]));

    let items: Vec<ListItem> = if roster.members.is_empty() {
        let msg = if roster.loading { "Loading..." } else { "No members" };
        vec![ListItem::new(Line::raw(msg))]
    } else {
        roster.members.iter().map(|m| member_item(m, theme)).collect()
    };
    let mut list_state = ListState::default().with_selected(Some(roster.cursor));
    frame.render_stateful_widget(
        List::new(items)
            .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED)),
        list_area,
        &mut list_state,
    );

    let mut lines = vec![Line::styled(action_hints(&state.roster_actions()), Style::default().fg(theme.line_number))];
    if let Some((role, token)) = &roster.token {
        lines.push(Line::from(vec![
            Span::raw(format!("{} invite token: ", role.as_str())),
            Span::styled(token.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), footer);
}

fn member_item(member: &ClassroomUser, theme: &Theme) -> ListItem<'static> {
    let name = match (&member.first_name, &member.last_name) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(only), None) | (None, Some(only)) => only.clone(),
        (None, None) => String::new(),
    };
    let status_fg = match member.status {
        ClassroomUserStatus::Active => theme.toast_success,
        ClassroomUserStatus::Requested => theme.feedback_pending,
        ClassroomUserStatus::OrgInvited | ClassroomUserStatus::NotInOrg => theme.file_modified,
        ClassroomUserStatus::Removed => theme.border_inactive,
    };
    ListItem::new(Line::from(vec![
        Span::styled(format!("{:<10}", status_label(member.status)), Style::default().fg(status_fg)),
        Span::raw(format!("{:<10}", member.classroom_role.as_str())),
        Span::styled(format!("@{:<20} ", member.github_username), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(name),
    ]))
}

fn status_label(status: ClassroomUserStatus) -> &'static str {
    match status {
        ClassroomUserStatus::Requested => "requested",
        ClassroomUserStatus::OrgInvited => "invited",
        ClassroomUserStatus::Active => "active",
        ClassroomUserStatus::Removed => "removed",
        ClassroomUserStatus::NotInOrg => "no org",
    }
}

/// Key hints for the selected row, then the token keys.
fn action_hints(actions: &[MemberAction]) -> String {
    let mut hints: Vec<String> = actions
        .iter()
        .map(|action| {
            let key = match action {
                MemberAction::Invite => 'a',
                MemberAction::Deny => 'd',
                MemberAction::Revoke => 'v',
                MemberAction::Remove => 'x',
            };
            format!("{key} {}", action.label())
        })
        .collect();
    hints.push("t/T student/TA token".to_owned());
    hints.push("r reload".to_owned());
    hints.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_name_each_offered_action() {
        assert_eq!(
            action_hints(&[MemberAction::Invite, MemberAction::Deny]),
            "a invite · d deny · t/T student/TA token · r reload"
        );
        assert_eq!(action_hints(&[]), "t/T student/TA token · r reload");
    }
}
