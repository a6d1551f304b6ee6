//! File tree panel.
//!
//! One row per visible node from `FileTree::visible_rows`: indentation by
//! depth, a disclosure marker on directories, and the change badge colored by
//! status. Directories show their aggregated status.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use gitmarks_core::tree::TreeRow;
use gitmarks_core::types::{ChangeStatus, EntryType};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

pub fn render_file_tree(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::FileTree;
    let title = match &state.tree {
        Some(tree) => format!("Files ({})", tree.blob_paths().len()),
        None => "Files".to_owned(),
    };
    let block = panel_block(title, is_focused, theme);

    let open_path = state.open_file.as_ref().map(|f| f.path.as_str());
    let items: Vec<ListItem> = if state.tree_rows.is_empty() {
        let msg = if state.loading.tree { "Loading..." } else { "No files" };
        vec![ListItem::new(Line::raw(msg))]
    } else {
        state
            .tree_rows
            .iter()
            .map(|row| tree_row_item(row, open_path == Some(row.path.as_str()), theme))
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(list, area, &mut state.tree_state);
}

fn status_color(status: ChangeStatus, theme: &Theme) -> ratatui::style::Color {
    match status {
        ChangeStatus::Added => theme.file_added,
        ChangeStatus::Removed => theme.file_removed,
        ChangeStatus::Modified => theme.file_modified,
        ChangeStatus::Renamed => theme.file_renamed,
        ChangeStatus::Unmodified => theme.border_inactive,
    }
}

/// `  ▾ src/        M` style row.
fn tree_row_item(row: &TreeRow, is_open: bool, theme: &Theme) -> ListItem<'static> {
    let indent = Span::raw("  ".repeat(row.depth));
    let marker = match (row.kind, row.expanded) {
        (EntryType::Tree, true) => "▾ ",
        (EntryType::Tree, false) => "▸ ",
        (EntryType::Blob, _) => "  ",
    };
    let name = match row.kind {
        EntryType::Tree => format!("{}/", row.name),
        EntryType::Blob => row.name.clone(),
    };
    let name_style = if is_open {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let badge = Span::styled(
        format!(" {}", row.status.badge()),
        Style::default().fg(status_color(row.status, theme)),
    );
    ListItem::new(Line::from(vec![
        indent,
        Span::raw(marker),
        Span::styled(name, name_style),
        badge,
    ]))
}
