//! Grading workspace state.
//!
//! `AppState` owns everything the UI shows: the selected work, its file tree,
//! the open file, confirmed and staged feedback, the rubric and the toast
//! queue. Nothing here renders or blocks. Work that must happen elsewhere is
//! queued as a [`Request`] and drained by the main loop with
//! [`AppState::take_requests`]; results come back through `apply_*`.
//!
//! Every background result carries the key it was fetched for. A result whose
//! key no longer matches the current selection is dropped.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use gitmarks_core::cache::QueryKey;
use gitmarks_core::db;
use gitmarks_core::diff_memo::DiffMemo;
use gitmarks_core::error::GraderError;
use gitmarks_core::feedback::{FeedbackStaging, LineFeedback};
use gitmarks_core::roles::{self, Capabilities, Capability, MemberAction};
use gitmarks_core::rubric::{self, RubricSelection};
use gitmarks_core::tree::{build_tree, FileTree, TreeRow};
use gitmarks_core::types::{ClassroomRole, ClassroomUser, ClassroomUserStatus, EntryType, Feedback, FullRubric, PaginatedStudentWork, User};
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::ListState;

use crate::ui::help;
use crate::worker::{
    ApiEvent, ApiRequest, DraftEvent, DraftRequest, HighlightRequest, HighlightResult, Request,
};

const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Composing or editing a feedback entry.
    Insert,
    HelpOverlay,
    /// Quit requested while feedback is still staged.
    ConfirmQuit,
    /// Classroom member list over the workspace.
    Roster,
}

/// Which panel receives navigation keys. Cycles FileTree → Code → Feedback.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    FileTree,
    Code,
    Feedback,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::FileTree => PanelFocus::Feedback,
            PanelFocus::Code => PanelFocus::FileTree,
            PanelFocus::Feedback => PanelFocus::Code,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::FileTree => PanelFocus::Code,
            PanelFocus::Code => PanelFocus::Feedback,
            PanelFocus::Feedback => PanelFocus::FileTree,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    expires_at: Instant,
}

/// What the composer writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerTarget {
    New { path: String, line: usize },
    Edit { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposerField {
    #[default]
    Body,
    Points,
}

/// Feedback being typed in Insert mode.
#[derive(Debug, Clone)]
pub struct Composer {
    pub target: ComposerTarget,
    pub body: String,
    pub points: String,
    pub field: ComposerField,
}

impl Composer {
    fn new(target: ComposerTarget) -> Self {
        Self {
            target,
            body: String::new(),
            points: String::new(),
            field: ComposerField::Body,
        }
    }

    pub fn push(&mut self, c: char) {
        match self.field {
            ComposerField::Body => self.body.push(c),
            ComposerField::Points => {
                if c.is_ascii_digit() || (c == '-' && self.points.is_empty()) {
                    self.points.push(c);
                }
            }
        }
    }

    pub fn backspace(&mut self) {
        match self.field {
            ComposerField::Body => self.body.pop(),
            ComposerField::Points => self.points.pop(),
        };
    }

    pub fn switch_field(&mut self) {
        self.field = match self.field {
            ComposerField::Body => ComposerField::Points,
            ComposerField::Points => ComposerField::Body,
        };
    }

    /// Entered points; blank means zero.
    fn points_value(&self) -> Result<i64, String> {
        let raw = self.points.trim();
        if raw.is_empty() || raw == "-" {
            return Ok(0);
        }
        raw.parse().map_err(|_| format!("'{raw}' is not a whole number of points"))
    }
}

/// The file shown in the code browser.
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub path: String,
    pub sha: String,
    /// `None` until the blob arrives.
    pub lines: Option<Vec<String>>,
    /// Replaces `lines` for display once the highlight thread answers.
    pub highlighted: Option<Vec<Line<'static>>>,
    pub language: Option<&'static str>,
    pub memo: DiffMemo,
}

impl OpenFile {
    pub fn line_count(&self) -> usize {
        self.lines.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Loading {
    pub work: bool,
    pub tree: bool,
    pub blob: bool,
    pub rubric: bool,
}

/// Members of the selected classroom, as listed by the roster overlay.
#[derive(Debug, Default)]
pub struct Roster {
    pub classroom: i64,
    /// Everyone except removed members, in server order.
    pub members: Vec<ClassroomUser>,
    pub cursor: usize,
    pub loading: bool,
    /// Last invite token issued from the overlay.
    pub token: Option<(ClassroomRole, String)>,
}

impl Roster {
    pub fn selected(&self) -> Option<&ClassroomUser> {
        self.members.get(self.cursor)
    }
}

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,

    pub classroom: Option<i64>,
    pub assignment: Option<i64>,
    pub work_id: Option<i64>,

    pub user: Option<User>,
    pub classroom_user: Option<ClassroomUser>,
    pub capabilities: Capabilities,

    pub work: Option<PaginatedStudentWork>,
    pub tree: Option<FileTree>,
    pub collapsed: BTreeSet<String>,
    pub tree_rows: Vec<TreeRow>,
    pub tree_state: ListState,

    pub open_file: Option<OpenFile>,
    /// 0-indexed cursor line in the open file.
    pub code_cursor: usize,
    /// First source line shown; kept in view of the cursor by the renderer.
    pub code_scroll: usize,
    /// Which entry on the cursor line `e` and `x` act on.
    pub line_entry_cursor: usize,

    pub staging: FeedbackStaging,
    draft_key: Option<String>,
    pub rubric: Option<FullRubric>,
    pub rubric_selection: RubricSelection,
    pub rubric_cursor: usize,

    pub composer: Option<Composer>,
    pub roster: Option<Roster>,
    pub toasts: Vec<Toast>,
    pub loading: Loading,

    pub tree_viewport_height: u16,
    pub code_viewport_height: u16,
    pub feedback_viewport_height: u16,
    pub left_pct: u16,
    pub center_pct: u16,
    pub right_pct: u16,
    pub help_scroll: u16,
    /// Outer rects of the three panels from the last frame, for mouse hits.
    pub panel_rects: [Rect; 3],

    syntax_theme: &'static str,
    outbox: Vec<Request>,
}

impl AppState {
    pub fn new(syntax_theme: &'static str) -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            classroom: None,
            assignment: None,
            work_id: None,
            user: None,
            classroom_user: None,
            capabilities: Capabilities::default(),
            work: None,
            tree: None,
            collapsed: BTreeSet::new(),
            tree_rows: Vec::new(),
            tree_state: ListState::default(),
            open_file: None,
            code_cursor: 0,
            code_scroll: 0,
            line_entry_cursor: 0,
            staging: FeedbackStaging::new(),
            draft_key: None,
            rubric: None,
            rubric_selection: RubricSelection::default(),
            rubric_cursor: 0,
            composer: None,
            roster: None,
            toasts: Vec::new(),
            loading: Loading::default(),
            tree_viewport_height: 0,
            code_viewport_height: 0,
            feedback_viewport_height: 0,
            left_pct: 20,
            center_pct: 55,
            right_pct: 25,
            help_scroll: 0,
            panel_rects: [Rect::default(); 3],
            syntax_theme,
            outbox: Vec::new(),
        }
    }

    /// Requests queued since the last call.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    fn request(&mut self, request: impl Into<Request>) {
        self.outbox.push(request.into());
    }

    pub fn toast(&mut self, kind: ToastKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            ToastKind::Success => tracing::info!(%message, "toast"),
            ToastKind::Error => tracing::warn!(%message, "toast"),
        }
        self.toasts.push(Toast {
            kind,
            message,
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    pub fn latest_toast(&self) -> Option<&Toast> {
        self.toasts.last()
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    /// The terminal regained focus; the session may have changed meanwhile.
    pub fn on_focus_gained(&mut self) {
        self.request(ApiRequest::CurrentUser { refresh: true });
    }

    /// The terminal changed size. Cached viewport heights are clamped until
    /// the next draw measures them, and the help overlay closes when the
    /// terminal becomes too narrow to draw it.
    pub fn on_resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "terminal resized");
        self.tree_viewport_height = self.tree_viewport_height.min(height);
        self.code_viewport_height = self.code_viewport_height.min(height);
        self.feedback_viewport_height = self.feedback_viewport_height.min(height);
        if self.mode == Mode::HelpOverlay && width < help::MIN_WIDTH {
            self.mode = Mode::Normal;
            self.help_scroll = 0;
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Initial selection from the command line or saved preferences.
    pub fn start(&mut self, classroom: Option<i64>, assignment: Option<i64>, work: Option<i64>) {
        self.request(ApiRequest::CurrentUser { refresh: false });
        self.classroom = classroom;
        self.assignment = assignment;

        let (Some(classroom), Some(assignment)) = (classroom, assignment) else {
            self.toast(ToastKind::Error, "Pass --classroom and --assignment to start grading");
            return;
        };
        self.request(DraftRequest::SetPreference {
            key: db::SELECTED_CLASSROOM,
            value: classroom.to_string(),
        });
        self.request(ApiRequest::ClassroomUser { classroom });
        self.loading.rubric = true;
        self.request(ApiRequest::AssignmentRubric { classroom, assignment });
        match work {
            Some(work) => self.select_work(work),
            None => self.request(ApiRequest::Works { classroom, assignment }),
        }
    }

    /// Switches to another student work. Confirmed feedback, the tree and the
    /// open file are dropped; the work's drafts are reloaded from the store.
    /// Cached responses for the work being left are invalidated so coming
    /// back to it refetches feedback, tree and file contents.
    pub fn select_work(&mut self, work: i64) {
        let (Some(classroom), Some(assignment)) = (self.classroom, self.assignment) else {
            self.toast(ToastKind::Error, GraderError::NoWorkSelected.to_string());
            return;
        };
        tracing::info!(classroom, assignment, work, "selecting work");
        if let Some(previous) = self.work_id.filter(|&prev| prev != work) {
            self.request(ApiRequest::InvalidateWork { work: previous });
        }

        self.work_id = Some(work);
        self.work = None;
        self.tree = None;
        self.tree_rows.clear();
        self.collapsed.clear();
        self.tree_state = ListState::default();
        self.open_file = None;
        self.code_cursor = 0;
        self.code_scroll = 0;
        self.line_entry_cursor = 0;
        self.staging.clear();
        self.rubric_selection.clear();
        self.composer = None;
        if self.mode == Mode::Insert {
            self.mode = Mode::Normal;
        }

        let key = db::draft_key(assignment, work);
        self.draft_key = Some(key.clone());
        self.loading.work = true;
        self.loading.tree = true;
        self.loading.blob = false;
        self.request(ApiRequest::Work { classroom, assignment, work });
        self.request(ApiRequest::Tree { classroom, assignment, work });
        self.request(DraftRequest::Load { key });
    }

    pub fn next_work(&mut self) {
        match self.work.as_ref().and_then(|w| w.next_student_work_id) {
            Some(next) => self.select_work(next),
            None => self.toast(ToastKind::Error, "This is the last student work"),
        }
    }

    pub fn prev_work(&mut self) {
        match self.work.as_ref().and_then(|w| w.previous_student_work_id) {
            Some(prev) => self.select_work(prev),
            None => self.toast(ToastKind::Error, "This is the first student work"),
        }
    }

    /// Refetches the current work and its tree. Staged feedback is kept.
    pub fn refresh(&mut self) {
        let (Some(classroom), Some(assignment), Some(work)) = (self.classroom, self.assignment, self.work_id)
        else {
            return;
        };
        self.request(ApiRequest::InvalidateWork { work });
        self.loading.work = true;
        self.loading.tree = true;
        self.request(ApiRequest::Work { classroom, assignment, work });
        self.request(ApiRequest::Tree { classroom, assignment, work });
    }

    fn work_key(&self) -> Option<QueryKey> {
        Some(QueryKey::Work {
            classroom: self.classroom?,
            assignment: self.assignment?,
            work: self.work_id?,
        })
    }

    fn tree_key(&self) -> Option<QueryKey> {
        Some(QueryKey::WorkTree {
            classroom: self.classroom?,
            assignment: self.assignment?,
            work: self.work_id?,
        })
    }

    fn blob_key(&self) -> Option<QueryKey> {
        Some(QueryKey::Blob {
            classroom: self.classroom?,
            assignment: self.assignment?,
            work: self.work_id?,
            sha: self.open_file.as_ref()?.sha.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Background results
    // -----------------------------------------------------------------------

    pub fn apply_api(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::CurrentUser(Ok(user)) => self.user = Some(user),
            ApiEvent::CurrentUser(Err(err)) => {
                self.toast(ToastKind::Error, format!("Could not load your account: {err}"));
            }
            ApiEvent::ClassroomUser { classroom, result } => {
                if self.classroom != Some(classroom) {
                    return;
                }
                match result {
                    Ok(member) => {
                        self.capabilities = roles::capabilities(member.classroom_role);
                        if !self.capabilities.contains(Capability::GradeWork) {
                            self.toast(ToastKind::Error, "Your role in this classroom cannot grade work");
                        }
                        self.classroom_user = Some(member);
                    }
                    Err(err) => self.toast(ToastKind::Error, format!("Could not load your classroom role: {err}")),
                }
            }
            ApiEvent::Works { classroom, assignment, result } => {
                if (self.classroom, self.assignment) != (Some(classroom), Some(assignment)) || self.work_id.is_some() {
                    return;
                }
                match result {
                    Ok(works) => match works.first() {
                        Some(first) => self.select_work(first.student_work_id),
                        None => self.toast(ToastKind::Error, "No student work for this assignment yet"),
                    },
                    Err(err) => self.toast(ToastKind::Error, format!("Could not list student work: {err}")),
                }
            }
            ApiEvent::Work { key, result } => {
                if self.work_key().as_ref() != Some(&key) {
                    tracing::debug!(?key, "discarding stale work");
                    return;
                }
                self.loading.work = false;
                match result {
                    Ok(with_feedback) => {
                        let score = with_feedback.student_work.work.manual_feedback_score;
                        if self.staging.set_confirmed(with_feedback.feedback, score) > 0 {
                            self.persist_drafts();
                        }
                        self.work = Some(with_feedback.student_work);
                    }
                    Err(err) => self.toast(ToastKind::Error, format!("Could not load student work: {err}")),
                }
            }
            ApiEvent::Tree { key, result } => {
                if self.tree_key().as_ref() != Some(&key) {
                    tracing::debug!(?key, "discarding stale tree");
                    return;
                }
                self.loading.tree = false;
                match result {
                    Ok(flat) => {
                        self.tree = Some(build_tree(&flat));
                        self.rebuild_rows();
                    }
                    Err(err) => self.toast(ToastKind::Error, format!("Could not load files: {err}")),
                }
            }
            ApiEvent::Blob { key, path, result } => {
                if self.blob_key().as_ref() != Some(&key)
                    || self.open_file.as_ref().is_some_and(|f| f.path != path)
                {
                    tracing::debug!(%path, "discarding stale blob");
                    return;
                }
                self.loading.blob = false;
                match result {
                    Ok(text) => self.install_blob(text),
                    Err(err) => self.toast(ToastKind::Error, format!("Could not load {path}: {err}")),
                }
            }
            ApiEvent::Rubric { key, result } => {
                let current = self.classroom.zip(self.assignment);
                if !matches!(key, QueryKey::AssignmentRubric { classroom, assignment } if Some((classroom, assignment)) == current)
                {
                    return;
                }
                self.loading.rubric = false;
                match result {
                    Ok(rubric) => {
                        self.rubric_cursor = 0;
                        self.rubric = Some(rubric);
                    }
                    Err(err) => {
                        tracing::info!(error = %err, "assignment has no rubric");
                        self.rubric = None;
                    }
                }
            }
            ApiEvent::Submitted { classroom, assignment, work, batch, result } => {
                let current = (self.classroom, self.assignment, self.work_id) == (Some(classroom), Some(assignment), Some(work));
                if current {
                    match self.staging.complete_submit(batch, result) {
                        Ok(()) => {
                            self.persist_drafts();
                            self.toast(ToastKind::Success, "Feedback submitted");
                        }
                        Err(err) => self.toast(ToastKind::Error, format!("Failed to submit feedback: {err}")),
                    }
                    return;
                }
                match result {
                    Ok(()) => {
                        let ids = batch.entries().keys().copied().collect();
                        self.request(DraftRequest::Forget { key: db::draft_key(assignment, work), ids });
                        self.toast(ToastKind::Success, "Feedback submitted");
                    }
                    Err(err) => self.toast(ToastKind::Error, format!("Failed to submit feedback: {err}")),
                }
            }
            ApiEvent::Roster { classroom, result } => {
                let Some(roster) = self.roster.as_mut().filter(|r| r.classroom == classroom) else {
                    return;
                };
                roster.loading = false;
                match result {
                    Ok(members) => {
                        roster.members = members
                            .into_iter()
                            .filter(|m| m.status != ClassroomUserStatus::Removed)
                            .collect();
                        roster.cursor = roster.cursor.min(roster.members.len().saturating_sub(1));
                    }
                    Err(err) => self.toast(ToastKind::Error, format!("Could not load classroom members: {err}")),
                }
            }
            ApiEvent::MemberChanged { classroom, member, action, result } => match result {
                Ok(()) => {
                    self.toast(ToastKind::Success, format!("{} {}", member_action_done(action), member.github_username));
                    if self.roster.as_ref().is_some_and(|r| r.classroom == classroom) {
                        self.request(ApiRequest::Roster { classroom });
                    }
                }
                Err(err) => self.toast(
                    ToastKind::Error,
                    format!("Could not {} {}: {err}", action.label(), member.github_username),
                ),
            },
            ApiEvent::Token { classroom, role, result } => match result {
                Ok(token) => {
                    if let Some(roster) = self.roster.as_mut().filter(|r| r.classroom == classroom) {
                        roster.token = Some((role, token.token));
                    }
                    self.toast(ToastKind::Success, format!("{} invite token issued", role_label(role)));
                }
                Err(err) => self.toast(ToastKind::Error, format!("Could not issue an invite token: {err}")),
            },
        }
    }

    pub fn apply_drafts(&mut self, event: DraftEvent) {
        match event {
            DraftEvent::Loaded { key, result } => {
                if self.draft_key.as_ref() != Some(&key) {
                    return;
                }
                match result {
                    Ok(restored) if !restored.is_empty() => {
                        let count = restored.len();
                        let staged_meanwhile = self.staging.has_staged();
                        if self.staging.restore_staged(restored) > 0 || staged_meanwhile {
                            self.persist_drafts();
                        }
                        self.toast(ToastKind::Success, format!("Restored {count} unsubmitted feedback item(s)"));
                    }
                    Ok(_) => {}
                    Err(err) => self.toast(ToastKind::Error, format!("Could not restore drafts: {err}")),
                }
            }
            DraftEvent::Failed(err) => self.toast(ToastKind::Error, format!("Could not save drafts: {err}")),
        }
    }

    pub fn apply_highlight(&mut self, result: HighlightResult) {
        let Some(file) = self.open_file.as_mut() else {
            return;
        };
        if self.work_id != Some(result.work) || file.sha != result.sha {
            return;
        }
        file.language = result.language;
        file.highlighted = Some(result.lines);
    }

    fn install_blob(&mut self, text: String) {
        let (Some(work), Some(file)) = (self.work_id, self.open_file.as_mut()) else {
            return;
        };
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let diff = self
            .tree
            .as_ref()
            .and_then(|t| t.find(&file.path))
            .and_then(|node| node.diff.as_deref());
        file.memo = DiffMemo::build(lines.len(), diff);
        file.lines = Some(lines);
        let request = HighlightRequest {
            work,
            sha: file.sha.clone(),
            path: file.path.clone(),
            text,
            syntax_theme: self.syntax_theme,
        };
        self.request(request);
    }

    // -----------------------------------------------------------------------
    // File tree
    // -----------------------------------------------------------------------

    fn rebuild_rows(&mut self) {
        let selected_path = self.selected_row().map(|r| r.path.clone());
        self.tree_rows = self
            .tree
            .as_ref()
            .map(|t| t.visible_rows(&self.collapsed))
            .unwrap_or_default();
        let index = selected_path
            .and_then(|p| self.tree_rows.iter().position(|r| r.path == p))
            .or(if self.tree_rows.is_empty() { None } else { Some(0) });
        self.tree_state.select(index);
    }

    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.tree_state.selected().and_then(|i| self.tree_rows.get(i))
    }

    /// Enter on a directory toggles it; on a file opens it.
    pub fn open_selected(&mut self) {
        let Some(row) = self.selected_row().cloned() else {
            return;
        };
        match row.kind {
            EntryType::Tree => {
                if !self.collapsed.remove(&row.path) {
                    self.collapsed.insert(row.path);
                }
                self.rebuild_rows();
            }
            EntryType::Blob => self.open_file(&row.path),
        }
    }

    /// Collapses the selected directory, or jumps to the parent directory.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row().cloned() else {
            return;
        };
        if row.kind == EntryType::Tree && row.expanded {
            self.collapsed.insert(row.path);
            self.rebuild_rows();
            return;
        }
        if let Some((parent, _)) = row.path.rsplit_once('/') {
            if let Some(i) = self.tree_rows.iter().position(|r| r.path == parent) {
                self.tree_state.select(Some(i));
            }
        }
    }

    /// Opens `path` in the code browser and fetches its blob.
    pub fn open_file(&mut self, path: &str) {
        let (Some(classroom), Some(assignment), Some(work)) = (self.classroom, self.assignment, self.work_id)
        else {
            return;
        };
        let Some(node) = self.tree.as_ref().and_then(|t| t.find(path)).filter(|n| n.is_blob()) else {
            return;
        };
        let sha = node.sha.clone();
        self.open_file = Some(OpenFile {
            path: path.to_owned(),
            sha: sha.clone(),
            lines: None,
            highlighted: None,
            language: None,
            memo: DiffMemo::default(),
        });
        self.code_cursor = 0;
        self.code_scroll = 0;
        self.line_entry_cursor = 0;
        self.loading.blob = true;
        self.focus = PanelFocus::Code;
        self.request(ApiRequest::Blob {
            classroom,
            assignment,
            work,
            path: path.to_owned(),
            sha,
        });
    }

    // -----------------------------------------------------------------------
    // Scrolling
    // -----------------------------------------------------------------------

    fn move_code_cursor(&mut self, delta: isize) {
        let max = self.open_file.as_ref().map_or(0, |f| f.line_count().saturating_sub(1));
        self.code_cursor = self.code_cursor.saturating_add_signed(delta).min(max);
        self.line_entry_cursor = 0;
    }

    fn move_rubric_cursor(&mut self, delta: isize) {
        let max = self.rubric.as_ref().map_or(0, |r| r.rubric_items.len().saturating_sub(1));
        self.rubric_cursor = self.rubric_cursor.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileTree => self.tree_state.scroll_down_by(lines),
            PanelFocus::Code => self.move_code_cursor(lines as isize),
            PanelFocus::Feedback => self.move_rubric_cursor(lines as isize),
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileTree => self.tree_state.scroll_up_by(lines),
            PanelFocus::Code => self.move_code_cursor(-(lines as isize)),
            PanelFocus::Feedback => self.move_rubric_cursor(-(lines as isize)),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::FileTree => self.tree_state.select_first(),
            PanelFocus::Code => self.move_code_cursor(isize::MIN),
            PanelFocus::Feedback => self.rubric_cursor = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::FileTree => self.tree_state.select_last(),
            PanelFocus::Code => self.move_code_cursor(isize::MAX),
            PanelFocus::Feedback => self.move_rubric_cursor(isize::MAX),
        }
    }

    fn viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::FileTree => self.tree_viewport_height,
            PanelFocus::Code => self.code_viewport_height,
            PanelFocus::Feedback => self.feedback_viewport_height,
        }
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.viewport_height() / 2).max(1));
    }

    pub fn full_page_down(&mut self) {
        self.scroll_down(self.viewport_height().max(1));
    }

    pub fn full_page_up(&mut self) {
        self.scroll_up(self.viewport_height().max(1));
    }

    /// Moves the cursor to the next line carrying feedback, wrapping around.
    pub fn next_feedback_line(&mut self) {
        let Some(path) = self.open_file.as_ref().map(|f| f.path.clone()) else {
            return;
        };
        let lines = self.staging.lines_with_feedback(&path);
        let current = self.code_cursor + 1;
        if let Some(&line) = lines.iter().find(|&&l| l > current).or(lines.first()) {
            self.code_cursor = line.saturating_sub(1);
            self.move_code_cursor(0);
        }
    }

    pub fn prev_feedback_line(&mut self) {
        let Some(path) = self.open_file.as_ref().map(|f| f.path.clone()) else {
            return;
        };
        let lines = self.staging.lines_with_feedback(&path);
        let current = self.code_cursor + 1;
        if let Some(&line) = lines.iter().rev().find(|&&l| l < current).or(lines.last()) {
            self.code_cursor = line.saturating_sub(1);
            self.move_code_cursor(0);
        }
    }

    /// Selects the next entry among those on the cursor line.
    pub fn cycle_line_entry(&mut self, forward: bool) {
        let count = self.cursor_entries().len();
        if count == 0 {
            return;
        }
        self.line_entry_cursor = if forward {
            (self.line_entry_cursor + 1) % count
        } else {
            (self.line_entry_cursor + count - 1) % count
        };
    }

    /// Gives 5% of the code panel to the side panels; the centre keeps at
    /// least 20%.
    pub fn shrink_code_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(transfer - left_gain);
    }

    /// Takes up to 5% from the side panels; the centre stays at most 80% and
    /// each side at least 5%.
    pub fn grow_code_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    /// `(path, 1-indexed line)` under the code cursor.
    pub fn cursor_location(&self) -> Option<(String, usize)> {
        let file = self.open_file.as_ref()?;
        if file.line_count() == 0 {
            return None;
        }
        Some((file.path.clone(), self.code_cursor + 1))
    }

    pub fn cursor_entries(&self) -> Vec<LineFeedback<'_>> {
        match self.cursor_location() {
            Some((path, line)) => self.staging.line_feedback(&path, line),
            None => Vec::new(),
        }
    }

    /// Rubric item ids already applied to the cursor line, staged or not.
    pub fn applied_rubric_items(&self) -> BTreeSet<i64> {
        let Some((path, line)) = self.cursor_location() else {
            return BTreeSet::new();
        };
        let entries = self.cursor_entries();
        rubric::applied_items(entries.iter().map(|e| e.feedback), &path, line)
    }

    fn selected_entry_id(&self) -> Option<u64> {
        let entries = self.cursor_entries();
        entries
            .get(self.line_entry_cursor.min(entries.len().saturating_sub(1)))
            .map(|e| e.id)
    }

    /// Grading needs a known role; until it arrives the server has the last
    /// word.
    fn may_grade(&mut self) -> bool {
        if self.classroom_user.is_some() && !self.capabilities.contains(Capability::GradeWork) {
            self.toast(ToastKind::Error, "Your role in this classroom cannot grade work");
            return false;
        }
        true
    }

    fn ta_username(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.login.clone())
    }

    pub fn begin_compose(&mut self) {
        let Some((path, line)) = self.cursor_location() else {
            self.toast(ToastKind::Error, "Open a file to leave feedback");
            return;
        };
        if !self.may_grade() {
            return;
        }
        self.composer = Some(Composer::new(ComposerTarget::New { path, line }));
        self.mode = Mode::Insert;
    }

    pub fn begin_edit(&mut self) {
        let Some(id) = self.selected_entry_id() else {
            self.toast(ToastKind::Error, "No feedback on this line");
            return;
        };
        if !self.may_grade() {
            return;
        }
        let current = self.staging.staged().get(&id).or_else(|| self.staging.confirmed().get(&id));
        let mut composer = Composer::new(ComposerTarget::Edit { id });
        if let Some(fb) = current {
            composer.body = fb.body.clone();
            composer.points = fb.points.to_string();
        }
        self.composer = Some(composer);
        self.mode = Mode::Insert;
    }

    pub fn cancel_compose(&mut self) {
        self.composer = None;
        self.mode = Mode::Normal;
    }

    /// Stages the composed entry. Invalid points keep the composer open.
    pub fn commit_compose(&mut self) {
        let Some(composer) = self.composer.as_ref() else {
            self.mode = Mode::Normal;
            return;
        };
        let points = match composer.points_value() {
            Ok(p) => p,
            Err(msg) => {
                self.toast(ToastKind::Error, msg);
                return;
            }
        };
        let body = composer.body.trim().to_owned();
        if body.is_empty() {
            self.toast(ToastKind::Error, "Feedback needs a comment");
            return;
        }
        let target = composer.target.clone();

        let outcome = match target {
            ComposerTarget::New { path, line } => {
                let fb = Feedback {
                    ta_username: self.ta_username(),
                    ..Feedback::comment(&path, line, &body, points)
                };
                self.staging.add_feedback([fb]);
                Ok(())
            }
            ComposerTarget::Edit { id } => {
                let base = self
                    .staging
                    .staged()
                    .get(&id)
                    .or_else(|| self.staging.confirmed().get(&id))
                    .cloned();
                match base {
                    Some(base) => {
                        let next = Feedback {
                            body,
                            points,
                            action: None,
                            history: None,
                            ..base
                        };
                        self.staging.edit_feedback(id, next)
                    }
                    None => Err(GraderError::UnknownFeedback(id)),
                }
            }
        };

        match outcome {
            Ok(()) => {
                self.persist_drafts();
                self.composer = None;
                self.mode = Mode::Normal;
            }
            Err(err) => {
                self.toast(ToastKind::Error, err.to_string());
                self.cancel_compose();
            }
        }
    }

    /// Discards the selected staged entry on the cursor line.
    pub fn discard_selected(&mut self) {
        let Some(id) = self.selected_entry_id() else {
            return;
        };
        match self.staging.remove_feedback(id) {
            Ok(_) => {
                self.line_entry_cursor = 0;
                self.persist_drafts();
                self.toast(ToastKind::Success, "Discarded staged feedback");
            }
            Err(err) => self.toast(ToastKind::Error, err.to_string()),
        }
    }

    pub fn toggle_rubric_item(&mut self) {
        let id = self
            .rubric
            .as_ref()
            .and_then(|r| r.rubric_items.get(self.rubric_cursor))
            .and_then(|item| item.id);
        if let Some(id) = id {
            self.rubric_selection.toggle(id);
        }
    }

    /// Stages one entry per ticked rubric item on the cursor line.
    pub fn apply_rubric(&mut self) {
        let Some(rubric) = self.rubric.as_ref() else {
            self.toast(ToastKind::Error, "This assignment has no rubric");
            return;
        };
        if self.rubric_selection.is_empty() {
            self.toast(ToastKind::Error, "Select rubric items with Space first");
            return;
        }
        let Some((path, line)) = self.cursor_location() else {
            self.toast(ToastKind::Error, "Open a file to apply rubric items");
            return;
        };
        let items = rubric::quick_apply(rubric, &self.rubric_selection, &path, line, self.ta_username().as_deref());
        if !self.may_grade() {
            return;
        }
        let count = self.staging.add_feedback(items).len();
        self.rubric_selection.clear();
        self.persist_drafts();
        self.toast(ToastKind::Success, format!("Applied {count} rubric item(s) to line {line}"));
    }

    /// Sends every staged entry as one batch. A submission already in flight
    /// does not block another.
    pub fn submit(&mut self) {
        if !self.staging.has_staged() {
            self.toast(ToastKind::Error, "Nothing staged to submit");
            return;
        }
        let (Some(classroom), Some(assignment), Some(work)) = (self.classroom, self.assignment, self.work_id)
        else {
            self.toast(ToastKind::Error, GraderError::NoWorkSelected.to_string());
            return;
        };
        if self.staging.is_submitting() {
            tracing::warn!(work, "submitting while a previous submission is in flight");
        }
        let batch = self.staging.begin_submit();
        tracing::info!(work, entries = batch.entries().len(), "submitting feedback");
        self.request(ApiRequest::Submit { classroom, assignment, work, batch });
    }

    fn persist_drafts(&mut self) {
        if let Some(key) = self.draft_key.clone() {
            let staged = self.staging.staged().clone();
            self.request(DraftRequest::Save { key, staged });
        }
    }

    /// True when the app may exit now; otherwise asks for confirmation.
    pub fn request_quit(&mut self) -> bool {
        if self.staging.has_staged() {
            self.mode = Mode::ConfirmQuit;
            return false;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Opens the member list of the selected classroom. Members are always
    /// refetched; the list is not cached.
    pub fn open_roster(&mut self) {
        let Some(classroom) = self.classroom else {
            self.toast(ToastKind::Error, "Select a classroom to see its members");
            return;
        };
        if !self.capabilities.contains(Capability::ViewStudents) {
            self.toast(ToastKind::Error, "Your role in this classroom cannot see its members");
            return;
        }
        let keep = self.roster.as_ref().is_some_and(|r| r.classroom == classroom);
        if !keep {
            self.roster = Some(Roster { classroom, ..Roster::default() });
        }
        if let Some(roster) = self.roster.as_mut() {
            roster.loading = true;
        }
        self.mode = Mode::Roster;
        self.request(ApiRequest::Roster { classroom });
    }

    pub fn close_roster(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn move_roster_cursor(&mut self, delta: isize) {
        if let Some(roster) = self.roster.as_mut() {
            let last = roster.members.len().saturating_sub(1);
            roster.cursor = roster.cursor.saturating_add_signed(delta).min(last);
        }
    }

    /// Actions the viewer may take on the selected member.
    pub fn roster_actions(&self) -> Vec<MemberAction> {
        let viewer = self.classroom_user.as_ref().map(|u| u.id);
        match self.roster.as_ref().and_then(Roster::selected) {
            Some(member) => roles::member_actions(self.capabilities, viewer, member),
            None => Vec::new(),
        }
    }

    /// Queues `action` on the selected member if it is one of
    /// [`AppState::roster_actions`].
    pub fn act_on_member(&mut self, action: MemberAction) {
        if !self.roster_actions().contains(&action) {
            self.toast(ToastKind::Error, format!("Cannot {} this member", action.label()));
            return;
        }
        let Some(roster) = self.roster.as_ref() else { return };
        let Some(member) = roster.selected().cloned() else { return };
        let classroom = roster.classroom;
        self.request(ApiRequest::Member { classroom, member, action });
    }

    /// Issues an invite token for `role` in the roster's classroom.
    pub fn issue_token(&mut self, role: ClassroomRole) {
        let Some(classroom) = self.roster.as_ref().map(|r| r.classroom) else { return };
        if !self.capabilities.contains(roles::invite_capability(role)) {
            self.toast(ToastKind::Error, format!("Your role cannot issue {} invite tokens", role_label(role)));
            return;
        }
        self.request(ApiRequest::IssueToken { classroom, role });
    }
}

fn role_label(role: ClassroomRole) -> &'static str {
    match role {
        ClassroomRole::Student => "Student",
        ClassroomRole::Ta => "TA",
        ClassroomRole::Professor => "Professor",
    }
}

fn member_action_done(action: MemberAction) -> &'static str {
    match action {
        MemberAction::Invite => "Invited",
        MemberAction::Deny => "Denied",
        MemberAction::Revoke => "Revoked invite of",
        MemberAction::Remove => "Removed",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gitmarks_core::error::ApiError;
    use gitmarks_core::feedback::LineFeedbackState;
    use gitmarks_core::types::{ChangeStatus, DiffRange, GitTreeNode, StudentWorkWithFeedback};

    pub(crate) fn work_json(id: i64) -> StudentWorkWithFeedback {
        serde_json::from_value(serde_json::json!({
            "student_work": {
                "student_work_id": id, "org_name": "cs3500", "repo_name": "hw1-ada",
                "classroom_id": 1, "assignment_outline_id": 2, "manual_feedback_score": 10,
                "row_num": 1, "total_student_works": 3, "next_student_work_id": id + 1,
                "contributors": [{"github_username": "ada", "full_name": "Ada Lovelace"}]
            },
            "feedback": [{"path": "src/main.rs", "line": 2, "body": "typo", "points": -1}]
        }))
        .unwrap()
    }

    fn work_key(work: i64) -> QueryKey {
        QueryKey::Work { classroom: 1, assignment: 2, work }
    }

    /// State with work 3 loaded, its tree built and `src/main.rs` open.
    pub(crate) fn loaded() -> AppState {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        state.take_requests();
        state.apply_api(ApiEvent::Work { key: work_key(3), result: Ok(work_json(3)) });
        let flat = vec![
            GitTreeNode::new(
                "src/main.rs",
                EntryType::Blob,
                ChangeStatus::Modified,
                Some(vec![DiffRange { start: 2, end: 2 }]),
            ),
            GitTreeNode::new("README.md", EntryType::Blob, ChangeStatus::Unmodified, None),
        ];
        state.apply_api(ApiEvent::Tree {
            key: QueryKey::WorkTree { classroom: 1, assignment: 2, work: 3 },
            result: Ok(flat),
        });
        state.open_file("src/main.rs");
        state.apply_api(ApiEvent::Blob {
            key: QueryKey::Blob { classroom: 1, assignment: 2, work: 3, sha: "sha-src/main.rs".into() },
            path: "src/main.rs".into(),
            result: Ok("fn main() {\n    let x = 1;\n}\n".into()),
        });
        state.take_requests();
        state
    }

    #[test]
    fn selecting_work_queues_work_tree_and_drafts() {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        let requests = state.take_requests();
        assert!(requests.iter().any(|r| matches!(r, Request::Api(ApiRequest::Work { work: 3, .. }))));
        assert!(requests.iter().any(|r| matches!(r, Request::Api(ApiRequest::Tree { work: 3, .. }))));
        assert!(requests
            .iter()
            .any(|r| matches!(r, Request::Drafts(DraftRequest::Load { key }) if key == "staged_feedback_2_3")));
        assert!(state.take_requests().is_empty());
    }

    #[test]
    fn stale_work_response_is_discarded() {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        state.select_work(4);
        state.apply_api(ApiEvent::Work { key: work_key(3), result: Ok(work_json(3)) });
        assert!(state.work.is_none());
        assert!(state.loading.work);
    }

    #[test]
    fn blob_arrival_builds_memo_and_requests_highlight() {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        state.apply_api(ApiEvent::Tree {
            key: QueryKey::WorkTree { classroom: 1, assignment: 2, work: 3 },
            result: Ok(vec![GitTreeNode::new(
                "a.py",
                EntryType::Blob,
                ChangeStatus::Added,
                Some(vec![DiffRange { start: 2, end: 2 }]),
            )]),
        });
        state.take_requests();
        state.open_selected();
        assert!(matches!(
            state.take_requests().as_slice(),
            [Request::Api(ApiRequest::Blob { path, .. })] if path == "a.py"
        ));

        state.apply_api(ApiEvent::Blob {
            key: QueryKey::Blob { classroom: 1, assignment: 2, work: 3, sha: "sha-a.py".into() },
            path: "a.py".into(),
            result: Ok("l1\nl2\nl3".into()),
        });
        let file = state.open_file.as_ref().unwrap();
        assert_eq!(file.memo.slots(), &[0, 1, -1]);
        assert!(matches!(state.take_requests().as_slice(), [Request::Highlight(_)]));
    }

    #[test]
    fn composing_stages_feedback_and_saves_drafts() {
        let mut state = loaded();
        state.code_cursor = 1;
        state.begin_compose();
        assert_eq!(state.mode, Mode::Insert);
        for c in "use a const".chars() {
            state.composer.as_mut().unwrap().push(c);
        }
        state.composer.as_mut().unwrap().switch_field();
        state.composer.as_mut().unwrap().push('-');
        state.composer.as_mut().unwrap().push('2');
        state.commit_compose();

        assert_eq!(state.mode, Mode::Normal);
        let staged: Vec<_> = state.staging.staged().values().collect();
        assert_eq!(staged.len(), 1);
        assert_eq!((staged[0].line, staged[0].points), (2, -2));
        assert_eq!(state.staging.projected_score(), 8);
        assert!(matches!(state.take_requests().as_slice(), [Request::Drafts(DraftRequest::Save { .. })]));
    }

    #[test]
    fn editing_confirmed_feedback_stages_an_edit() {
        let mut state = loaded();
        state.code_cursor = 1;
        state.begin_edit();
        let composer = state.composer.as_mut().unwrap();
        assert_eq!(composer.body, "typo");
        composer.body.push_str(" here");
        state.commit_compose();

        let entries = state.cursor_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].feedback.body, "typo here");
        assert_eq!(state.staging.confirmed()[&0].body, "typo");
    }

    #[test]
    fn submit_outcomes() {
        let mut state = loaded();
        state.code_cursor = 0;
        state.begin_compose();
        state.composer.as_mut().unwrap().body = "nice".into();
        state.commit_compose();
        state.take_requests();

        state.submit();
        let Some(Request::Api(ApiRequest::Submit { batch, .. })) = state.take_requests().pop() else {
            panic!("expected a submit request");
        };
        state.apply_api(ApiEvent::Submitted {
            classroom: 1,
            assignment: 2,
            work: 3,
            batch: batch.clone(),
            result: Err(ApiError::Status { status: 500, message: "boom".into() }),
        });
        assert!(state.staging.has_staged());
        assert_eq!(state.latest_toast().unwrap().kind, ToastKind::Error);

        state.apply_api(ApiEvent::Submitted { classroom: 1, assignment: 2, work: 3, batch, result: Ok(()) });
        assert!(!state.staging.has_staged());
        assert_eq!(state.staging.confirmed().len(), 2);
        assert_eq!(state.latest_toast().unwrap().message, "Feedback submitted");
    }

    #[test]
    fn submission_for_another_work_forgets_its_drafts() {
        let mut state = loaded();
        state.code_cursor = 0;
        state.begin_compose();
        state.composer.as_mut().unwrap().body = "nice".into();
        state.commit_compose();
        state.submit();
        let Some(Request::Api(ApiRequest::Submit { batch, .. })) = state.take_requests().pop() else {
            panic!("expected a submit request");
        };
        state.select_work(4);
        state.take_requests();

        state.apply_api(ApiEvent::Submitted { classroom: 1, assignment: 2, work: 3, batch, result: Ok(()) });
        assert!(matches!(
            state.take_requests().as_slice(),
            [Request::Drafts(DraftRequest::Forget { key, ids })] if key == "staged_feedback_2_3" && ids == &[1]
        ));
    }

    #[test]
    fn restored_drafts_keep_entries_staged_meanwhile() {
        let mut state = loaded();
        state.code_cursor = 0;
        state.begin_compose();
        state.composer.as_mut().unwrap().body = "typed early".into();
        state.commit_compose();

        let mut restored = gitmarks_core::types::FeedbackMap::new();
        restored.insert(5, Feedback::comment("src/main.rs", 3, "from disk", 0));
        state.apply_drafts(DraftEvent::Loaded { key: "staged_feedback_2_3".into(), result: Ok(restored) });
        assert_eq!(state.staging.staged().len(), 2);
    }

    fn tree_event(work: i64) -> ApiEvent {
        ApiEvent::Tree {
            key: QueryKey::WorkTree { classroom: 1, assignment: 2, work },
            result: Ok(vec![GitTreeNode::new(
                "src/main.rs",
                EntryType::Blob,
                ChangeStatus::Modified,
                Some(vec![DiffRange { start: 2, end: 2 }]),
            )]),
        }
    }

    fn blob_event(work: i64) -> ApiEvent {
        ApiEvent::Blob {
            key: QueryKey::Blob { classroom: 1, assignment: 2, work, sha: "sha-src/main.rs".into() },
            path: "src/main.rs".into(),
            result: Ok("fn main() {\n    let x = 1;\n}\n".into()),
        }
    }

    fn compose(state: &mut AppState, line_index: usize, body: &str) {
        state.code_cursor = line_index;
        state.begin_compose();
        state.composer.as_mut().unwrap().body = body.into();
        state.commit_compose();
    }

    #[test]
    fn work_arriving_after_feedback_was_staged_keeps_both() {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        state.apply_api(tree_event(3));
        state.open_file("src/main.rs");
        state.apply_api(blob_event(3));
        compose(&mut state, 0, "early");
        state.take_requests();

        state.apply_api(ApiEvent::Work { key: work_key(3), result: Ok(work_json(3)) });
        assert!(matches!(state.take_requests().as_slice(), [Request::Drafts(DraftRequest::Save { .. })]));

        state.code_cursor = 1;
        let line2 = state.cursor_entries();
        assert_eq!(line2.len(), 1);
        assert_eq!((line2[0].feedback.body.as_str(), line2[0].state), ("typo", LineFeedbackState::Confirmed));
        state.code_cursor = 0;
        let line1 = state.cursor_entries();
        assert_eq!((line1[0].feedback.body.as_str(), line1[0].state), ("early", LineFeedbackState::PendingCreate));

        state.submit();
        let Some(Request::Api(ApiRequest::Submit { batch, .. })) = state.take_requests().pop() else {
            panic!("expected a submit request");
        };
        state.apply_api(ApiEvent::Submitted { classroom: 1, assignment: 2, work: 3, batch, result: Ok(()) });
        let bodies: Vec<&str> = state.staging.confirmed().values().map(|fb| fb.body.as_str()).collect();
        assert_eq!(bodies, ["typo", "early"]);
    }

    #[test]
    fn drafts_restored_before_the_work_survive_its_arrival() {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        state.take_requests();

        let mut restored = gitmarks_core::types::FeedbackMap::new();
        restored.insert(0, Feedback::comment("src/main.rs", 3, "from disk", -1));
        state.apply_drafts(DraftEvent::Loaded { key: "staged_feedback_2_3".into(), result: Ok(restored) });
        state.apply_api(ApiEvent::Work { key: work_key(3), result: Ok(work_json(3)) });
        state.apply_api(blob_event(3));
        state.apply_api(tree_event(3));

        assert_eq!(state.staging.confirmed()[&0].body, "typo");
        let staged: Vec<&str> = state.staging.staged().values().map(|fb| fb.body.as_str()).collect();
        assert_eq!(staged, ["from disk"]);
        assert!(!state.staging.staged().contains_key(&0));
        assert_eq!(state.staging.projected_score(), 9);
        assert!(state.tree.is_some());
    }

    #[test]
    fn tree_and_blob_before_work_still_render_the_file() {
        let mut state = AppState::new("base16-ocean.dark");
        state.start(Some(1), Some(2), Some(3));
        state.apply_api(tree_event(3));
        state.open_file("src/main.rs");
        state.apply_api(blob_event(3));
        assert!(state.work.is_none());
        assert_eq!(state.open_file.as_ref().unwrap().line_count(), 3);

        state.apply_api(ApiEvent::Work { key: work_key(3), result: Ok(work_json(3)) });
        assert!(state.work.is_some());
        assert!(state.staging.lines_with_feedback("src/main.rs").contains(&2));
    }

    #[test]
    fn leaving_a_work_invalidates_its_cached_responses() {
        let mut state = loaded();
        state.select_work(4);
        let requests = state.take_requests();
        assert!(matches!(requests.first(), Some(Request::Api(ApiRequest::InvalidateWork { work: 3 }))));
        assert!(requests.iter().any(|r| matches!(r, Request::Api(ApiRequest::Work { work: 4, .. }))));

        // Reselecting the same work does not throw its cache away.
        state.select_work(4);
        assert!(!state
            .take_requests()
            .iter()
            .any(|r| matches!(r, Request::Api(ApiRequest::InvalidateWork { .. }))));
    }

    #[test]
    fn narrowing_the_terminal_closes_help() {
        let mut state = loaded();
        state.code_viewport_height = 40;
        state.mode = Mode::HelpOverlay;
        state.on_resize(100, 20);
        assert_eq!(state.mode, Mode::HelpOverlay);
        assert_eq!(state.code_viewport_height, 20);

        state.on_resize(50, 20);
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn invalid_points_keep_the_composer_open() {
        let mut state = loaded();
        state.begin_compose();
        let composer = state.composer.as_mut().unwrap();
        composer.body = "x".into();
        composer.points = "-".into();
        composer.points.push_str("1.5");
        state.commit_compose();
        assert_eq!(state.mode, Mode::Insert);
        assert!(!state.staging.has_staged());
    }

    #[test]
    fn quick_apply_uses_cursor_line() {
        let mut state = loaded();
        state.rubric = Some(FullRubric {
            rubric_items: vec![gitmarks_core::types::RubricItem {
                id: Some(7),
                point_value: Some(-3),
                explanation: "Missing tests".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        state.code_cursor = 2;
        state.toggle_rubric_item();
        state.apply_rubric();
        let staged: Vec<_> = state.staging.staged().values().collect();
        assert_eq!(staged.len(), 1);
        assert_eq!((staged[0].line, staged[0].points, staged[0].rubric_item_id), (3, -3, Some(7)));
        assert!(state.rubric_selection.is_empty());
    }

    #[test]
    fn applied_rubric_items_follow_the_cursor_line() {
        let mut state = loaded();
        state.rubric = Some(serde_json::from_value(serde_json::json!({
            "rubric": {"id": 1, "name": "Style", "org_id": 1, "classroom_id": 1},
            "rubric_items": [
                {"id": 10, "point_value": -2, "explanation": "naming"},
                {"id": 11, "point_value": 1, "explanation": "tests"}
            ]
        }))
        .unwrap());
        state.code_cursor = 0;
        state.rubric_selection.toggle(11);
        state.apply_rubric();
        assert_eq!(state.applied_rubric_items(), BTreeSet::from([11]));

        state.code_cursor = 1;
        assert!(state.applied_rubric_items().is_empty());
    }

    #[test]
    fn quit_with_staged_feedback_asks_first() {
        let mut state = loaded();
        assert!(state.request_quit());
        state.begin_compose();
        state.composer.as_mut().unwrap().body = "x".into();
        state.commit_compose();
        assert!(!state.request_quit());
        assert_eq!(state.mode, Mode::ConfirmQuit);
    }

    #[test]
    fn toasts_expire_on_tick() {
        let mut state = AppState::new("base16-ocean.dark");
        state.toast(ToastKind::Success, "hi");
        state.on_tick(Instant::now());
        assert_eq!(state.toasts.len(), 1);
        state.on_tick(Instant::now() + TOAST_TTL + Duration::from_millis(1));
        assert!(state.toasts.is_empty());
    }

    #[test]
    fn feedback_line_navigation_wraps() {
        let mut state = loaded();
        state.code_cursor = 2;
        state.next_feedback_line();
        assert_eq!(state.code_cursor, 1);
    }

    fn member(id: i64, role: &str, status: &str) -> ClassroomUser {
        serde_json::from_value(serde_json::json!({
            "id": id, "github_username": format!("user{id}"), "classroom_id": 1,
            "classroom_role": role, "status": status
        }))
        .unwrap()
    }

    fn as_role(state: &mut AppState, role: &str) {
        state.apply_api(ApiEvent::ClassroomUser { classroom: 1, result: Ok(member(1, role, "ACTIVE")) });
    }

    #[test]
    fn roster_lists_members_and_hides_removed_ones() {
        let mut state = loaded();
        as_role(&mut state, "PROFESSOR");
        state.open_roster();
        assert_eq!(state.mode, Mode::Roster);
        assert!(matches!(state.take_requests().as_slice(), [Request::Api(ApiRequest::Roster { classroom: 1 })]));
        assert!(state.roster.as_ref().unwrap().loading);

        let members = vec![
            member(1, "PROFESSOR", "ACTIVE"),
            member(2, "STUDENT", "REQUESTED"),
            member(3, "STUDENT", "REMOVED"),
        ];
        state.apply_api(ApiEvent::Roster { classroom: 1, result: Ok(members) });
        let roster = state.roster.as_ref().unwrap();
        assert!(!roster.loading);
        assert_eq!(roster.members.iter().map(|m| m.id).collect::<Vec<_>>(), [1, 2]);

        // The viewer's own row offers nothing.
        assert!(state.roster_actions().is_empty());
        state.move_roster_cursor(5);
        assert_eq!(state.roster.as_ref().unwrap().cursor, 1);
        assert_eq!(state.roster_actions(), [MemberAction::Invite, MemberAction::Deny]);
    }

    #[test]
    fn students_cannot_open_the_roster() {
        let mut state = loaded();
        as_role(&mut state, "STUDENT");
        state.toasts.clear();
        state.open_roster();
        assert_eq!(state.mode, Mode::Normal);
        assert!(state.take_requests().is_empty());
        assert_eq!(state.latest_toast().unwrap().kind, ToastKind::Error);
    }

    #[test]
    fn member_change_refetches_the_roster() {
        let mut state = loaded();
        as_role(&mut state, "PROFESSOR");
        state.open_roster();
        state.apply_api(ApiEvent::Roster { classroom: 1, result: Ok(vec![member(2, "STUDENT", "ACTIVE")]) });
        state.take_requests();

        state.act_on_member(MemberAction::Deny);
        assert!(state.take_requests().is_empty(), "active members cannot be denied");

        state.act_on_member(MemberAction::Remove);
        let requests = state.take_requests();
        let [Request::Api(ApiRequest::Member { classroom: 1, member, action: MemberAction::Remove })] = requests.as_slice() else {
            panic!("expected a removal, got {requests:?}");
        };
        state.apply_api(ApiEvent::MemberChanged {
            classroom: 1,
            member: member.clone(),
            action: MemberAction::Remove,
            result: Ok(()),
        });
        assert_eq!(state.latest_toast().unwrap().message, "Removed user2");
        assert!(matches!(state.take_requests().as_slice(), [Request::Api(ApiRequest::Roster { classroom: 1 })]));
    }

    #[test]
    fn tas_issue_student_tokens_only() {
        let mut state = loaded();
        as_role(&mut state, "TA");
        state.open_roster();
        state.take_requests();

        state.issue_token(ClassroomRole::Ta);
        assert!(state.take_requests().is_empty());
        state.issue_token(ClassroomRole::Student);
        assert!(matches!(
            state.take_requests().as_slice(),
            [Request::Api(ApiRequest::IssueToken { classroom: 1, role: ClassroomRole::Student })]
        ));

        let token = serde_json::from_value(serde_json::json!({"token": "abc123"})).unwrap();
        state.apply_api(ApiEvent::Token { classroom: 1, role: ClassroomRole::Student, result: Ok(token) });
        assert_eq!(state.roster.as_ref().unwrap().token, Some((ClassroomRole::Student, "abc123".to_owned())));
    }

    #[test]
    fn roster_for_another_classroom_is_ignored() {
        let mut state = loaded();
        as_role(&mut state, "PROFESSOR");
        state.open_roster();
        state.apply_api(ApiEvent::Roster { classroom: 9, result: Ok(vec![member(2, "STUDENT", "ACTIVE")]) });
        assert!(state.roster.as_ref().unwrap().members.is_empty());
    }

    #[test]
    fn panel_resize_respects_bounds() {
        let mut state = AppState::new("base16-ocean.dark");
        for _ in 0..20 {
            state.grow_code_panel();
        }
        assert_eq!(state.center_pct, 80);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);
        for _ in 0..20 {
            state.shrink_code_panel();
        }
        assert_eq!(state.center_pct, 20);
    }
}
