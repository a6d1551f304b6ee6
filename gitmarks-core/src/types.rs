//! Wire entities exchanged with the GitMarks API.
//!
//! Every type here mirrors a JSON object the server sends or accepts. Field
//! names follow the server's snake_case keys so `serde` needs no renames except
//! where a Rust keyword collides (`type`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Change status of a repository path relative to the assignment's base version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    #[default]
    Unmodified,
    Modified,
    Added,
    Removed,
    Renamed,
}

impl ChangeStatus {
    /// Single-letter badge used by the file tree panel.
    pub fn badge(self) -> char {
        match self {
            ChangeStatus::Unmodified => ' ',
            ChangeStatus::Modified => 'M',
            ChangeStatus::Added => 'A',
            ChangeStatus::Removed => 'D',
            ChangeStatus::Renamed => 'R',
        }
    }
}

/// Git object kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// A directory.
    Tree,
    /// A file.
    Blob,
}

/// A 1-indexed, inclusive range of changed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRange {
    pub start: usize,
    pub end: usize,
}

/// Status half of a flat tree record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub status: ChangeStatus,
    #[serde(default)]
    pub diff: Option<Vec<DiffRange>>,
}

/// Git entry half of a flat tree record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// One flat record per repository path, as returned by the file-tree endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitTreeNode {
    pub status: FileStatus,
    pub entry: TreeEntry,
}

impl GitTreeNode {
    /// Convenience constructor used by tests and fixtures.
    pub fn new(
        path: &str,
        kind: EntryType,
        status: ChangeStatus,
        diff: Option<Vec<DiffRange>>,
    ) -> Self {
        Self {
            status: FileStatus { status, diff },
            entry: TreeEntry {
                kind,
                path: path.to_owned(),
                sha: format!("sha-{path}"),
                status: None,
            },
        }
    }
}

/// What a staged feedback entry asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedbackAction {
    Create,
    Edit,
    Delete,
}

/// A line comment with an optional point adjustment.
///
/// `history` holds prior versions of the same comment, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FeedbackAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_comment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_comment_id: Option<i64>,
    pub path: String,
    pub line: usize,
    pub body: String,
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ta_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Feedback>>,
}

impl Feedback {
    /// Free-form comment on `path:line`.
    pub fn comment(path: &str, line: usize, body: &str, points: i64) -> Self {
        Self {
            path: path.to_owned(),
            line,
            body: body.to_owned(),
            points,
            ..Self::default()
        }
    }

    /// True when this entry attaches to `path:line`.
    pub fn is_at(&self, path: &str, line: usize) -> bool {
        self.path == path && self.line == line
    }
}

/// Feedback keyed by the process-local feedback id.
pub type FeedbackMap = BTreeMap<u64, Feedback>;

/// The signed-in GitHub user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A GitHub organization with the app installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Response of `GET /orgs/installations`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstallationsResponse {
    #[serde(default)]
    pub orgs_with_app: Vec<Organization>,
    #[serde(default)]
    pub orgs_without_app: Vec<Organization>,
}

/// A classroom (one course section in one semester).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub org_id: i64,
    pub org_name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Membership role inside a classroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassroomRole {
    Student,
    #[serde(rename = "TA")]
    Ta,
    Professor,
}

impl ClassroomRole {
    /// Path segment form used by invite endpoints.
    pub fn as_str(self) -> &'static str {
        match self {
            ClassroomRole::Student => "STUDENT",
            ClassroomRole::Ta => "TA",
            ClassroomRole::Professor => "PROFESSOR",
        }
    }
}

/// Lifecycle state of a classroom membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassroomUserStatus {
    Requested,
    /// Invited to the GitHub organization, not yet accepted.
    #[serde(rename = "ORG_INVITED")]
    OrgInvited,
    Active,
    Removed,
    #[serde(rename = "NOT_IN_ORG")]
    NotInOrg,
}

/// A user as seen from inside one classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub github_username: String,
    pub classroom_id: i64,
    pub classroom_role: ClassroomRole,
    pub status: ClassroomUserStatus,
}

/// Invite token for joining a classroom with a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomToken {
    pub token: String,
    #[serde(default)]
    pub classroom_id: Option<i64>,
    #[serde(default)]
    pub classroom_role: Option<ClassroomRole>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Response of redeeming a classroom invite token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomJoinResponse {
    pub message: String,
    pub classroom: Classroom,
    pub classroom_user: ClassroomUser,
}

/// Rubric header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rubric {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub org_id: i64,
    pub classroom_id: i64,
    #[serde(default)]
    pub reusable: bool,
}

/// One gradeable item of a rubric.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RubricItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub rubric_id: Option<i64>,
    #[serde(default)]
    pub point_value: Option<i64>,
    pub explanation: String,
}

/// A rubric together with its items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FullRubric {
    pub rubric: Rubric,
    pub rubric_items: Vec<RubricItem>,
}

/// Assignment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutline {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub classroom_id: i64,
    #[serde(default)]
    pub rubric_id: Option<i64>,
    #[serde(default)]
    pub group_assignment: bool,
    #[serde(default)]
    pub main_due_date: Option<String>,
    #[serde(default)]
    pub default_score: i64,
}

/// Student credited on a piece of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkContributor {
    pub github_username: String,
    pub full_name: String,
}

/// A student's repository for one assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentWork {
    pub student_work_id: i64,
    pub org_name: String,
    pub repo_name: String,
    pub classroom_id: i64,
    #[serde(default)]
    pub assignment_name: Option<String>,
    pub assignment_outline_id: i64,
    #[serde(default)]
    pub manual_feedback_score: Option<i64>,
    #[serde(default)]
    pub auto_grader_score: Option<i64>,
    #[serde(default)]
    pub work_state: Option<String>,
    #[serde(default)]
    pub contributors: Vec<WorkContributor>,
}

/// A student work positioned in the grading queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedStudentWork {
    #[serde(flatten)]
    pub work: StudentWork,
    pub row_num: i64,
    pub total_student_works: i64,
    #[serde(default)]
    pub previous_student_work_id: Option<i64>,
    #[serde(default)]
    pub next_student_work_id: Option<i64>,
}

impl PaginatedStudentWork {
    /// Contributor names joined for headings.
    pub fn contributor_names(&self) -> String {
        self.work
            .contributors
            .iter()
            .map(|c| c.full_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Work plus the confirmed feedback on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentWorkWithFeedback {
    pub student_work: PaginatedStudentWork,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
}

/// One comment inside a grade submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeComment {
    pub action: FeedbackAction,
    pub path: String,
    pub line: usize,
    pub body: String,
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_comment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_comment_id: Option<i64>,
}

/// Body of the batch grade submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub body: String,
    pub comments: Vec<GradeComment>,
}

impl GradeRequest {
    /// Builds the request from staged entries. Entries without an action are
    /// treated as creations.
    pub fn from_staged<'a>(staged: impl IntoIterator<Item = &'a Feedback>) -> Self {
        let comments = staged
            .into_iter()
            .map(|fb| GradeComment {
                action: fb.action.unwrap_or(FeedbackAction::Create),
                path: fb.path.clone(),
                line: fb.line,
                body: fb.body.clone(),
                points: fb.points,
                rubric_item_id: fb.rubric_item_id,
                feedback_comment_id: fb.feedback_comment_id,
                github_comment_id: fb.github_comment_id,
            })
            .collect();
        Self { body: String::new(), comments }
    }
}
