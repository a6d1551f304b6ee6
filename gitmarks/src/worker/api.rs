//! Network requests as abortable tokio tasks.
//!
//! Grading reads go through a [`QueryCache`] so repeated navigation does not
//! refetch; the roster is always fetched fresh. Reads are keyed by a
//! [`Slot`]: a newer request for the same slot (another work, another file)
//! aborts the one in flight. Submissions and membership changes are not
//! slotted and never aborted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gitmarks_core::api::{classrooms, grading, users, ApiClient};
use gitmarks_core::cache::{QueryCache, QueryKey, Staleness};
use gitmarks_core::error::ApiResult;
use gitmarks_core::feedback::SubmitBatch;
use gitmarks_core::roles::MemberAction;
use gitmarks_core::types::{
    ClassroomRole, ClassroomToken, ClassroomUser, FeedbackAction, FullRubric, GitTreeNode, StudentWork, StudentWorkWithFeedback, User,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{AbortHandle, JoinHandle};

use crate::event::AppEvent;

#[derive(Debug)]
pub enum ApiRequest {
    CurrentUser { refresh: bool },
    ClassroomUser { classroom: i64 },
    Works { classroom: i64, assignment: i64 },
    Work { classroom: i64, assignment: i64, work: i64 },
    Tree { classroom: i64, assignment: i64, work: i64 },
    Blob { classroom: i64, assignment: i64, work: i64, path: String, sha: String },
    AssignmentRubric { classroom: i64, assignment: i64 },
    Submit { classroom: i64, assignment: i64, work: i64, batch: SubmitBatch },
    /// Drops every cached entry belonging to `work`.
    InvalidateWork { work: i64 },
    /// Everyone in the classroom, always fetched fresh.
    Roster { classroom: i64 },
    Member { classroom: i64, member: ClassroomUser, action: MemberAction },
    IssueToken { classroom: i64, role: ClassroomRole },
}

#[derive(Debug)]
pub enum ApiEvent {
    CurrentUser(ApiResult<User>),
    ClassroomUser { classroom: i64, result: ApiResult<ClassroomUser> },
    Works { classroom: i64, assignment: i64, result: ApiResult<Vec<StudentWork>> },
    Work { key: QueryKey, result: ApiResult<StudentWorkWithFeedback> },
    Tree { key: QueryKey, result: ApiResult<Vec<GitTreeNode>> },
    Blob { key: QueryKey, path: String, result: ApiResult<String> },
    Rubric { key: QueryKey, result: ApiResult<FullRubric> },
    Submitted { classroom: i64, assignment: i64, work: i64, batch: SubmitBatch, result: ApiResult<()> },
    Roster { classroom: i64, result: ApiResult<Vec<ClassroomUser>> },
    MemberChanged { classroom: i64, member: ClassroomUser, action: MemberAction, result: ApiResult<()> },
    Token { classroom: i64, role: ClassroomRole, result: ApiResult<ClassroomToken> },
}

/// Request slots; at most one task per slot is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    User,
    ClassroomUser,
    Works,
    Work,
    Tree,
    Blob,
    Rubric,
    Roster,
    Token,
}

struct Caches {
    user: QueryCache<User>,
    classroom_user: QueryCache<ClassroomUser>,
    works: QueryCache<Vec<StudentWork>>,
    work: QueryCache<StudentWorkWithFeedback>,
    tree: QueryCache<Vec<GitTreeNode>>,
    blob: QueryCache<String>,
    rubric: QueryCache<FullRubric>,
}

pub struct ApiWorker {
    client: ApiClient,
    caches: Arc<Caches>,
    tx: UnboundedSender<AppEvent>,
    inflight: HashMap<Slot, AbortHandle>,
}

impl ApiWorker {
    /// `user_ttl` bounds how long the current user is served from cache.
    pub fn new(client: ApiClient, tx: UnboundedSender<AppEvent>, user_ttl: Duration) -> Self {
        let caches = Caches {
            user: QueryCache::new(Staleness::After(user_ttl)),
            classroom_user: QueryCache::default(),
            works: QueryCache::default(),
            work: QueryCache::default(),
            tree: QueryCache::default(),
            blob: QueryCache::default(),
            rubric: QueryCache::default(),
        };
        Self {
            client,
            caches: Arc::new(caches),
            tx,
            inflight: HashMap::new(),
        }
    }

    fn spawn_slotted<F>(&mut self, slot: Slot, fut: F)
    where
        F: Future<Output = ApiEvent> + Send + 'static,
    {
        if let Some(previous) = self.inflight.remove(&slot) {
            if !previous.is_finished() {
                tracing::debug!(?slot, "aborting superseded request");
            }
            previous.abort();
        }
        let handle = self.spawn(fut);
        self.inflight.insert(slot, handle.abort_handle());
    }

    fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ApiEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = fut.await;
            let _ = tx.send(AppEvent::Api(Box::new(event)));
        })
    }

    pub fn dispatch(&mut self, request: ApiRequest) {
        let client = self.client.clone();
        let caches = Arc::clone(&self.caches);

        match request {
            ApiRequest::CurrentUser { refresh } => {
                if refresh {
                    caches.user.invalidate(&QueryKey::CurrentUser);
                }
                self.spawn_slotted(Slot::User, async move {
                    let result = caches
                        .user
                        .fetch(&QueryKey::CurrentUser, || users::current(&client))
                        .await;
                    ApiEvent::CurrentUser(result)
                });
            }
            ApiRequest::ClassroomUser { classroom } => {
                self.spawn_slotted(Slot::ClassroomUser, async move {
                    let key = QueryKey::ClassroomUser { classroom };
                    let result = caches
                        .classroom_user
                        .fetch(&key, || classrooms::current_user(&client, classroom))
                        .await;
                    ApiEvent::ClassroomUser { classroom, result }
                });
            }
            ApiRequest::Works { classroom, assignment } => {
                self.spawn_slotted(Slot::Works, async move {
                    let key = QueryKey::Works { classroom, assignment };
                    let result = caches
                        .works
                        .fetch(&key, || grading::works(&client, classroom, assignment))
                        .await;
                    ApiEvent::Works { classroom, assignment, result }
                });
            }
            ApiRequest::Work { classroom, assignment, work } => {
                self.spawn_slotted(Slot::Work, async move {
                    let key = QueryKey::Work { classroom, assignment, work };
                    let result = caches
                        .work
                        .fetch(&key, || grading::work(&client, classroom, assignment, work))
                        .await;
                    ApiEvent::Work { key, result }
                });
            }
            ApiRequest::Tree { classroom, assignment, work } => {
                self.spawn_slotted(Slot::Tree, async move {
                    let key = QueryKey::WorkTree { classroom, assignment, work };
                    let result = caches
                        .tree
                        .fetch(&key, || grading::work_tree(&client, classroom, assignment, work))
                        .await;
                    ApiEvent::Tree { key, result }
                });
            }
            ApiRequest::Blob { classroom, assignment, work, path, sha } => {
                self.spawn_slotted(Slot::Blob, async move {
                    let key = QueryKey::Blob { classroom, assignment, work, sha: sha.clone() };
                    let result = caches
                        .blob
                        .fetch(&key, || grading::work_blob(&client, classroom, assignment, work, &sha))
                        .await;
                    ApiEvent::Blob { key, path, result }
                });
            }
            ApiRequest::AssignmentRubric { classroom, assignment } => {
                self.spawn_slotted(Slot::Rubric, async move {
                    let key = QueryKey::AssignmentRubric { classroom, assignment };
                    let result = caches
                        .rubric
                        .fetch(&key, || grading::assignment_rubric(&client, classroom, assignment))
                        .await;
                    ApiEvent::Rubric { key, result }
                });
            }
            ApiRequest::Submit { classroom, assignment, work, batch } => {
                self.spawn(async move {
                    let result = grading::grade(&client, classroom, assignment, work, &batch.request()).await;
                    if result.is_ok() {
                        let key = QueryKey::Work { classroom, assignment, work };
                        caches.work.patch(&key, |cached| patch_graded_work(cached, &batch));
                        caches.works.invalidate(&QueryKey::Works { classroom, assignment });
                    }
                    ApiEvent::Submitted { classroom, assignment, work, batch, result }
                });
            }
            ApiRequest::InvalidateWork { work } => {
                let target = Some(work);
                caches.work.invalidate_where(|k| k.work() == target);
                caches.tree.invalidate_where(|k| k.work() == target);
                caches.blob.invalidate_where(|k| k.work() == target);
                tracing::debug!(work, "work cache invalidated");
            }
            ApiRequest::Roster { classroom } => {
                self.spawn_slotted(Slot::Roster, async move {
                    let result = classrooms::users(&client, classroom).await;
                    ApiEvent::Roster { classroom, result }
                });
            }
            ApiRequest::Member { classroom, member, action } => {
                self.spawn(async move {
                    let result = change_member(&client, classroom, &member, action).await;
                    ApiEvent::MemberChanged { classroom, member, action, result }
                });
            }
            ApiRequest::IssueToken { classroom, role } => {
                self.spawn_slotted(Slot::Token, async move {
                    let result = classrooms::create_token(&client, classroom, role, None).await;
                    ApiEvent::Token { classroom, role, result }
                });
            }
        }
    }

    /// Revalidates the current user every `every`, alongside focus-driven
    /// refreshes.
    pub fn spawn_user_poll(&self, every: Duration) -> JoinHandle<()> {
        let client = self.client.clone();
        let caches = Arc::clone(&self.caches);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                caches.user.invalidate(&QueryKey::CurrentUser);
                let result = caches
                    .user
                    .fetch(&QueryKey::CurrentUser, || users::current(&client))
                    .await;
                if tx.send(AppEvent::Api(Box::new(ApiEvent::CurrentUser(result)))).is_err() {
                    break;
                }
            }
        })
    }
}

async fn change_member(
    client: &ApiClient,
    classroom: i64,
    member: &ClassroomUser,
    action: MemberAction,
) -> ApiResult<()> {
    tracing::info!(classroom, member = member.id, action = action.label(), "changing membership");
    match action {
        MemberAction::Invite => classrooms::invite_user(client, classroom, member.classroom_role, member.id).await,
        MemberAction::Deny => classrooms::deny_user(client, classroom, member.id).await,
        MemberAction::Revoke => classrooms::revoke_invite(client, classroom, member.id).await,
        MemberAction::Remove => classrooms::remove_user(client, classroom, member.id).await,
    }
}

/// Cached work after the server accepted `batch`: edits replace the entry at
/// their position, creations are appended in id order, and the manual score
/// moves by the batch delta.
fn patch_graded_work(cached: &StudentWorkWithFeedback, batch: &SubmitBatch) -> StudentWorkWithFeedback {
    let mut next = cached.clone();
    for (&id, fb) in batch.entries() {
        let idx = id as usize;
        match fb.action {
            Some(FeedbackAction::Edit | FeedbackAction::Delete) if idx < next.feedback.len() => {
                next.feedback[idx] = fb.clone();
            }
            _ => next.feedback.push(fb.clone()),
        }
    }
    let score = &mut next.student_work.work.manual_feedback_score;
    *score = Some(score.unwrap_or(0) + batch.point_delta());
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitmarks_core::feedback::FeedbackStaging;
    use gitmarks_core::types::{Feedback, PaginatedStudentWork};

    fn cached() -> StudentWorkWithFeedback {
        let work: PaginatedStudentWork = serde_json::from_str(
            r#"{"student_work_id":3,"org_name":"cs3500","repo_name":"hw1-ada","classroom_id":1,
                "assignment_outline_id":2,"manual_feedback_score":10,"row_num":1,
                "total_student_works":4}"#,
        )
        .unwrap();
        StudentWorkWithFeedback {
            student_work: work,
            feedback: vec![Feedback::comment("a.rs", 1, "typo", -1)],
        }
    }

    #[test]
    fn patch_applies_edits_and_creations() {
        let base = cached();
        let mut staging = FeedbackStaging::new();
        staging.set_confirmed(base.feedback.clone(), Some(10));
        staging.edit_feedback(0, Feedback::comment("a.rs", 1, "typo here", -2)).unwrap();
        staging.add_feedback([Feedback::comment("b.rs", 4, "nice", 3)]);
        let batch = staging.begin_submit();

        let patched = patch_graded_work(&base, &batch);
        assert_eq!(patched.feedback.len(), 2);
        assert_eq!(patched.feedback[0].body, "typo here");
        assert_eq!(patched.feedback[1].body, "nice");
        assert_eq!(patched.student_work.work.manual_feedback_score, Some(12));
    }
}
