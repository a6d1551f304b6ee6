//! Feedback staging.
//!
//! Confirmed feedback comes from the server; everything the grader writes is
//! staged locally until it is submitted as one batch. Confirmed entries are
//! never mutated before the server accepts a submission.

use crate::api::{grading, ApiClient};
use crate::error::{ApiError, GraderError};
use crate::types::{Feedback, FeedbackAction, FeedbackMap, GradeRequest};

/// How an entry shown on a code line relates to the server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFeedbackState {
    Confirmed,
    /// A staged edit replacing a confirmed entry.
    PendingEdit,
    PendingCreate,
}

/// One feedback entry attached to a code line, ready for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFeedback<'a> {
    pub id: u64,
    pub feedback: &'a Feedback,
    pub state: LineFeedbackState,
}

/// Snapshot of the staged map taken when a submission starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitBatch {
    entries: FeedbackMap,
    point_delta: i64,
}

impl SubmitBatch {
    pub fn entries(&self) -> &FeedbackMap {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Net change to the manual score if the batch is accepted.
    pub fn point_delta(&self) -> i64 {
        self.point_delta
    }

    /// Request body for the grade endpoint.
    pub fn request(&self) -> GradeRequest {
        GradeRequest::from_staged(self.entries.values())
    }
}

/// Points an entry adds to the manual score when it is applied.
fn point_delta(fb: &Feedback) -> i64 {
    match fb.action.unwrap_or(FeedbackAction::Create) {
        FeedbackAction::Create => fb.points,
        FeedbackAction::Edit => {
            let previous = fb
                .history
                .as_deref()
                .and_then(|h| h.last())
                .map_or(0, |prev| prev.points);
            fb.points - previous
        }
        FeedbackAction::Delete => -fb.points,
    }
}

fn is_create(fb: &Feedback) -> bool {
    matches!(fb.action, None | Some(FeedbackAction::Create))
}

/// Confirmed and staged feedback for the work being graded.
#[derive(Debug, Clone, Default)]
pub struct FeedbackStaging {
    feedback: FeedbackMap,
    staged: FeedbackMap,
    next_id: u64,
    submitting: bool,
    manual_score: Option<i64>,
}

impl FeedbackStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces confirmed feedback with what the server returned for a work.
    /// Entries are keyed by position.
    ///
    /// The work can arrive after the grader has already staged comments, so
    /// a staged creation whose id is now taken by a confirmed entry moves to
    /// a fresh id. Staged edits keep their ids. Returns how many entries
    /// moved; the caller should persist the staged map again when non-zero.
    pub fn set_confirmed(&mut self, feedback: Vec<Feedback>, manual_score: Option<i64>) -> usize {
        self.feedback = feedback
            .into_iter()
            .enumerate()
            .map(|(i, fb)| (i as u64, fb))
            .collect();
        self.manual_score = manual_score;
        self.reset_counter();
        self.rekey_colliding_creates()
    }

    /// Installs drafts restored from the local store underneath whatever was
    /// staged while they loaded.
    ///
    /// An entry staged meanwhile replaces the restored entry with the same id
    /// when it is an edit of the same confirmed record. A staged creation
    /// that would overwrite a different restored entry moves to a fresh id
    /// instead, as does any restored creation colliding with confirmed
    /// feedback. Returns how many entries moved.
    pub fn restore_staged(&mut self, restored: FeedbackMap) -> usize {
        let meanwhile = std::mem::replace(&mut self.staged, restored);
        let mut moved = 0;
        for (id, fb) in meanwhile {
            let clashes = is_create(&fb) && self.staged.get(&id).is_some_and(|r| r != &fb);
            if clashes {
                let fresh = self.allocate_id();
                self.staged.insert(fresh, fb);
                moved += 1;
            } else {
                self.staged.insert(id, fb);
            }
        }
        moved + self.rekey_colliding_creates()
    }

    /// Moves staged creations off ids held by confirmed feedback.
    fn rekey_colliding_creates(&mut self) -> usize {
        let colliding: Vec<u64> = self
            .staged
            .iter()
            .filter(|(id, fb)| is_create(fb) && self.feedback.contains_key(id))
            .map(|(&id, _)| id)
            .collect();
        for old in &colliding {
            if let Some(fb) = self.staged.remove(old) {
                let fresh = self.allocate_id();
                tracing::debug!(old, fresh, "staged feedback re-keyed");
                self.staged.insert(fresh, fb);
            }
        }
        colliding.len()
    }

    /// Drops everything, e.g. when navigating to another work.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn confirmed(&self) -> &FeedbackMap {
        &self.feedback
    }

    pub fn staged(&self) -> &FeedbackMap {
        &self.staged
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Advisory flag set while a submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn manual_score(&self) -> Option<i64> {
        self.manual_score
    }

    /// Score the work would have if every staged entry were accepted.
    pub fn projected_score(&self) -> i64 {
        self.manual_score.unwrap_or(0) + self.staged.values().map(point_delta).sum::<i64>()
    }

    fn reset_counter(&mut self) {
        self.next_id = self.feedback.len() as u64;
    }

    fn allocate_id(&mut self) -> u64 {
        while self.feedback.contains_key(&self.next_id) || self.staged.contains_key(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Stages each item as a new comment. Returns the ids given out, in order.
    pub fn add_feedback(&mut self, items: impl IntoIterator<Item = Feedback>) -> Vec<u64> {
        items
            .into_iter()
            .map(|mut fb| {
                let id = self.allocate_id();
                fb.action = Some(FeedbackAction::Create);
                self.staged.insert(id, fb);
                id
            })
            .collect()
    }

    /// Stages a new version of entry `id`.
    ///
    /// A staged creation is rewritten in place and stays a creation. For
    /// confirmed feedback the confirmed record is appended to the new
    /// version's history and the result is staged as an edit.
    pub fn edit_feedback(&mut self, id: u64, mut new_version: Feedback) -> Result<(), GraderError> {
        if let Some(staged) = self.staged.get(&id) {
            if staged.action == Some(FeedbackAction::Create) {
                new_version.action = Some(FeedbackAction::Create);
                new_version.history = None;
                self.staged.insert(id, new_version);
                return Ok(());
            }
        }

        let confirmed = self.feedback.get(&id).ok_or(GraderError::UnknownFeedback(id))?;
        let mut history = confirmed.history.clone().unwrap_or_default();
        history.push(Feedback {
            history: None,
            ..confirmed.clone()
        });
        new_version.history = Some(history);
        new_version.action = Some(FeedbackAction::Edit);
        self.staged.insert(id, new_version);
        Ok(())
    }

    /// Discards a staged entry. Discarding a staged edit reverts the line to
    /// the confirmed record. Confirmed feedback cannot be deleted from here.
    pub fn remove_feedback(&mut self, id: u64) -> Result<Feedback, GraderError> {
        if let Some(fb) = self.staged.remove(&id) {
            return Ok(fb);
        }
        if self.feedback.contains_key(&id) {
            return Err(GraderError::DeleteUnsupported(id));
        }
        Err(GraderError::UnknownFeedback(id))
    }

    /// Snapshots the staged map for submission and raises the advisory flag.
    /// Does not refuse a second concurrent submission.
    pub fn begin_submit(&mut self) -> SubmitBatch {
        self.submitting = true;
        SubmitBatch {
            point_delta: self.staged.values().map(point_delta).sum(),
            entries: self.staged.clone(),
        }
    }

    /// Applies the outcome of a submission started with [`begin_submit`].
    ///
    /// On success the batch is merged into confirmed feedback, its entries
    /// leave the staged map, its point delta is added to the manual score and
    /// the id counter restarts at the confirmed count. On failure only the
    /// advisory flag changes.
    ///
    /// [`begin_submit`]: Self::begin_submit
    pub fn complete_submit(&mut self, batch: SubmitBatch, outcome: Result<(), ApiError>) -> Result<(), ApiError> {
        self.submitting = false;
        if let Err(err) = outcome {
            tracing::warn!(error = %err, staged = self.staged.len(), "grade submission failed");
            return Err(err);
        }

        self.manual_score = Some(self.manual_score.unwrap_or(0) + batch.point_delta);
        for (id, fb) in batch.entries {
            if self.staged.get(&id) == Some(&fb) {
                self.staged.remove(&id);
            }
            self.feedback.insert(id, fb);
        }
        self.reset_counter();
        tracing::info!(confirmed = self.feedback.len(), score = ?self.manual_score, "grade submitted");
        Ok(())
    }

    /// Entries to show on `path:line`, confirmed first in id order, then
    /// pending creations. A confirmed entry with a staged edit is shown as
    /// the edit.
    pub fn line_feedback(&self, path: &str, line: usize) -> Vec<LineFeedback<'_>> {
        let mut out = Vec::new();
        for (&id, confirmed) in &self.feedback {
            let (fb, state) = match self.staged.get(&id) {
                Some(edit) => (edit, LineFeedbackState::PendingEdit),
                None => (confirmed, LineFeedbackState::Confirmed),
            };
            if fb.deleted || !fb.is_at(path, line) {
                continue;
            }
            out.push(LineFeedback { id, feedback: fb, state });
        }
        for (&id, fb) in &self.staged {
            if self.feedback.contains_key(&id) || !fb.is_at(path, line) {
                continue;
            }
            out.push(LineFeedback {
                id,
                feedback: fb,
                state: LineFeedbackState::PendingCreate,
            });
        }
        out
    }

    /// Sorted, de-duplicated lines of `path` carrying any visible feedback.
    pub fn lines_with_feedback(&self, path: &str) -> Vec<usize> {
        let mut lines: Vec<usize> = self
            .feedback
            .iter()
            .map(|(id, fb)| self.staged.get(id).unwrap_or(fb))
            .chain(self.staged.values())
            .filter(|fb| !fb.deleted && fb.path == path)
            .map(|fb| fb.line)
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

/// Submits every staged entry for one work and applies the outcome.
///
/// # Errors
///
/// Returns the [`ApiError`] of a failed request; staged and confirmed
/// feedback are then unchanged.
pub async fn post_feedback(
    staging: &mut FeedbackStaging,
    client: &ApiClient,
    classroom_id: i64,
    assignment_id: i64,
    work_id: i64,
) -> Result<(), ApiError> {
    let batch = staging.begin_submit();
    let outcome = grading::grade(client, classroom_id, assignment_id, work_id, &batch.request()).await;
    staging.complete_submit(batch, outcome)
}
