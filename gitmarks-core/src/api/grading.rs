//! Grading endpoints: student works, their trees and blobs, and batch grade
//! submission.
//!
//! All paths hang off
//! `/classrooms/classroom/{classroom}/assignments/assignment/{assignment}`.

use reqwest::Method;
use serde::Deserialize;

use super::rubrics::FullRubricResponse;
use super::ApiClient;
use crate::error::ApiResult;
use crate::types::{FullRubric, GitTreeNode, GradeRequest, StudentWork, StudentWorkWithFeedback};

#[derive(Deserialize)]
struct StudentWorksResponse {
    student_works: Vec<StudentWork>,
}

#[derive(Deserialize)]
struct StudentWorkResponse {
    student_work: StudentWork,
}

fn assignment_path(classroom_id: i64, assignment_id: i64) -> String {
    format!("/classrooms/classroom/{classroom_id}/assignments/assignment/{assignment_id}")
}

fn work_path(classroom_id: i64, assignment_id: i64, work_id: i64) -> String {
    format!(
        "{}/works/work/{work_id}",
        assignment_path(classroom_id, assignment_id)
    )
}

/// Every student work in an assignment, including placeholder rows for
/// students who never accepted it.
pub async fn works(client: &ApiClient, classroom_id: i64, assignment_id: i64) -> ApiResult<Vec<StudentWork>> {
    let path = format!("{}/works", assignment_path(classroom_id, assignment_id));
    let res: StudentWorksResponse = client.get_json(&path).await?;
    Ok(res.student_works)
}

/// One work positioned in the grading queue, with its confirmed feedback.
pub async fn work(
    client: &ApiClient,
    classroom_id: i64,
    assignment_id: i64,
    work_id: i64,
) -> ApiResult<StudentWorkWithFeedback> {
    client.get_json(&work_path(classroom_id, assignment_id, work_id)).await
}

pub async fn work_tree(
    client: &ApiClient,
    classroom_id: i64,
    assignment_id: i64,
    work_id: i64,
) -> ApiResult<Vec<GitTreeNode>> {
    let path = format!("{}/tree", work_path(classroom_id, assignment_id, work_id));
    client.get_json(&path).await
}

pub async fn work_blob(
    client: &ApiClient,
    classroom_id: i64,
    assignment_id: i64,
    work_id: i64,
    sha: &str,
) -> ApiResult<String> {
    let path = format!("{}/tree/blob/{sha}", work_path(classroom_id, assignment_id, work_id));
    client.get_text(&path).await
}

/// Submits a batch of feedback in one request. At most once: the caller
/// decides what to do on failure.
pub async fn grade(
    client: &ApiClient,
    classroom_id: i64,
    assignment_id: i64,
    work_id: i64,
    request: &GradeRequest,
) -> ApiResult<()> {
    let path = format!("{}/grade", work_path(classroom_id, assignment_id, work_id));
    tracing::info!(work_id, comments = request.comments.len(), "submitting grade");
    client.send_unit(Method::POST, &path, Some(request)).await
}

pub async fn assignment_rubric(client: &ApiClient, classroom_id: i64, assignment_id: i64) -> ApiResult<FullRubric> {
    let path = format!("{}/rubric", assignment_path(classroom_id, assignment_id));
    let res: FullRubricResponse = client.get_json(&path).await?;
    Ok(res.full_rubric)
}

/// A student's work looked up through its semester.
pub async fn semester_student_assignment(
    client: &ApiClient,
    semester_id: i64,
    assignment_id: i64,
    student_assignment_id: i64,
) -> ApiResult<StudentWork> {
    let path = format!(
        "/semesters/{semester_id}/assignments/{assignment_id}/student-assignments/{student_assignment_id}"
    );
    let res: StudentWorkResponse = client.get_json(&path).await?;
    Ok(res.student_work)
}
