//! Feedback staging: id allocation and batch submission against a mock
//! server.

use gitmarks_core::api::ApiClient;
use gitmarks_core::feedback::{post_feedback, FeedbackStaging};
use gitmarks_core::types::{Feedback, FeedbackAction};

const GRADE_PATH: &str = "/classrooms/classroom/1/assignments/assignment/2/works/work/3/grade";

fn comment(line: usize, points: i64) -> Feedback {
    Feedback::comment("src/main.rs", line, "see here", points)
}

fn with_confirmed() -> FeedbackStaging {
    let mut staging = FeedbackStaging::new();
    staging.set_confirmed(vec![comment(1, -1), comment(2, -1)], Some(8));
    staging
}

#[test]
fn ids_are_fresh_and_increasing() {
    let mut staging = with_confirmed();
    let first = staging.add_feedback([comment(5, 0), comment(6, 0)]);
    let second = staging.add_feedback([comment(7, 0)]);

    let all: Vec<u64> = first.iter().chain(&second).copied().collect();
    assert!(all.windows(2).all(|w| w[0] < w[1]), "{all:?}");
    assert!(all.iter().all(|id| !staging.confirmed().contains_key(id)));
    assert!(staging
        .staged()
        .values()
        .all(|fb| fb.action == Some(FeedbackAction::Create)));
}

#[tokio::test]
async fn successful_submit_merges_and_resets_counter() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GRADE_PATH)
        .match_body(mockito::Matcher::Regex(r#""action":"CREATE""#.into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), Some("jwt=abc")).unwrap();
    let mut staging = with_confirmed();
    staging.add_feedback([comment(5, -3)]);

    post_feedback(&mut staging, &client, 1, 2, 3).await.unwrap();
    mock.assert_async().await;

    assert!(!staging.has_staged());
    assert!(!staging.is_submitting());
    assert_eq!(staging.confirmed().len(), 3);
    assert_eq!(staging.manual_score(), Some(5));

    let next = staging.add_feedback([comment(9, 0)]);
    assert_eq!(next, [staging.confirmed().len() as u64]);
}

#[tokio::test]
async fn failed_submit_changes_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", GRADE_PATH)
        .with_status(500)
        .with_body(r#"{"message":"github unavailable"}"#)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let mut staging = with_confirmed();
    staging.add_feedback([comment(5, -3)]);
    staging.edit_feedback(0, comment(1, -4)).unwrap();
    let staged_before = staging.staged().clone();
    let confirmed_before = staging.confirmed().clone();

    let err = post_feedback(&mut staging, &client, 1, 2, 3).await.unwrap_err();
    assert!(err.to_string().contains("github unavailable"));

    assert_eq!(staging.staged(), &staged_before);
    assert_eq!(staging.confirmed(), &confirmed_before);
    assert_eq!(staging.manual_score(), Some(8));
    assert!(!staging.is_submitting());
}

#[test]
fn edit_keeps_confirmed_record_in_history() {
    let mut staging = with_confirmed();
    staging.edit_feedback(1, comment(2, -3)).unwrap();

    let edit = &staging.staged()[&1];
    assert_eq!(edit.action, Some(FeedbackAction::Edit));
    let history = edit.history.as_ref().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].points, -1);
    assert_eq!(staging.confirmed()[&1].points, -1);

    staging.remove_feedback(1).unwrap();
    assert!(!staging.has_staged());
}

#[test]
fn resubmitting_while_in_flight_is_not_blocked() {
    let mut staging = with_confirmed();
    staging.add_feedback([comment(5, -3)]);
    let first = staging.begin_submit();
    let second = staging.begin_submit();
    assert!(staging.is_submitting());
    assert_eq!(first, second);
}
