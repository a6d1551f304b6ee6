//! API client against a mock server: paths, cookie forwarding and error
//! mapping.

use gitmarks_core::api::{classrooms, file_tree, grading, users, ApiClient};
use gitmarks_core::error::ApiError;
use gitmarks_core::types::{ChangeStatus, ClassroomRole};

#[tokio::test]
async fn current_user_sends_session_cookie() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/user")
        .match_header("cookie", "jwt_cookie=secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"user":{"id":5,"login":"octocat","name":"Octo"}}"#)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), Some("jwt_cookie=secret")).unwrap();
    let user = users::current(&client).await.unwrap();
    mock.assert_async().await;
    assert_eq!(user.login, "octocat");
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/classrooms/classroom/token/deadbeef")
        .with_status(403)
        .with_body(r#"{"message":"token has expired"}"#)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let err = classrooms::redeem_token(&client, "deadbeef").await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "token has expired");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bare_error_uses_status_text() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/classrooms/classroom/9/user")
        .with_status(404)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let err = classrooms::current_user(&client, 9).await.unwrap_err();
    assert_eq!(err.to_string(), "Not Found (404)");
}

#[tokio::test]
async fn work_tree_and_blob() {
    let mut server = mockito::Server::new_async().await;
    let base = "/classrooms/classroom/1/assignments/assignment/2/works/work/3/tree";
    let _tree = server
        .mock("GET", base)
        .with_status(200)
        .with_body(
            r#"[{"status":{"status":"modified","diff":[{"start":2,"end":4}]},
                 "entry":{"type":"blob","path":"src/a.rs","sha":"f00"}},
                {"status":{"status":"unmodified","diff":null},
                 "entry":{"type":"blob","path":"README.md","sha":"ba4"}}]"#,
        )
        .create_async()
        .await;
    let _blob = server
        .mock("GET", format!("{base}/blob/f00").as_str())
        .with_status(200)
        .with_body("fn main() {}\n")
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let nodes = grading::work_tree(&client, 1, 2, 3).await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].status.status, ChangeStatus::Modified);
    assert!(nodes[1].status.diff.is_none());

    let text = grading::work_blob(&client, 1, 2, 3, "f00").await.unwrap();
    assert_eq!(text, "fn main() {}\n");
}

#[tokio::test]
async fn membership_actions_hit_role_paths() {
    let mut server = mockito::Server::new_async().await;
    let invite = server
        .mock("PUT", "/classrooms/classroom/4/invite/role/TA/user/12")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let remove = server
        .mock("DELETE", "/classrooms/classroom/4/students/12")
        .with_status(200)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    classrooms::invite_user(&client, 4, ClassroomRole::Ta, 12).await.unwrap();
    classrooms::remove_user(&client, 4, 12).await.unwrap();
    invite.assert_async().await;
    remove.assert_async().await;
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/file-tree/org/khoury/repo/hw1")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let err = file_tree::tree(&client, "khoury", "hw1").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn repository_blob_is_returned_as_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/file-tree/org/khoury/repo/hw1/blob/abc123")
        .with_status(200)
        .with_body("fn main() {}\n")
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let text = file_tree::blob(&client, "khoury", "hw1", "abc123").await.unwrap();
    mock.assert_async().await;
    assert_eq!(text, "fn main() {}\n");
}

#[tokio::test]
async fn student_work_is_found_through_its_semester() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/semesters/2/assignments/5/student-assignments/8")
        .with_status(200)
        .with_body(
            r#"{"student_work":{"student_work_id":8,"org_name":"khoury","repo_name":"hw1-ada",
                "classroom_id":1,"assignment_outline_id":5}}"#,
        )
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let work = grading::semester_student_assignment(&client, 2, 5, 8).await.unwrap();
    assert_eq!((work.student_work_id, work.repo_name.as_str()), (8, "hw1-ada"));
    assert!(work.contributors.is_empty());
}
