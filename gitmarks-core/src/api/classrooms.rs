//! Classroom membership and invite endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::error::ApiResult;
use crate::types::{Classroom, ClassroomJoinResponse, ClassroomRole, ClassroomToken, ClassroomUser, FullRubric};

#[derive(Deserialize)]
struct UserResponse {
    user: ClassroomUser,
}

#[derive(Deserialize)]
struct UsersResponse {
    users: Vec<ClassroomUser>,
}

#[derive(Deserialize)]
struct ClassroomResponse {
    classroom: Classroom,
}

#[derive(Deserialize)]
struct FullRubricsResponse {
    full_rubrics: Vec<FullRubric>,
}

#[derive(Serialize)]
struct TokenRequest {
    classroom_role: ClassroomRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<i64>,
}

/// The signed-in user's membership in `classroom_id`.
pub async fn current_user(client: &ApiClient, classroom_id: i64) -> ApiResult<ClassroomUser> {
    let path = format!("/classrooms/classroom/{classroom_id}/user");
    let res: UserResponse = client.get_json(&path).await?;
    Ok(res.user)
}

/// Everyone enrolled in `classroom_id`, any role or status.
pub async fn users(client: &ApiClient, classroom_id: i64) -> ApiResult<Vec<ClassroomUser>> {
    let path = format!("/classrooms/classroom/{classroom_id}/students");
    let res: UsersResponse = client.get_json(&path).await?;
    Ok(res.users)
}

pub async fn create(client: &ApiClient, classroom: &Classroom) -> ApiResult<Classroom> {
    let res: ClassroomResponse = client
        .send_json(Method::POST, "/classrooms", Some(classroom))
        .await?;
    Ok(res.classroom)
}

/// Issues an invite token for `role`, optionally expiring after `duration`
/// minutes.
pub async fn create_token(
    client: &ApiClient,
    classroom_id: i64,
    role: ClassroomRole,
    duration: Option<i64>,
) -> ApiResult<ClassroomToken> {
    let path = format!("/classrooms/classroom/{classroom_id}/token");
    let body = TokenRequest { classroom_role: role, duration };
    client.send_json(Method::POST, &path, Some(&body)).await
}

pub async fn redeem_token(client: &ApiClient, token: &str) -> ApiResult<ClassroomJoinResponse> {
    let path = format!("/classrooms/classroom/token/{token}");
    client.send_json(Method::POST, &path, None::<&()>).await
}

pub async fn invite_user(
    client: &ApiClient,
    classroom_id: i64,
    role: ClassroomRole,
    user_id: i64,
) -> ApiResult<()> {
    let path = format!(
        "/classrooms/classroom/{classroom_id}/invite/role/{}/user/{user_id}",
        role.as_str()
    );
    client.send_unit(Method::PUT, &path, None::<&()>).await
}

pub async fn deny_user(client: &ApiClient, classroom_id: i64, user_id: i64) -> ApiResult<()> {
    let path = format!("/classrooms/classroom/{classroom_id}/deny/user/{user_id}");
    client.send_unit(Method::PUT, &path, None::<&()>).await
}

pub async fn revoke_invite(client: &ApiClient, classroom_id: i64, user_id: i64) -> ApiResult<()> {
    let path = format!("/classrooms/classroom/{classroom_id}/revoke/user/{user_id}");
    client.send_unit(Method::PUT, &path, None::<&()>).await
}

pub async fn remove_user(client: &ApiClient, classroom_id: i64, user_id: i64) -> ApiResult<()> {
    let path = format!("/classrooms/classroom/{classroom_id}/students/{user_id}");
    client.send_unit(Method::DELETE, &path, None::<&()>).await
}

/// Rubrics available for reuse in `classroom_id`.
pub async fn rubrics(client: &ApiClient, classroom_id: i64) -> ApiResult<Vec<FullRubric>> {
    let path = format!("/classrooms/classroom/{classroom_id}/rubrics");
    let res: FullRubricsResponse = client.get_json(&path).await?;
    Ok(res.full_rubrics)
}
