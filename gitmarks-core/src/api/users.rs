use serde::Deserialize;

use super::ApiClient;
use crate::error::ApiResult;
use crate::types::User;

#[derive(Deserialize)]
struct CurrentUserResponse {
    user: User,
}

/// The GitHub account behind the session cookie.
pub async fn current(client: &ApiClient) -> ApiResult<User> {
    let res: CurrentUserResponse = client.get_json("/users/user").await?;
    Ok(res.user)
}
