//! Organization and GitHub app installation endpoints.

use serde::Deserialize;

use super::ApiClient;
use crate::error::ApiResult;
use crate::types::{Classroom, InstallationsResponse, Organization};

/// Classrooms belonging to one organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrgClassrooms {
    pub org_id: i64,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
}

#[derive(Deserialize)]
struct OrgResponse {
    org: Organization,
}

pub async fn classrooms(client: &ApiClient, org_id: i64) -> ApiResult<OrgClassrooms> {
    client.get_json(&format!("/orgs/org/{org_id}/classrooms")).await
}

/// Organizations the user belongs to, split by whether the app is installed.
pub async fn installations(client: &ApiClient) -> ApiResult<InstallationsResponse> {
    client.get_json("/orgs/installations").await
}

pub async fn details(client: &ApiClient, login: &str) -> ApiResult<Organization> {
    let res: OrgResponse = client.get_json(&format!("/orgs/org/{login}")).await?;
    Ok(res.org)
}
