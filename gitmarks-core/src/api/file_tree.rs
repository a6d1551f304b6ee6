//! Repository tree and blob retrieval by org/repo.

use super::ApiClient;
use crate::error::ApiResult;
use crate::types::GitTreeNode;

/// Flat tree listing of `org/repo` at its default branch.
pub async fn tree(client: &ApiClient, org: &str, repo: &str) -> ApiResult<Vec<GitTreeNode>> {
    client.get_json(&format!("/file-tree/org/{org}/repo/{repo}")).await
}

/// Raw contents of the blob with `sha`.
pub async fn blob(client: &ApiClient, org: &str, repo: &str, sha: &str) -> ApiResult<String> {
    client
        .get_text(&format!("/file-tree/org/{org}/repo/{repo}/blob/{sha}"))
        .await
}
