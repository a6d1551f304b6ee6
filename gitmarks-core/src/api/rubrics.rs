//! Rubric CRUD.

use reqwest::Method;
use serde::Deserialize;

use super::ApiClient;
use crate::error::ApiResult;
use crate::types::FullRubric;

#[derive(Deserialize)]
pub(crate) struct FullRubricResponse {
    pub(crate) full_rubric: FullRubric,
}

pub async fn create(client: &ApiClient, rubric: &FullRubric) -> ApiResult<FullRubric> {
    let res: FullRubricResponse = client
        .send_json(Method::POST, "/rubrics/rubric", Some(rubric))
        .await?;
    Ok(res.full_rubric)
}

pub async fn get(client: &ApiClient, rubric_id: i64) -> ApiResult<FullRubric> {
    let res: FullRubricResponse = client.get_json(&format!("/rubrics/rubric/{rubric_id}")).await?;
    Ok(res.full_rubric)
}

pub async fn update(client: &ApiClient, rubric_id: i64, rubric: &FullRubric) -> ApiResult<FullRubric> {
    let path = format!("/rubrics/rubric/{rubric_id}");
    let res: FullRubricResponse = client.send_json(Method::PUT, &path, Some(rubric)).await?;
    Ok(res.full_rubric)
}
