//! # API client
//!
//! Thin async wrappers over the GitMarks REST API. Every request carries the
//! session cookie handed to the client at construction; the server owns all
//! durable state and business rules. Endpoint families live in submodules and
//! take a shared [`ApiClient`].

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

pub mod classrooms;
pub mod file_tree;
pub mod grading;
pub mod orgs;
pub mod rubrics;
pub mod users;

const USER_AGENT: &str = concat!("gitmarks/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shape of an error body; only `message` is read.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Connection to one GitMarks API deployment.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Builds a client for `base_url`, attaching `session_cookie` (a raw
    /// `Cookie` header value) to every request when given.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidUrl`] when `base_url` does not parse or the cookie
    /// is not a valid header value.
    pub fn new(base_url: &str, session_cookie: Option<&str>) -> ApiResult<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| ApiError::InvalidUrl(format!("{base_url}: {err}")))?;

        let mut headers = header::HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let mut value = header::HeaderValue::from_str(cookie)
                .map_err(|_| ApiError::InvalidUrl("session cookie is not a valid header".into()))?;
            value.set_sensitive(true);
            headers.insert(header::COOKIE, value);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http, base })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> ApiResult<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "api request");

        let mut req = self.http.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.unwrap_or_default();
        let err = status_error(status, &text);
        tracing::warn!(%url, status = status.as_u16(), error = %err, "api request failed");
        Err(err)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let res = self.send(Method::GET, path, None::<&()>).await?;
        decode(res).await
    }

    pub(crate) async fn get_text(&self, path: &str) -> ApiResult<String> {
        let res = self.send(Method::GET, path, None::<&()>).await?;
        Ok(res.text().await?)
    }

    pub(crate) async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let res = self.send(method, path, body).await?;
        decode(res).await
    }

    /// Sends a request whose response body is ignored.
    pub(crate) async fn send_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(method, path, body).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> ApiResult<T> {
    let text = res.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Maps a non-2xx response to [`ApiError::Status`], preferring the server's
/// JSON `message` over the canonical status text.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_wins_over_status_text() {
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"message":"token expired"}"#);
        assert_eq!(err.to_string(), "token expired (400)");
    }

    #[test]
    fn non_json_body_falls_back_to_status_text() {
        let err = status_error(StatusCode::NOT_FOUND, "<html>nope</html>");
        assert!(matches!(err, ApiError::Status { status: 404, ref message } if message == "Not Found"));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(ApiClient::new("not a url", None), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", Some("jwt_cookie=abc")).unwrap();
        assert_eq!(client.url("/users/user"), "http://localhost:8080/users/user");
    }
}
