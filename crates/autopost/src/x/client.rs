//! X API v2 client.
//!
//! Reads use the app bearer token; publishing and likes are signed with
//! OAuth 1.0a user context.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::config::{XCredentials, MAX_POST_CHARS};
use crate::error::{AutopostError, AutopostResult, Violation};

use super::oauth::{authorization_header, OAuth1Credentials};
use super::types::{
    ApiProblem, DataEnvelope, LikeResult, Mention, Post, PublishedPost, RawMention, SortOrder,
    UserRef,
};
use super::XApi;

const X_API_BASE: &str = "https://api.x.com";

const POST_FIELDS: &str = "created_at,public_metrics,author_id,text";

/// Longest wait honoured for a rate-limit reset.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// X API v2 client for a single account.
pub struct XClient {
    http: Client,
    base_url: String,
    bearer_token: String,
    oauth: OAuth1Credentials,
    username: String,
    user_id: OnceCell<String>,
}

impl XClient {
    /// Create a client from credentials.
    pub fn new(creds: XCredentials) -> AutopostResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: X_API_BASE.to_string(),
            bearer_token: creds.bearer_token,
            oauth: OAuth1Credentials {
                consumer_key: creds.api_key,
                consumer_secret: creds.api_secret,
                token: creds.access_token,
                token_secret: creds.access_token_secret,
            },
            username: creds.username,
            user_id: OnceCell::new(),
        })
    }

    /// Create from environment variables (see [`XCredentials::from_env`]).
    ///
    /// `X_API_BASE_URL` overrides the API host.
    pub fn from_env() -> AutopostResult<Self> {
        let client = Self::new(XCredentials::from_env()?)?;
        Ok(match std::env::var("X_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    /// Set a custom base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Account handle this client acts for.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer_get(&self, path: &str, query: &[(&str, String)]) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .bearer_auth(&self.bearer_token)
            .query(query)
    }

    fn signed_post(&self, path: &str, body: &serde_json::Value) -> AutopostResult<RequestBuilder> {
        let url = self.url(path);
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let header = authorization_header(
            &self.oauth,
            Method::POST.as_str(),
            &url,
            &[],
            &nonce,
            Utc::now().timestamp(),
        )?;
        Ok(self
            .http
            .post(url)
            .header("Authorization", header)
            .json(body))
    }

    /// Send a request, waiting out one rate-limit window if the API asks for it.
    async fn send(&self, request: RequestBuilder) -> AutopostResult<Response> {
        let retry = request.try_clone();
        let response = request
            .send()
            .await
            .map_err(|e| AutopostError::api("x", format!("request failed: {e}")))?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        let Some(retry) = retry else {
            return Ok(response);
        };

        let wait = rate_limit_wait(&response);
        tracing::warn!(wait_secs = wait.as_secs(), "X API rate limit hit, waiting for reset");
        tokio::time::sleep(wait).await;

        retry
            .send()
            .await
            .map_err(|e| AutopostError::api("x", format!("request failed: {e}")))
    }

    async fn read_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> AutopostResult<DataEnvelope<T>> {
        let response = self.send(request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AutopostError::api("x", format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(AutopostError::api_status(
                "x",
                status.as_u16(),
                problem_message(&body),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| AutopostError::api("x", format!("invalid response: {e}")))
    }
}

fn rate_limit_wait(response: &Response) -> Duration {
    let reset = response
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    match reset {
        Some(reset_at) => {
            let secs = (reset_at - Utc::now().timestamp()).max(1) as u64;
            Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT)
        }
        None => Duration::from_secs(60),
    }
}

fn problem_message(body: &str) -> String {
    match serde_json::from_str::<ApiProblem>(body) {
        Ok(ApiProblem {
            detail: Some(detail),
            ..
        }) => detail,
        Ok(ApiProblem {
            title: Some(title), ..
        }) => title,
        _ => body.to_string(),
    }
}

#[async_trait]
impl XApi for XClient {
    async fn own_user_id(&self) -> AutopostResult<String> {
        self.user_id
            .get_or_try_init(|| async {
                let path = format!("/2/users/by/username/{}", self.username);
                let envelope: DataEnvelope<UserRef> =
                    self.read_data(self.bearer_get(&path, &[])).await?;
                envelope.data.map(|u| u.id).ok_or_else(|| {
                    AutopostError::api("x", format!("user @{} not found", self.username))
                })
            })
            .await
            .cloned()
    }

    async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
        sort: SortOrder,
    ) -> AutopostResult<Vec<Post>> {
        let request = self.bearer_get(
            "/2/tweets/search/recent",
            &[
                ("query", query.to_string()),
                ("max_results", max_results.clamp(10, 100).to_string()),
                ("tweet.fields", POST_FIELDS.to_string()),
                ("sort_order", sort.as_str().to_string()),
            ],
        );
        let envelope: DataEnvelope<Vec<Post>> = self.read_data(request).await?;
        let posts = envelope.data.unwrap_or_default();
        tracing::debug!(query, count = posts.len(), "Search complete");
        Ok(posts)
    }

    async fn own_recent_posts(&self, max_results: u32) -> AutopostResult<Vec<Post>> {
        let user_id = self.own_user_id().await?;
        let request = self.bearer_get(
            &format!("/2/users/{user_id}/tweets"),
            &[
                ("max_results", max_results.clamp(5, 100).to_string()),
                ("tweet.fields", POST_FIELDS.to_string()),
            ],
        );
        let envelope: DataEnvelope<Vec<Post>> = self.read_data(request).await?;
        let posts = envelope.data.unwrap_or_default();
        tracing::info!(count = posts.len(), "Fetched own recent posts");
        Ok(posts)
    }

    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
    ) -> AutopostResult<PublishedPost> {
        let chars = text.chars().count();
        if chars > MAX_POST_CHARS {
            return Err(AutopostError::Validation(Violation::TooLong {
                chars,
                max: MAX_POST_CHARS,
            }));
        }

        let body = match reply_to {
            Some(id) => json!({ "text": text, "reply": { "in_reply_to_tweet_id": id } }),
            None => json!({ "text": text }),
        };
        let envelope: DataEnvelope<PublishedPost> =
            self.read_data(self.signed_post("/2/tweets", &body)?).await?;
        let published = envelope
            .data
            .ok_or_else(|| AutopostError::api("x", "publish response had no data"))?;

        tracing::info!(id = %published.id, reply = reply_to.is_some(), "Post published");
        Ok(published)
    }

    async fn mentions(
        &self,
        since_id: Option<&str>,
        max_results: u32,
    ) -> AutopostResult<Vec<Mention>> {
        let user_id = self.own_user_id().await?;
        let mut query = vec![
            ("max_results", max_results.clamp(5, 100).to_string()),
            (
                "tweet.fields",
                "created_at,author_id,text,conversation_id".to_string(),
            ),
            ("expansions", "author_id".to_string()),
        ];
        if let Some(id) = since_id {
            query.push(("since_id", id.to_string()));
        }

        let envelope: DataEnvelope<Vec<RawMention>> = self
            .read_data(self.bearer_get(&format!("/2/users/{user_id}/mentions"), &query))
            .await?;
        let users = envelope.includes.map(|i| i.users).unwrap_or_default();

        let mentions: Vec<Mention> = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|raw| {
                let author_id = raw.author_id.unwrap_or_default();
                let author_username = users
                    .iter()
                    .find(|u| u.id == author_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                Mention {
                    id: raw.id,
                    text: raw.text,
                    author_id,
                    author_username,
                    created_at: raw.created_at,
                    conversation_id: raw.conversation_id,
                }
            })
            .collect();

        tracing::info!(count = mentions.len(), "Fetched mentions");
        Ok(mentions)
    }

    async fn like(&self, post_id: &str) -> AutopostResult<bool> {
        let user_id = self.own_user_id().await?;
        let request =
            self.signed_post(&format!("/2/users/{user_id}/likes"), &json!({ "tweet_id": post_id }))?;
        let envelope: DataEnvelope<LikeResult> = self.read_data(request).await?;
        Ok(envelope.data.is_some_and(|r| r.liked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_message_prefers_detail() {
        let body = r#"{"title":"Forbidden","detail":"You are not permitted","status":403}"#;
        assert_eq!(problem_message(body), "You are not permitted");

        let body = r#"{"title":"Unauthorized","status":401}"#;
        assert_eq!(problem_message(body), "Unauthorized");

        assert_eq!(problem_message("plain text"), "plain text");
    }

    #[test]
    fn test_base_url_override() {
        let creds = XCredentials {
            api_key: "k".into(),
            api_secret: "s".into(),
            access_token: "t".into(),
            access_token_secret: "ts".into(),
            bearer_token: "b".into(),
            username: "me".into(),
        };
        let client = XClient::new(creds)
            .unwrap()
            .with_base_url("http://127.0.0.1:8080/");
        assert_eq!(client.url("/2/tweets"), "http://127.0.0.1:8080/2/tweets");
        assert_eq!(client.username(), "me");
    }
}
