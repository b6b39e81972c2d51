//! # Article client
//!
//! [`ArticleClient`] is the production [`Publisher`]: `POST {base}/articles` to create,
//! `PUT {base}/articles/{id}` to update, authenticated with a static `api-key` header.
//!
//! Transient failures (connection errors, timeouts, HTTP 429 and 5xx) are retried with a
//! fixed delay up to the configured number of attempts. Callers only ever see the final
//! outcome: a [`RemoteArticle`], [`PublishError::RemoteRejected`], or
//! [`PublishError::MalformedResponse`] when a success response carries no article id.

use std::time::Duration;

use async_trait::async_trait;
use pubsync_core::contract::{Publisher, RemoteArticle};
use pubsync_core::payload::ArticlePayload;
use pubsync_core::PublishError;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::load_config::{CliConfig, RetrySection};

/// Longest error body echoed back in a `RemoteRejected` message.
const MAX_ERROR_BODY: usize = 300;

pub struct ArticleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetrySection,
}

impl ArticleClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        retry: RetrySection,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pubsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        tracing::info!(
            base_url,
            api_key_set = !api_key.is_empty(),
            attempts = retry.attempts,
            delay_ms = retry.delay_ms,
            "Initialized ArticleClient"
        );
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            retry,
        })
    }

    pub fn from_config(config: &CliConfig, api_key: String) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.api.base_url,
            api_key,
            config.retry,
            Duration::from_secs(config.api.timeout_secs),
        )
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        payload: &ArticlePayload,
    ) -> Result<RemoteArticle, PublishError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .http
                .request(method.clone(), url)
                .header("api-key", &self.api_key)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(payload)
                .send()
                .await;

            let retry_reason = match result {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await;
                    if status.is_success() {
                        let body = body.map_err(|e| {
                            PublishError::MalformedResponse(format!("unreadable body: {e}"))
                        })?;
                        return parse_article(&body);
                    }
                    let body = body.unwrap_or_default();
                    if !is_retryable(status) || attempt >= attempts {
                        tracing::error!(%method, url, status = status.as_u16(), attempt, "Remote rejected request");
                        return Err(PublishError::RemoteRejected {
                            status: Some(status.as_u16()),
                            message: error_message(status, &body),
                        });
                    }
                    format!("HTTP {status}")
                }
                Err(e) => {
                    let transient = e.is_connect() || e.is_timeout() || e.is_request();
                    if !transient || attempt >= attempts {
                        tracing::error!(%method, url, error = %e, attempt, "Request to remote failed");
                        return Err(PublishError::RemoteRejected {
                            status: None,
                            message: format!("request failed after {attempt} attempt(s): {e}"),
                        });
                    }
                    e.to_string()
                }
            };

            tracing::warn!(
                %method,
                url,
                attempt,
                attempts,
                reason = %retry_reason,
                "Transient failure, retrying"
            );
            tokio::time::sleep(Duration::from_millis(self.retry.delay_ms)).await;
        }
    }
}

#[async_trait]
impl Publisher for ArticleClient {
    async fn create(&self, payload: &ArticlePayload) -> Result<RemoteArticle, PublishError> {
        let url = format!("{}/articles", self.base_url);
        tracing::info!(title = %payload.article.title, "Creating remote article");
        let article = self.send(Method::POST, &url, payload).await?;
        tracing::info!(article_id = article.id, url = %article.url, "Created remote article");
        Ok(article)
    }

    async fn update(
        &self,
        article_id: u64,
        payload: &ArticlePayload,
    ) -> Result<RemoteArticle, PublishError> {
        let url = format!("{}/articles/{article_id}", self.base_url);
        tracing::info!(article_id, title = %payload.article.title, "Updating remote article");
        let article = self.send(Method::PUT, &url, payload).await?;
        tracing::info!(article_id = article.id, url = %article.url, "Updated remote article");
        Ok(article)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pulls `id` and `url` out of a success body.
fn parse_article(body: &str) -> Result<RemoteArticle, PublishError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| PublishError::MalformedResponse(format!("response is not JSON: {e}")))?;
    let id = value
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| PublishError::MalformedResponse("response has no article id".into()))?;
    let url = match value.get("url").and_then(Value::as_str) {
        Some(url) => url.to_string(),
        None => {
            tracing::warn!(article_id = id, "Response has no article url");
            String::new()
        }
    };
    Ok(RemoteArticle { id, url })
}

/// Best-effort human-readable message from an error response.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "errors"] {
            match value.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}
