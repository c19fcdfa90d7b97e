// REST client for the Cast backend.
//
// A thin reqwest wrapper with generic JSON helpers, one method per
// endpoint. Mutation responses are decoded leniently: the backend's reply
// shapes vary between deployments, and the engagement core only needs the
// updated counters when they are present.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::traits::{CounterValue, FeedBackend, LikeState, ViewCount};
use crate::feed::models::{
    Comment, Level, NewComment, NewRepost, Post, Recast, Recite, UserProfile,
};

/// Default REST base URL.
pub const DEFAULT_API_URL: &str = "https://cast-api-zeta.vercel.app/api";

pub struct CastApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl CastApiClient {
    /// Create a client for the given base URL (e.g. `https://host/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("castfeed/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path (`path` starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        debug!(path = path, "GET");

        let response = self
            .client
            .get(self.url(path))
            .query(params)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize GET {path} response"))
    }

    /// Like `get_json`, but a 404 means "no record yet" rather than an error.
    async fn get_optional_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        debug!(path = path, "GET (optional)");

        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .with_context(|| format!("Failed to deserialize GET {path} response"))
    }

    /// Send a request and decode the reply strictly.
    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let value = self.send(method, path, body).await?;
        serde_json::from_value(value).with_context(|| format!("Failed to deserialize {path} response"))
    }

    /// Send a request; an undecodable reply body falls back to `T::default()`.
    async fn send_lenient<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let value = self.send(method, path, body).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<serde_json::Value> {
        debug!(method = %method, path = path, "request");

        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {path} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{method} {path} returned {status}: {body}");
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {method} {path} response"))?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

/// Query parameters shared by the three feed reads.
pub fn level_params(level: &Level) -> [(&'static str, &str); 2] {
    [("levelType", level.kind.as_str()), ("levelValue", level.value.as_str())]
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdBody<'a> {
    user_id: &'a str,
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl FeedBackend for CastApiClient {
    async fn fetch_posts(&self, level: &Level) -> Result<Vec<Post>> {
        self.get_json("/posts", &level_params(level)).await
    }

    async fn fetch_recites(&self, level: &Level) -> Result<Vec<Recite>> {
        self.get_json("/recites", &level_params(level)).await
    }

    async fn fetch_recasts(&self, level: &Level) -> Result<Vec<Recast>> {
        self.get_json("/recasts", &level_params(level)).await
    }

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<LikeState> {
        self.send_lenient(
            reqwest::Method::POST,
            &format!("/posts/{post_id}/like"),
            Some(&UserIdBody { user_id }),
        )
        .await
    }

    async fn increment_view(&self, post_id: &str) -> Result<ViewCount> {
        self.send_lenient(reqwest::Method::POST, &format!("/posts/{post_id}/view"), NO_BODY)
            .await
    }

    async fn increment_recast_count(&self, post_id: &str) -> Result<CounterValue> {
        self.send_lenient(
            reqwest::Method::POST,
            &format!("/posts/{post_id}/recastCount"),
            NO_BODY,
        )
        .await
    }

    async fn increment_recite_count(&self, post_id: &str) -> Result<CounterValue> {
        self.send_lenient(
            reqwest::Method::POST,
            &format!("/posts/{post_id}/reciteCount"),
            NO_BODY,
        )
        .await
    }

    async fn create_recast(&self, request: &NewRepost) -> Result<Recast> {
        self.send_json(reqwest::Method::POST, "/recasts", Some(request))
            .await
    }

    async fn create_recite(&self, request: &NewRepost) -> Result<Recite> {
        self.send_json(reqwest::Method::POST, "/recites", Some(request))
            .await
    }

    async fn delete_post(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.send(
            reqwest::Method::DELETE,
            &format!("/posts/{post_id}"),
            Some(&UserIdBody { user_id }),
        )
        .await
        .map(|_| ())
    }

    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.get_json(&format!("/comments/{post_id}"), &[]).await
    }

    async fn post_comment(&self, post_id: &str, comment: &NewComment) -> Result<Comment> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/comments/{post_id}"),
            Some(comment),
        )
        .await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.get_optional_json(&format!("/users/{user_id}")).await
    }
}
