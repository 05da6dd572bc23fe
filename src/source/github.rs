// ABOUTME: GitHub REST client for token validation and push webhook registration.
// ABOUTME: Uses reqwest with rustls; registration is idempotent on the callback URL.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::SourceError;
use super::{HookRegistration, SourceHost, UserIdentity};
use crate::types::GitHubRepo;

const USER_AGENT: &str = concat!("omk/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api_url: String,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct Hook {
    #[serde(default)]
    config: HookConfig,
}

#[derive(Debug, Default, Deserialize)]
struct HookConfig {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateHook<'a> {
    name: &'static str,
    active: bool,
    events: [&'static str; 1],
    config: CreateHookConfig<'a>,
}

#[derive(Debug, Serialize)]
struct CreateHookConfig<'a> {
    url: &'a str,
    content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, SourceError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            api_url: api_url.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn check(response: Response) -> Result<Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SourceError::InvalidToken {
                status: status.as_u16(),
            });
        }
        let message = response.text().await.unwrap_or_default();
        Err(SourceError::Api {
            status: status.as_u16(),
            message: api_message(&message),
        })
    }
}

/// Pull the `message` field out of a GitHub error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn authenticate(&self, token: &str) -> Result<UserIdentity, SourceError> {
        let request = self.with_auth(self.http.get(self.url("/user")), token);
        let response = Self::check(request.send().await?).await?;
        let identity: UserIdentity = response.json().await?;
        tracing::debug!(login = %identity.login, "token validated");
        Ok(identity)
    }

    async fn register_webhook(
        &self,
        repo: &GitHubRepo,
        callback_url: &str,
        token: &str,
        secret: Option<&str>,
    ) -> Result<HookRegistration, SourceError> {
        let hooks_path = format!("/repos/{}/{}/hooks", repo.owner, repo.repo);

        let request = self.with_auth(self.http.get(self.url(&hooks_path)), token);
        let hooks: Vec<Hook> = Self::check(request.send().await?).await?.json().await?;
        if hooks
            .iter()
            .any(|h| h.config.url.as_deref() == Some(callback_url))
        {
            tracing::debug!(%repo, callback_url, "webhook already registered");
            return Ok(HookRegistration::Existing);
        }

        let body = CreateHook {
            name: "web",
            active: true,
            events: ["push"],
            config: CreateHookConfig {
                url: callback_url,
                content_type: "json",
                secret,
            },
        };
        let request = self
            .with_auth(self.http.post(self.url(&hooks_path)), token)
            .json(&body);
        Self::check(request.send().await?).await?;
        tracing::info!(%repo, callback_url, "webhook registered");
        Ok(HookRegistration::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = GitHubClient::new("https://api.github.com/").unwrap();
        assert_eq!(client.url("/user"), "https://api.github.com/user");
        assert_eq!(client.url("user"), "https://api.github.com/user");
    }

    #[test]
    fn api_message_prefers_json_field() {
        assert_eq!(api_message(r#"{"message":"Not Found"}"#), "Not Found");
        assert_eq!(api_message("bad gateway\n"), "bad gateway");
    }

    #[test]
    fn create_hook_body_shape() {
        let body = CreateHook {
            name: "web",
            active: true,
            events: ["push"],
            config: CreateHookConfig {
                url: "https://deploy.example.com/webhook",
                content_type: "json",
                secret: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["events"][0], "push");
        assert_eq!(json["config"]["content_type"], "json");
        assert!(json["config"].get("secret").is_none());
    }
}
