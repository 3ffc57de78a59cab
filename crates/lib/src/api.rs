//! HTTP client for the KG chatbot backend (http://localhost:8000 by default).
//!
//! The backend performs retrieval and generation; this client only sends
//! messages and fetches session state. All responses are decoded strictly at
//! this boundary: the `source` field is normalized into the closed [`Source`]
//! enum so display logic never sees an unexpected value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Client for the chatbot HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx response; `detail` is the server-supplied message when the
    /// body was parseable, otherwise a generic message with the raw status.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    /// The endpoint itself is absent (HTTP 404 on delete). Kept distinct so
    /// callers can tell "backend not updated" apart from a generic failure.
    #[error("endpoint not found: {0}")]
    EndpointMissing(String),
}

/// Where a reply came from. Closed set; anything else the backend sends is
/// normalized to `Llm` so badge rendering stays total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "KB")]
    Kb,
    #[serde(rename = "KB+LLM")]
    KbLlm,
    #[serde(rename = "LLM")]
    Llm,
    #[serde(rename = "error")]
    Error,
}

impl Source {
    /// Parse a backend-supplied source string; unknown values become `Llm`.
    pub fn parse(s: &str) -> Source {
        match s {
            "KB" => Source::Kb,
            "KB+LLM" => Source::KbLlm,
            "error" => Source::Error,
            _ => Source::Llm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Kb => "KB",
            Source::KbLlm => "KB+LLM",
            Source::Llm => "LLM",
            Source::Error => "error",
        }
    }
}

fn de_source<'de, D: Deserializer<'de>>(d: D) -> Result<Source, D::Error> {
    let s = String::deserialize(d)?;
    Ok(Source::parse(&s))
}

fn de_opt_source<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Source>, D::Error> {
    let s = Option::<String>::deserialize(d)?;
    Ok(s.map(|s| Source::parse(&s)))
}

fn default_source() -> Source {
    Source::Llm
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    message: &'a str,
    enable_llm: bool,
}

/// Reply to one chat turn. `session_id` is the session the backend used
/// (freshly created when the request carried none).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default = "default_source", deserialize_with = "de_source")]
    pub source: Source,
    pub session_id: String,
}

/// A past conversation as listed by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
}

/// A server-confirmed message (id assigned by the backend).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
    #[serde(default, deserialize_with = "de_opt_source")]
    pub source: Option<Source>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Extract the server's `detail` message from an error body; fall back to a
/// generic message carrying the raw HTTP status.
fn detail_from_body(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| format!("HTTP error! status: {}", status))
}

fn status_text(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| status.as_u16().to_string())
}

impl ApiClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /chat — send one user message; the backend replies and returns
    /// the session id it used (creating a session when none was given).
    pub async fn send_message(
        &self,
        session_id: Option<&str>,
        message: &str,
        enable_llm: bool,
    ) -> Result<ChatReply, ApiError> {
        let url = format!("{}/chat", self.base_url);
        let body = ChatRequest {
            session_id,
            message,
            enable_llm,
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status,
                detail: detail_from_body(&body, status),
            });
        }
        Ok(res.json().await?)
    }

    /// GET /sessions — all sessions, most with their messages inlined.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let url = format!("{}/sessions", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail: format!("failed to fetch sessions: {}", status_text(status)),
            });
        }
        Ok(res.json().await?)
    }

    /// GET /sessions/{id}/messages — confirmed history for one session.
    pub async fn session_messages(&self, session_id: &str) -> Result<Vec<ApiMessage>, ApiError> {
        let url = format!("{}/sessions/{}/messages", self.base_url, session_id);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail: format!("failed to fetch messages: {}", status_text(status)),
            });
        }
        Ok(res.json().await?)
    }

    /// DELETE /sessions/{id}. A 404 maps to [`ApiError::EndpointMissing`]
    /// (older backends do not expose this route); no response body expected.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);
        let res = self.client.delete(&url).send().await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::EndpointMissing(url));
        }
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status,
                detail: detail_from_body(&body, status),
            });
        }
        Ok(())
    }

    /// GET /health.
    pub async fn health(&self) -> Result<Health, ApiError> {
        let url = format!("{}/health", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail: format!("health check failed: {}", status_text(status)),
            });
        }
        Ok(res.json().await?)
    }
}
