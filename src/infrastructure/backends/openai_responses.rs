//! OpenAI Responses API backend
//!
//! Requests are created with `POST {base_url}/responses` and polled with
//! `GET {base_url}/responses/{id}` until they reach a terminal status. Each
//! completed response becomes the `previous_response_id` of the next request,
//! so a backend instance holds one conversation.
//!
//! Features:
//! - Connection pooling through one shared `reqwest::Client` per factory
//! - Token bucket rate limiting (`governor`), shared by all backends of a factory
//! - Exponential backoff retry for transient errors (`backoff`)
//! - Every failure is logged and surfaces as `None`

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client as ReqwestClient, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::domain::errors::BackendError;
use crate::domain::models::BackendConfig;
use crate::domain::ports::{
    BackendFactory, BackendProfile, GenerationBackend, ResponseHandle, ResponseStatus,
};
use crate::infrastructure::logging::scrub_secrets;

const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// The subset of a response object the backend reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseObject {
    pub id: String,
    #[serde(default)]
    pub status: ResponseStatus,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl ResponseObject {
    /// First `output_text` of the first `message` item that has one.
    pub fn output_text(&self) -> Option<&str> {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .find(|content| content.kind == "output_text")
            .map(|content| content.text.as_str())
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

struct SharedClient {
    http_client: ReqwestClient,
    api_key: String,
    config: BackendConfig,
    rate_limiter: DefaultDirectRateLimiter,
}

/// Creates Responses API backends that share a connection pool and a rate
/// limiter but keep independent conversations.
#[derive(Clone)]
pub struct OpenAiResponsesFactory {
    shared: Arc<SharedClient>,
}

impl OpenAiResponsesFactory {
    /// Build the shared HTTP client.
    ///
    /// The API key comes from the configuration, or `OPENAI_API_KEY` when the
    /// configuration has none.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()))
            .ok_or(BackendError::MissingApiKey)?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            shared: Arc::new(SharedClient {
                http_client,
                api_key,
                config: config.clone(),
                rate_limiter: RateLimiter::direct(Quota::per_second(rps)),
            }),
        })
    }
}

impl BackendFactory for OpenAiResponsesFactory {
    type Backend = OpenAiResponsesBackend;

    fn create(&self, profile: BackendProfile) -> OpenAiResponsesBackend {
        let options = &self.shared.config.options;
        let options = match profile {
            BackendProfile::ErrorLineFinder => options.finder.clone(),
            BackendProfile::NegativeTests => options.negative.clone(),
            BackendProfile::PositiveTests => options.positive.clone(),
        };
        OpenAiResponsesBackend {
            shared: Arc::clone(&self.shared),
            options,
            previous_response_id: Mutex::new(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// One conversation with the Responses API.
pub struct OpenAiResponsesBackend {
    shared: Arc<SharedClient>,
    /// Extra request fields (temperature, text format, ...)
    options: Map<String, Value>,
    previous_response_id: Mutex<Option<String>>,
}

impl OpenAiResponsesBackend {
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{path}",
            self.shared.config.base_url.trim_end_matches('/')
        )
    }

    /// Request body: the configured options, then model, input and the
    /// conversation link. A `model` in the options wins over the configured one.
    pub async fn request_body(&self, messages: &[String]) -> Value {
        let mut body = self.options.clone();
        body.entry("model")
            .or_insert_with(|| Value::String(self.shared.config.model.clone()));

        let input: Vec<InputMessage<'_>> = messages
            .iter()
            .map(|content| InputMessage {
                role: "user",
                content,
            })
            .collect();
        body.insert("input".to_string(), serde_json::json!(input));

        if let Some(previous) = self.previous_response_id.lock().await.clone() {
            body.insert("previous_response_id".to_string(), Value::String(previous));
        }
        Value::Object(body)
    }

    pub async fn previous_response_id(&self) -> Option<String> {
        self.previous_response_id.lock().await.clone()
    }

    async fn create_response(&self, body: &Value) -> Result<ResponseObject, BackendError> {
        let response = self
            .shared
            .http_client
            .post(self.url("responses"))
            .bearer_auth(&self.shared.api_key)
            .json(body)
            .send()
            .await?;
        parse_response(response).await
    }

    async fn retrieve_response(&self, id: &str) -> Result<ResponseObject, BackendError> {
        let response = self
            .shared
            .http_client
            .get(self.url(&format!("responses/{id}")))
            .bearer_auth(&self.shared.api_key)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Run `operation` under the rate limiter, retrying transient failures
    /// with exponential backoff up to `max_retries` times.
    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T, BackendError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let config = &self.shared.config;
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(config.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();

        let max_retries = config.max_retries;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let operation = &operation;
        let rate_limiter = &self.shared.rate_limiter;

        backoff::future::retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            rate_limiter.until_ready().await;

            operation().await.map_err(|err| {
                if err.is_transient() && attempt < max_retries {
                    tracing::debug!(attempt = attempt + 1, error = %err, "transient backend error, retrying");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        })
        .await
    }
}

async fn parse_response(response: Response) -> Result<ResponseObject, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        return Err(BackendError::Status {
            status,
            body: scrub_secrets(&body),
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|err| BackendError::Payload(err.to_string()))
}

#[async_trait]
impl GenerationBackend for OpenAiResponsesBackend {
    fn name(&self) -> &str {
        "openai-responses"
    }

    async fn submit(&self, messages: &[String]) -> Option<ResponseHandle> {
        let body = self.request_body(messages).await;
        match self.with_retry(|| self.create_response(&body)).await {
            Ok(response) => {
                tracing::debug!(response_id = %response.id, status = %response.status, "response created");
                Some(ResponseHandle::new(response.id, response.status))
            }
            Err(err) => {
                tracing::debug!(error = %err, "response creation failed");
                None
            }
        }
    }

    async fn poll(&self, handle: &ResponseHandle) -> Option<String> {
        let config = &self.shared.config;
        let interval = Duration::from_millis(config.poll_interval_ms);
        let mut failures = 0u32;

        let response = loop {
            match self.with_retry(|| self.retrieve_response(&handle.id)).await {
                Ok(response) if response.status.is_terminal() => break response,
                Ok(response) => {
                    failures = 0;
                    tracing::trace!(response_id = %handle.id, status = %response.status, "response pending");
                }
                Err(err) => {
                    failures += 1;
                    tracing::debug!(response_id = %handle.id, failures, error = %err, "response retrieval failed");
                    if failures > config.max_poll_failures {
                        tracing::warn!(response_id = %handle.id, "no response retrieved");
                        return None;
                    }
                }
            }
            tokio::time::sleep(interval).await;
        };

        if response.status != ResponseStatus::Completed {
            tracing::warn!(response_id = %response.id, status = %response.status, "response did not complete");
            return None;
        }

        *self.previous_response_id.lock().await = Some(response.id.clone());

        let text = response.output_text().map(str::to_string);
        if text.is_none() {
            tracing::warn!(response_id = %response.id, "completed response has no output text");
        }
        text
    }

    async fn reset(&self) {
        *self.previous_response_id.lock().await = None;
    }
}
