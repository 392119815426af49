use crate::config::EngineConfig;
use crate::engine::{EngineQuery, SearchEngine};
use crate::search::{IndexSettings, SearchError, SearchResult};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// HTTP adapter for a Meilisearch-compatible engine
#[derive(Clone)]
pub struct MeilisearchEngine {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    task_timeout: Duration,
}

/// Error body returned by the engine
#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: String,
}

/// Acknowledgement for asynchronous operations
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnqueuedTask {
    task_uid: u64,
}

#[derive(Debug, Deserialize)]
struct TaskView {
    status: String,
    error: Option<EngineErrorBody>,
}

impl MeilisearchEngine {
    /// Create a new adapter from engine configuration
    pub fn new(config: &EngineConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            poll_interval: Duration::from_millis(config.task_poll_interval_ms.max(1)),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
        })
    }

    /// Override the API key resolved from the environment
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("User-Agent", concat!("search-ab-gateway/", env!("CARGO_PKG_VERSION")));

        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Send a request, turning non-2xx responses into typed errors
    async fn send(&self, request: RequestBuilder) -> SearchResult<Response> {
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    async fn error_from_response(response: Response) -> SearchError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<EngineErrorBody> = serde_json::from_str(&body).ok();

        let (code, message) = match parsed {
            Some(err) => (err.code, err.message),
            None => (String::new(), body),
        };

        // Auth, timeout and throttling are the engine's problem, not the caller's
        let engine_side = matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS
        );

        if code == "index_not_found" {
            SearchError::IndexNotFound(message)
        } else if status.is_client_error() && !engine_side {
            SearchError::EngineRejected {
                code: if code.is_empty() {
                    status.as_u16().to_string()
                } else {
                    code
                },
                message,
            }
        } else {
            let detail = if message.is_empty() {
                "No response body"
            } else {
                message.as_str()
            };
            if code.is_empty() {
                SearchError::EngineUnavailable(format!("engine returned {}: {}", status, detail))
            } else {
                SearchError::EngineUnavailable(format!(
                    "engine returned {} ({}): {}",
                    status, code, detail
                ))
            }
        }
    }

    /// Send an asynchronous operation and wait until the engine has processed it
    async fn enqueue(&self, request: RequestBuilder) -> SearchResult<()> {
        let task: EnqueuedTask = self.send(request).await?.json().await?;
        self.wait_for_task(task.task_uid).await
    }

    async fn wait_for_task(&self, task_uid: u64) -> SearchResult<()> {
        let deadline = Instant::now() + self.task_timeout;

        loop {
            let task: TaskView = self
                .send(self.request(Method::GET, &format!("/tasks/{}", task_uid)))
                .await?
                .json()
                .await?;

            match task.status.as_str() {
                "succeeded" => {
                    debug!(task_uid, "Engine task succeeded");
                    return Ok(());
                }
                "failed" | "canceled" => {
                    let error = task.error.unwrap_or(EngineErrorBody {
                        message: format!("task {} was {}", task_uid, task.status),
                        code: task.status.clone(),
                    });
                    warn!(task_uid, code = %error.code, "Engine task failed");
                    return Err(SearchError::EngineRejected {
                        code: error.code,
                        message: error.message,
                    });
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(SearchError::EngineUnavailable(format!(
                    "task {} did not finish within {:?}",
                    task_uid, self.task_timeout
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl SearchEngine for MeilisearchEngine {
    fn backend_name(&self) -> &'static str {
        "meilisearch"
    }

    async fn create_or_get_index(&self, index_uid: &str, primary_key: &str) -> SearchResult<()> {
        let existing = self
            .send(self.request(Method::GET, &format!("/indexes/{}", index_uid)))
            .await;

        match existing {
            Ok(_) => {
                debug!(index_uid, "Index already exists");
                return Ok(());
            }
            Err(SearchError::IndexNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let created = self
            .enqueue(
                self.request(Method::POST, "/indexes")
                    .json(&json!({ "uid": index_uid, "primaryKey": primary_key })),
            )
            .await;

        match created {
            Ok(()) => {
                info!(index_uid, primary_key, "Index created");
                Ok(())
            }
            // Lost a creation race with another instance
            Err(SearchError::EngineRejected { code, .. }) if code == "index_already_exists" => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn update_settings(&self, index_uid: &str, settings: &IndexSettings) -> SearchResult<()> {
        self.enqueue(
            self.request(Method::PATCH, &format!("/indexes/{}/settings", index_uid))
                .json(settings),
        )
        .await
    }

    async fn add_documents(
        &self,
        index_uid: &str,
        primary_key: &str,
        documents: &[Value],
    ) -> SearchResult<()> {
        self.enqueue(
            self.request(Method::POST, &format!("/indexes/{}/documents", index_uid))
                .query(&[("primaryKey", primary_key)])
                .json(documents),
        )
        .await
    }

    async fn search(&self, index_uid: &str, query: &EngineQuery) -> SearchResult<Value> {
        let response = self
            .send(
                self.request(Method::POST, &format!("/indexes/{}/search", index_uid))
                    .json(query),
            )
            .await?;

        Ok(response.json().await?)
    }

    async fn health(&self) -> SearchResult<()> {
        self.send(self.request(Method::GET, "/health")).await?;
        Ok(())
    }
}
