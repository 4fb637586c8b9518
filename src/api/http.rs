//! `reqwest`-backed implementation of [`PlatformApi`]
//!
//! Handles OAuth client-credentials token acquisition, bearer-token request
//! building, minimum spacing between requests, and retry with exponential
//! backoff on 429/5xx. Business-level errors are never retried here.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ApiError, ApiResult, PlatformApi};
use crate::config::{retry_backoff, ClientConfig};

/// HTTP client for the Platform API
pub struct HttpPlatformApi {
    client: Client,
    api_base: String,
    login_base: String,
    client_id: String,
    client_secret: String,
    request_spacing: std::time::Duration,
    max_retries: u32,
    token: Mutex<Option<String>>,
    last_request: Mutex<Option<Instant>>,
}

impl HttpPlatformApi {
    /// Build a client from a validated [`ClientConfig`].
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.socket_timeout)
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.region.api_base(),
            login_base: config.region.login_base(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            request_spacing: config.request_spacing,
            max_retries: config.max_retries,
            token: Mutex::new(None),
            last_request: Mutex::new(None),
        })
    }

    /// Enforce the minimum spacing between successive HTTP requests.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.request_spacing {
                tokio::time::sleep(self.request_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn bearer(&self) -> ApiResult<String> {
        self.token
            .lock()
            .await
            .clone()
            .ok_or_else(|| ApiError::Authentication("no active session token".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Execute a request, retrying 429 and 5xx responses with exponential
    /// backoff up to the configured budget. 4xx responses other than 429 are
    /// surfaced immediately.
    async fn execute(&self, build: impl Fn() -> RequestBuilder) -> ApiResult<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            self.pace().await;

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        "network error on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_error = Some(ApiError::Internal(e.to_string()));
                    if attempt < self.max_retries {
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!(
                    "transient status {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(ApiError::UnexpectedStatus {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
                if attempt < self.max_retries {
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }
                break;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Authentication(format!("{status}: {body}")));
            }

            if status.is_client_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!("request succeeded on attempt {}", attempt + 1);
            return Ok(response);
        }

        Err(last_error
            .unwrap_or_else(|| ApiError::Internal("all retries exhausted".to_string())))
    }

    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let token = self.bearer().await?;
        let url = self.url(path);
        debug!("{} {} ({} query params)", method, url, query.len());

        let response = self
            .execute(|| {
                let mut req = self
                    .client
                    .request(method.clone(), &url)
                    .bearer_auth(&token)
                    .query(query);
                if let Some(ref b) = body {
                    req = req.json(b);
                }
                req
            })
            .await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::UnexpectedShape(format!("response is not valid JSON: {e}")))
    }

    async fn request_no_body(&self, method: Method, path: &str) -> ApiResult<()> {
        let token = self.bearer().await?;
        let url = self.url(path);
        debug!("{} {}", method, url);

        self.execute(|| {
            self.client
                .request(method.clone(), &url)
                .bearer_auth(&token)
        })
        .await?;
        Ok(())
    }

    fn results_query(page_size: u32, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        query
    }

    fn page_query(page_number: u32, page_size: u32) -> Vec<(&'static str, String)> {
        vec![
            ("pageNumber", page_number.to_string()),
            ("pageSize", page_size.to_string()),
        ]
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformApi {
    async fn login(&self) -> ApiResult<()> {
        let url = format!("{}/oauth/token", self.login_base);
        debug!("acquiring client-credentials token from {}", url);

        let response = self
            .execute(|| {
                self.client
                    .post(&url)
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .form(&[("grant_type", "client_credentials")])
            })
            .await
            .map_err(|e| match e {
                // The login service answers 400 for unknown client ids
                ApiError::UnexpectedStatus { status: 400, body } => {
                    ApiError::IdentityNotFound(body)
                }
                other => other,
            })?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::UnexpectedShape(format!("token response is not JSON: {e}")))?;

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::UnexpectedShape("token response is missing access_token".to_string())
            })?;

        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn logout(&self) -> ApiResult<()> {
        self.request_no_body(Method::DELETE, "/api/v2/tokens/me")
            .await?;
        *self.token.lock().await = None;
        Ok(())
    }

    async fn users_page(&self, page_number: u32, page_size: u32) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            "/api/v2/users",
            &Self::page_query(page_number, page_size),
            None,
        )
        .await
    }

    async fn queues_page(&self, page_number: u32, page_size: u32) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            "/api/v2/routing/queues",
            &Self::page_query(page_number, page_size),
            None,
        )
        .await
    }

    async fn queue_members_page(
        &self,
        queue_id: &str,
        page_number: u32,
        page_size: u32,
    ) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/routing/queues/{queue_id}/members"),
            &Self::page_query(page_number, page_size),
            None,
        )
        .await
    }

    async fn conversations_availability(&self) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            "/api/v2/analytics/conversations/details/jobs/availability",
            &[],
            None,
        )
        .await
    }

    async fn submit_conversation_details_job(&self, interval: &str) -> ApiResult<Value> {
        self.request_json(
            Method::POST,
            "/api/v2/analytics/conversations/details/jobs",
            &[],
            Some(json!({ "interval": interval })),
        )
        .await
    }

    async fn conversation_details_job_status(&self, job_id: &str) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/analytics/conversations/details/jobs/{job_id}"),
            &[],
            None,
        )
        .await
    }

    async fn conversation_details_job_results(
        &self,
        job_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/analytics/conversations/details/jobs/{job_id}/results"),
            &Self::results_query(page_size, cursor),
            None,
        )
        .await
    }

    async fn delete_conversation_details_job(&self, job_id: &str) -> ApiResult<()> {
        self.request_no_body(
            Method::DELETE,
            &format!("/api/v2/analytics/conversations/details/jobs/{job_id}"),
        )
        .await
    }

    async fn users_availability(&self) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            "/api/v2/analytics/users/details/jobs/availability",
            &[],
            None,
        )
        .await
    }

    async fn submit_user_details_job(&self, interval: &str) -> ApiResult<Value> {
        self.request_json(
            Method::POST,
            "/api/v2/analytics/users/details/jobs",
            &[],
            Some(json!({ "interval": interval })),
        )
        .await
    }

    async fn user_details_job_status(&self, job_id: &str) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/analytics/users/details/jobs/{job_id}"),
            &[],
            None,
        )
        .await
    }

    async fn user_details_job_results(
        &self,
        job_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/analytics/users/details/jobs/{job_id}/results"),
            &Self::results_query(page_size, cursor),
            None,
        )
        .await
    }

    async fn delete_user_details_job(&self, job_id: &str) -> ApiResult<()> {
        self.request_no_body(
            Method::DELETE,
            &format!("/api/v2/analytics/users/details/jobs/{job_id}"),
        )
        .await
    }

    async fn submit_audit_query(
        &self,
        interval: &str,
        service_name: &str,
        entity_type: Option<&str>,
    ) -> ApiResult<Value> {
        let mut body = json!({
            "interval": interval,
            "serviceName": service_name,
        });
        if let Some(entity_type) = entity_type {
            body["filters"] = json!([{ "property": "EntityType", "value": entity_type }]);
        }
        self.request_json(Method::POST, "/api/v2/audits/query", &[], Some(body))
            .await
    }

    async fn audit_query_status(&self, query_id: &str) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/audits/query/{query_id}"),
            &[],
            None,
        )
        .await
    }

    async fn audit_query_results(
        &self,
        query_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Value> {
        self.request_json(
            Method::GET,
            &format!("/api/v2/audits/query/{query_id}/results"),
            &Self::results_query(page_size, cursor),
            None,
        )
        .await
    }

    async fn delete_audit_query(&self, query_id: &str) -> ApiResult<()> {
        self.request_no_body(Method::DELETE, &format!("/api/v2/audits/query/{query_id}"))
            .await
    }
}
