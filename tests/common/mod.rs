//! Scripted in-memory implementation of the Platform API for tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use genesys_bulk_client::api::{ApiError, ApiResult, PlatformApi};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Synthetic backend with scripted job states and result pages plus call
/// counters for every interaction the client makes.
pub struct MockPlatform {
    /// Artificial latency for login, to hold a connect in flight
    pub login_delay: Duration,
    /// Make login fail with an authentication error
    pub fail_login: bool,
    /// Make logout fail
    pub fail_logout: bool,

    /// Total users behind the bounded users listing
    pub total_users: usize,
    /// Total queues behind the bounded queues listing
    pub total_queues: usize,
    /// Members behind each queue's membership listing
    pub total_members: usize,

    /// Availability timestamp reported for both export resources
    pub availability: String,
    /// Job states returned by successive status polls (exports); empty means
    /// immediately `FULFILLED`
    pub job_states: Mutex<VecDeque<String>>,
    /// Query states returned by successive status polls (audit); empty means
    /// immediately `Succeeded`
    pub audit_states: Mutex<VecDeque<String>>,
    /// Result bodies returned by successive results calls; empty means a
    /// cursor-less body with an empty record array
    pub result_pages: Mutex<VecDeque<Value>>,

    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    /// Ids passed to deletion calls, in order
    pub deleted_ids: Mutex<Vec<String>>,
    /// Virtual instants at which audit submissions arrived
    pub audit_submit_instants: Mutex<Vec<tokio::time::Instant>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            login_delay: Duration::ZERO,
            fail_login: false,
            fail_logout: false,
            total_users: 0,
            total_queues: 0,
            total_members: 0,
            availability: "2030-01-01T00:00:00.000Z".to_string(),
            job_states: Mutex::new(VecDeque::new()),
            audit_states: Mutex::new(VecDeque::new()),
            result_pages: Mutex::new(VecDeque::new()),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            deleted_ids: Mutex::new(Vec::new()),
            audit_submit_instants: Mutex::new(Vec::new()),
        }
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the status poll sequence for export jobs.
    pub fn script_job_states(&self, states: &[&str]) {
        let mut queue = self.job_states.lock().unwrap();
        queue.clear();
        queue.extend(states.iter().map(|s| s.to_string()));
    }

    /// Script the status poll sequence for audit queries.
    pub fn script_audit_states(&self, states: &[&str]) {
        let mut queue = self.audit_states.lock().unwrap();
        queue.clear();
        queue.extend(states.iter().map(|s| s.to_string()));
    }

    /// Script the bodies returned by successive results calls.
    pub fn script_result_pages(&self, pages: Vec<Value>) {
        let mut queue = self.result_pages.lock().unwrap();
        queue.clear();
        queue.extend(pages);
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Build one page of a bounded listing over `total` synthetic records.
    fn page_body(total: usize, page_number: u32, page_size: u32) -> Value {
        let page_size = page_size as usize;
        let page_count = total.div_ceil(page_size);
        let first = (page_number as usize - 1) * page_size;
        let last = (first + page_size).min(total);
        let entities: Vec<Value> = (first..last.max(first))
            .map(|i| json!({ "id": format!("r-{i}") }))
            .collect();
        json!({ "entities": entities, "pageCount": page_count })
    }

    fn next_job_state(&self) -> String {
        self.job_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "FULFILLED".to_string())
    }

    fn next_audit_state(&self) -> String {
        self.audit_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Succeeded".to_string())
    }

    fn next_result_page(&self, field: &str) -> Value {
        self.result_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({ field: [] }))
    }

    fn record_delete(&self, id: &str) {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deleted_ids.lock().unwrap().push(id.to_string());
    }

    fn submit_body(&self) -> Value {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        json!({ "jobId": format!("job-{n}") })
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn login(&self) -> ApiResult<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }
        if self.fail_login {
            return Err(ApiError::Authentication("bad credentials".to_string()));
        }
        Ok(())
    }

    async fn logout(&self) -> ApiResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout {
            return Err(ApiError::Internal("logout failed".to_string()));
        }
        Ok(())
    }

    async fn users_page(&self, page_number: u32, page_size: u32) -> ApiResult<Value> {
        Ok(Self::page_body(self.total_users, page_number, page_size))
    }

    async fn queues_page(&self, page_number: u32, page_size: u32) -> ApiResult<Value> {
        Ok(Self::page_body(self.total_queues, page_number, page_size))
    }

    async fn queue_members_page(
        &self,
        _queue_id: &str,
        page_number: u32,
        page_size: u32,
    ) -> ApiResult<Value> {
        Ok(Self::page_body(self.total_members, page_number, page_size))
    }

    async fn conversations_availability(&self) -> ApiResult<Value> {
        Ok(json!({ "dataAvailabilityDate": self.availability }))
    }

    async fn submit_conversation_details_job(&self, _interval: &str) -> ApiResult<Value> {
        Ok(self.submit_body())
    }

    async fn conversation_details_job_status(&self, _job_id: &str) -> ApiResult<Value> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "state": self.next_job_state() }))
    }

    async fn conversation_details_job_results(
        &self,
        _job_id: &str,
        _page_size: u32,
        _cursor: Option<&str>,
    ) -> ApiResult<Value> {
        Ok(self.next_result_page("conversations"))
    }

    async fn delete_conversation_details_job(&self, job_id: &str) -> ApiResult<()> {
        self.record_delete(job_id);
        Ok(())
    }

    async fn users_availability(&self) -> ApiResult<Value> {
        Ok(json!({ "dataAvailabilityDate": self.availability }))
    }

    async fn submit_user_details_job(&self, _interval: &str) -> ApiResult<Value> {
        Ok(self.submit_body())
    }

    async fn user_details_job_status(&self, _job_id: &str) -> ApiResult<Value> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "state": self.next_job_state() }))
    }

    async fn user_details_job_results(
        &self,
        _job_id: &str,
        _page_size: u32,
        _cursor: Option<&str>,
    ) -> ApiResult<Value> {
        Ok(self.next_result_page("userDetails"))
    }

    async fn delete_user_details_job(&self, job_id: &str) -> ApiResult<()> {
        self.record_delete(job_id);
        Ok(())
    }

    async fn submit_audit_query(
        &self,
        _interval: &str,
        _service_name: &str,
        _entity_type: Option<&str>,
    ) -> ApiResult<Value> {
        self.audit_submit_instants
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({
            "id": format!("query-{n}"),
            "state": "Queued",
            "startDate": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
    }

    async fn audit_query_status(&self, _query_id: &str) -> ApiResult<Value> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "state": self.next_audit_state() }))
    }

    async fn audit_query_results(
        &self,
        _query_id: &str,
        _page_size: u32,
        _cursor: Option<&str>,
    ) -> ApiResult<Value> {
        Ok(self.next_result_page("entities"))
    }

    async fn delete_audit_query(&self, query_id: &str) -> ApiResult<()> {
        self.record_delete(query_id);
        Ok(())
    }
}

/// A config that passes validation without touching the network.
pub fn test_config() -> genesys_bulk_client::ClientConfig {
    genesys_bulk_client::ClientConfig::new("test-id", "test-secret", "us-east-1").unwrap()
}

/// Construct a client over a mock and connect it.
pub async fn connected_client(
    mock: std::sync::Arc<MockPlatform>,
) -> genesys_bulk_client::Client {
    let client = genesys_bulk_client::Client::with_api(test_config(), mock).unwrap();
    client.connect().await.unwrap();
    client
}
