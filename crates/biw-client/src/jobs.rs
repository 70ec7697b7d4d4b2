use crate::PlatformClient;
use async_trait::async_trait;
use biw_core::{CreatedJob, Error, JobQueueApi, JobResult, Result, SyncJobApi};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::sync::Arc;

const JOBS_SERVICE: &str = "jobs";
const RUNNER_SERVICE: &str = "runner";
const QUEUE_SERVICE: &str = "queue";

async fn read_json(response: reqwest::Response, what: &str) -> Result<Value> {
    if !response.status().is_success() {
        return Err(Error::Remote(format!(
            "{what} failed with status {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| Error::Http(e.to_string()))
}

/// Client for the legacy job service, which runs a job to completion within
/// a single request.
pub struct SyncJobClient {
    platform: Arc<PlatformClient>,
    token: String,
    run_id: Option<String>,
    http: Client,
}

impl SyncJobClient {
    pub fn new(platform: Arc<PlatformClient>, token: &str, run_id: Option<&str>) -> Result<Self> {
        Ok(Self {
            platform,
            token: token.to_string(),
            run_id: run_id.map(str::to_string),
            http: Client::builder()
                .build()
                .map_err(|e| Error::Http(e.to_string()))?,
        })
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-Api-Token", &self.token);
        match &self.run_id {
            Some(run_id) => request.header("X-Run-Id", run_id),
            None => request,
        }
    }
}

#[async_trait]
impl SyncJobApi for SyncJobClient {
    async fn run_job(&self, component_id: &str, data: Value) -> Result<JobResult> {
        let base = self.platform.service_url(JOBS_SERVICE).await?;
        let response = self
            .with_headers(self.http.post(format!("{base}/{component_id}/run")))
            .json(&json!({ "configData": data }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let body = read_json(response, "Writer job").await?;
        serde_json::from_value(body).map_err(Error::from)
    }

    async fn run_sync_action(
        &self,
        component_id: &str,
        action: &str,
        data: Value,
    ) -> Result<Value> {
        let base = self.platform.service_url(RUNNER_SERVICE).await?;
        let response = self
            .with_headers(
                self.http
                    .post(format!("{base}/{component_id}/action/{action}")),
            )
            .json(&json!({ "configData": data }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        read_json(response, "Sync action").await
    }
}

/// Client for the queue job service: create a job, then poll it by id.
pub struct QueueClient {
    platform: Arc<PlatformClient>,
    token: String,
    http: Client,
}

impl QueueClient {
    pub fn new(platform: Arc<PlatformClient>, token: &str) -> Result<Self> {
        Ok(Self {
            platform,
            token: token.to_string(),
            http: Client::builder()
                .build()
                .map_err(|e| Error::Http(e.to_string()))?,
        })
    }
}

#[async_trait]
impl JobQueueApi for QueueClient {
    async fn create_job(&self, component_id: &str, data: Value) -> Result<CreatedJob> {
        let base = self.platform.service_url(QUEUE_SERVICE).await?;
        let response = self
            .http
            .post(format!("{base}/jobs"))
            .header("X-Api-Token", &self.token)
            .json(&json!({
                "component": component_id,
                "mode": "run",
                "configData": data,
            }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let body = read_json(response, "Job creation").await?;
        serde_json::from_value(body).map_err(Error::from)
    }

    async fn get_job(&self, id: &str) -> Result<JobResult> {
        let base = self.platform.service_url(QUEUE_SERVICE).await?;
        let response = self
            .http
            .get(format!("{base}/jobs/{id}"))
            .header("X-Api-Token", &self.token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let body = read_json(response, "Job status").await?;
        serde_json::from_value(body).map_err(Error::from)
    }
}
