use biw_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    owner: TokenOwner,
}

#[derive(Debug, Deserialize)]
struct TokenOwner {
    #[serde(default)]
    features: Vec<String>,
}

/// Client for the platform API: the service directory and the token
/// capability lookup. The directory is fetched once per process and cached.
pub struct PlatformClient {
    base_url: String,
    token: String,
    http: Client,
    services: OnceCell<Vec<Service>>,
}

impl PlatformClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: Client::builder()
                .build()
                .map_err(|e| Error::Http(e.to_string()))?,
            services: OnceCell::new(),
        })
    }

    /// Resolve a service endpoint by id against the platform's index.
    pub async fn service_url(&self, service_id: &str) -> Result<String> {
        let services = self.services.get_or_try_init(|| self.fetch_services()).await?;
        find_service(services, service_id)
    }

    /// Feature set of the calling account, used to pick the job backend.
    pub async fn features(&self) -> Result<HashSet<String>> {
        let response = self
            .http
            .get(format!("{}/tokens/verify", self.base_url))
            .header("X-Api-Token", &self.token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "Token verification failed with status {}",
                response.status()
            )));
        }
        let verified = response
            .json::<VerifyResponse>()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(verified.owner.features.into_iter().collect())
    }

    async fn fetch_services(&self) -> Result<Vec<Service>> {
        let response = self
            .http
            .get(format!("{}/index", self.base_url))
            .header("X-Api-Token", &self.token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "Platform index request failed with status {}",
                response.status()
            )));
        }
        let index = response
            .json::<IndexResponse>()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(index.services)
    }
}

/// Pick a service out of a resolved directory. Split out of
/// [`PlatformClient::service_url`] so the match rule stays testable without
/// a live endpoint.
pub(crate) fn find_service(services: &[Service], service_id: &str) -> Result<String> {
    services
        .iter()
        .find(|service| service.id == service_id)
        .map(|service| service.url.trim_end_matches('/').to_string())
        .ok_or_else(|| Error::NotFound(format!("{service_id} service")))
}
