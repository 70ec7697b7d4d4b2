use async_trait::async_trait;
use biw_core::{
    AccessToken, BiAuth, ConnectionRegistry, DbConnection, Error, RemoteConnection, Result,
};
use reqwest::{Client, StatusCode};
use tokio::sync::OnceCell;
use tracing::warn;

/// Client for the BI platform API: login plus the connection registry.
/// The access token is obtained on first use and cached for the lifetime of
/// the client.
pub struct BiApiClient {
    base_url: String,
    credentials_id: String,
    secret: String,
    http: Client,
    token: OnceCell<AccessToken>,
}

impl BiApiClient {
    pub fn new(base_url: &str, credentials_id: &str, secret: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials_id: credentials_id.to_string(),
            secret: secret.to_string(),
            http: Client::builder()
                .build()
                .map_err(|e| Error::Http(e.to_string()))?,
            token: OnceCell::new(),
        })
    }

    async fn access_token(&self) -> Result<&str> {
        let token = self.token.get_or_try_init(|| self.request_token()).await?;
        Ok(&token.access_token)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let response = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .form(&[
                ("client_id", self.credentials_id.as_str()),
                ("client_secret", self.secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Could not reach the BI platform at {}: {e}", self.base_url);
                // The transport error is deliberately dropped from the
                // user-facing message, it can echo the submitted secret.
                Error::Authentication("Login to the BI platform failed".to_string())
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::Authentication(
                "Invalid BI credentials".to_string(),
            )),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Err(Error::Authentication(format!(
                    "Invalid BI host \"{}\"",
                    self.base_url
                )))
            }
            status if status.is_success() => response
                .json::<AccessToken>()
                .await
                .map_err(|e| Error::Http(e.to_string())),
            _ => Err(Error::Authentication(
                "Login to the BI platform failed".to_string(),
            )),
        }
    }

    fn connection_url(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("{}/api/connections/{name}", self.base_url),
            None => format!("{}/api/connections", self.base_url),
        }
    }

    async fn read_connection(&self, response: reqwest::Response) -> Result<RemoteConnection> {
        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "BI platform returned {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }
        response
            .json::<RemoteConnection>()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }
}

#[async_trait]
impl BiAuth for BiApiClient {
    async fn login(&self) -> Result<AccessToken> {
        let token = self.token.get_or_try_init(|| self.request_token()).await?;
        Ok(token.clone())
    }
}

#[async_trait]
impl ConnectionRegistry for BiApiClient {
    async fn lookup(&self, name: &str) -> Result<RemoteConnection> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.connection_url(Some(name)))
            .header("Authorization", format!("token {token}"))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Connection \"{name}\"")));
        }
        self.read_connection(response).await
    }

    async fn create(&self, connection: &DbConnection) -> Result<RemoteConnection> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.connection_url(None))
            .header("Authorization", format!("token {token}"))
            .json(connection)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        self.read_connection(response).await
    }

    async fn update(&self, name: &str, connection: &DbConnection) -> Result<RemoteConnection> {
        let token = self.access_token().await?;
        let response = self
            .http
            .patch(self.connection_url(Some(name)))
            .header("Authorization", format!("token {token}"))
            .json(connection)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        self.read_connection(response).await
    }
}
