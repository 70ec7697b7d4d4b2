use crate::{AccessToken, DbConnection, RemoteConnection, Result};
use async_trait::async_trait;

/// Authentication boundary of the BI platform.
#[async_trait]
pub trait BiAuth: Send + Sync {
    /// Obtain an API access token. Implementations cache the token for the
    /// lifetime of the process.
    async fn login(&self) -> Result<AccessToken>;
}

/// Connection registry at the BI platform, keyed by connection name.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Look up a connection by name. An absent connection is reported as
    /// `Error::NotFound`, any other failure is fatal.
    async fn lookup(&self, name: &str) -> Result<RemoteConnection>;

    /// Register a new connection.
    async fn create(&self, connection: &DbConnection) -> Result<RemoteConnection>;

    /// Replace an existing connection wholesale.
    async fn update(&self, name: &str, connection: &DbConnection) -> Result<RemoteConnection>;
}
