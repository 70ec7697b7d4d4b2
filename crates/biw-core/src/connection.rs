use serde::{Deserialize, Serialize};

/// Bearer token returned by the BI platform's login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Desired state of a database connection record at the BI platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConnection {
    pub name: String,

    pub dialect_name: String,

    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Base64 service-account certificate, BigQuery only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    pub database: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jdbc_additional_params: Option<String>,

    /// Scratch schema for the BI tool's derived-table cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_db_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdt_context_override: Option<DbConnectionOverride>,
}

/// Alternate connection profile attached under the BI tool's derived-table
/// context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConnectionOverride {
    pub context: String,
    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub jdbc_additional_params: String,
}

/// Connection resource as reported back by the BI platform.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConnection {
    pub name: String,

    #[serde(default)]
    pub dialect_name: Option<String>,
}
