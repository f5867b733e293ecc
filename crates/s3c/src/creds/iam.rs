//! IAM credentials from EC2 instance metadata, ECS task endpoints or IRSA.

use super::sts::{Jwt, STS_VERSION, parse_sts_credentials};
use super::{Credentials, CredentialsCache, Provider, SecretKey};
use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::time::UtcTime;

use serde::Deserialize;
use tracing::debug;
use url::Url;

const IMDS_BASE: &str = "http://169.254.169.254";
const ECS_RELATIVE_BASE: &str = "http://169.254.170.2";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataCredentials {
    #[serde(default)]
    code: Option<String>,
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<String>,
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost" | "127.0.0.1" | "::1" | "[::1]") => true,
        Some(host) => host.starts_with("127."),
        None => false,
    }
}

/// Fetches credentials from the environment the process runs in: IRSA web
/// identity tokens, ECS task roles, or the EC2 instance metadata service.
pub struct IamAwsProvider {
    client: reqwest::Client,
    custom_endpoint: Option<Url>,
    cache: CredentialsCache,
}

impl IamAwsProvider {
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed
    pub fn new(custom_endpoint: Option<Url>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            custom_endpoint,
            cache: CredentialsCache::default(),
        })
    }

    async fn fetch_web_identity(&self, token_file: &str, role_arn: &str) -> Result<Credentials> {
        let token = tokio::fs::read_to_string(token_file).await?;
        let region = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|_| "us-east-1".to_owned());

        let endpoint = match &self.custom_endpoint {
            Some(url) => url.clone(),
            None => Url::parse(&format!("https://sts.{region}.amazonaws.com"))?,
        };

        let jwt = Jwt {
            token: token.trim().to_owned(),
            expiry: 0,
        };
        let mut query = Multimap::new();
        query.add("Action", "AssumeRoleWithWebIdentity");
        query.add("Version", STS_VERSION);
        query.add("WebIdentityToken", jwt.token.clone());
        query.add("RoleArn", role_arn);
        if let Ok(session_name) = std::env::var("AWS_ROLE_SESSION_NAME") {
            query.add("RoleSessionName", session_name);
        }

        let mut url = endpoint;
        url.set_query(Some(&query.to_query_string()));

        debug!(%url, "assume role with web identity");
        let response = self.client.post(url.as_str()).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::invalid_response(format!(
                "web identity request failed with status {status}: {text}"
            )));
        }
        parse_sts_credentials(&text)
    }

    async fn fetch_metadata_url(&self, url: Url) -> Result<Credentials> {
        debug!(%url, "fetch metadata credentials");
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::invalid_response(format!(
                "metadata request failed with status {status}"
            )));
        }

        let parsed: MetadataCredentials = serde_json::from_str(&text)?;
        if let Some(code) = &parsed.code
            && code != "Success"
        {
            return Err(Error::invalid_response(format!("metadata credentials code {code}")));
        }

        let expiration = match parsed.expiration.as_deref() {
            Some(value) => Some(UtcTime::from_iso8601_utc(value)?),
            None => None,
        };
        Ok(Credentials {
            access_key: parsed.access_key_id,
            secret_key: SecretKey::from(parsed.secret_access_key),
            session_token: parsed.token.unwrap_or_default(),
            expiration,
        })
    }

    async fn fetch_imds(&self) -> Result<Credentials> {
        let base = match &self.custom_endpoint {
            Some(url) => url.clone(),
            None => Url::parse(IMDS_BASE)?,
        };

        let list_url = base.join("/latest/meta-data/iam/security-credentials/")?;
        let response = self.client.get(list_url.as_str()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::invalid_response(format!(
                "unable to list IAM roles, status {status}"
            )));
        }
        let role_name = body
            .lines()
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::invalid_response("no IAM role attached to this instance"))?;

        let creds_url = base.join(&format!("/latest/meta-data/iam/security-credentials/{role_name}"))?;
        self.fetch_metadata_url(creds_url).await
    }
}

#[async_trait::async_trait]
impl Provider for IamAwsProvider {
    async fn fetch(&self) -> Result<Credentials> {
        if let Some(creds) = self.cache.get_fresh() {
            return Ok(creds);
        }

        let creds = if let (Ok(token_file), Ok(role_arn)) = (
            std::env::var("AWS_WEB_IDENTITY_TOKEN_FILE"),
            std::env::var("AWS_ROLE_ARN"),
        ) {
            self.fetch_web_identity(&token_file, &role_arn).await?
        } else if let Ok(relative_uri) = std::env::var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI") {
            let url = Url::parse(ECS_RELATIVE_BASE)?.join(&relative_uri)?;
            self.fetch_metadata_url(url).await?
        } else if let Ok(full_uri) = std::env::var("AWS_CONTAINER_CREDENTIALS_FULL_URI") {
            let url = Url::parse(&full_uri)?;
            if !is_loopback_host(&url) {
                return Err(Error::invalid_arg(format!(
                    "{full_uri} is not a loopback address; refusing to fetch credentials from it"
                )));
            }
            self.fetch_metadata_url(url).await?
        } else {
            self.fetch_imds().await?
        };

        self.cache.store(creds.clone());
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts() {
        assert!(is_loopback_host(&Url::parse("http://localhost:8080/creds").unwrap()));
        assert!(is_loopback_host(&Url::parse("http://127.0.0.1/creds").unwrap()));
        assert!(is_loopback_host(&Url::parse("http://127.8.9.1/creds").unwrap()));
        assert!(!is_loopback_host(&Url::parse("http://169.254.170.2/creds").unwrap()));
        assert!(!is_loopback_host(&Url::parse("http://example.com/creds").unwrap()));
    }

    #[test]
    fn metadata_credentials_shape() {
        let json = r#"{
            "Code": "Success",
            "LastUpdated": "2024-01-01T00:00:00Z",
            "Type": "AWS-HMAC",
            "AccessKeyId": "ASIAEXAMPLE",
            "SecretAccessKey": "secret",
            "Token": "token",
            "Expiration": "2030-01-01T00:00:00Z"
        }"#;
        let parsed: MetadataCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.code.as_deref(), Some("Success"));
        assert_eq!(parsed.access_key_id, "ASIAEXAMPLE");
        assert_eq!(parsed.token.as_deref(), Some("token"));
    }
}
