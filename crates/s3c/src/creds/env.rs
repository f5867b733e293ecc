//! Environment-variable credential providers.

use super::{Credentials, Provider};
use crate::error::{Error, Result};

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::invalid_arg(format!("environment variable {name} is not set")))
}

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
/// `AWS_SESSION_TOKEN`.
#[derive(Debug, Default)]
pub struct EnvAwsProvider;

impl EnvAwsProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Provider for EnvAwsProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let access_key = env_var("AWS_ACCESS_KEY_ID")?;
        let secret_key = env_var("AWS_SECRET_ACCESS_KEY")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").unwrap_or_default();
        Ok(Credentials::new(access_key, secret_key, session_token))
    }
}

/// Reads `MINIO_ACCESS_KEY` and `MINIO_SECRET_KEY`.
#[derive(Debug, Default)]
pub struct EnvMinioProvider;

impl EnvMinioProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Provider for EnvMinioProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let access_key = env_var("MINIO_ACCESS_KEY")?;
        let secret_key = env_var("MINIO_SECRET_KEY")?;
        Ok(Credentials::new(access_key, secret_key, ""))
    }
}
