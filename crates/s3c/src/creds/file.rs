//! Config-file credential providers.

use super::{Credentials, Provider};
use crate::error::{Error, Result};
use crate::utils::home_dir;

use std::collections::HashMap;
use std::path::PathBuf;

/// Parses the INI subset used by `~/.aws/credentials`: `[section]` lines
/// and `key = value` pairs, `#`/`;` comments.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            current = line[1..line.len() - 1].trim().to_owned();
            sections.entry(current.clone()).or_default();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }
    sections
}

/// Reads a profile from an AWS shared-credentials file.
#[derive(Debug)]
pub struct AwsConfigProvider {
    filename: PathBuf,
    profile: String,
}

impl AwsConfigProvider {
    /// Uses `~/.aws/credentials` and the `AWS_PROFILE`/`default` profile
    /// when `filename`/`profile` are `None`.
    ///
    /// # Errors
    /// Returns an error if no filename is given and the home directory
    /// cannot be determined
    pub fn new(filename: Option<PathBuf>, profile: Option<String>) -> Result<Self> {
        let filename = match filename {
            Some(f) => f,
            None => match std::env::var_os("AWS_SHARED_CREDENTIALS_FILE") {
                Some(f) => PathBuf::from(f),
                None => home_dir()
                    .ok_or_else(|| Error::invalid_arg("unable to determine home directory"))?
                    .join(".aws")
                    .join("credentials"),
            },
        };
        let profile = profile
            .or_else(|| std::env::var("AWS_PROFILE").ok())
            .unwrap_or_else(|| "default".to_owned());
        Ok(Self { filename, profile })
    }
}

#[async_trait::async_trait]
impl Provider for AwsConfigProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let content = tokio::fs::read_to_string(&self.filename).await?;
        let sections = parse_ini(&content);
        let section = sections
            .get(&self.profile)
            .ok_or_else(|| Error::invalid_arg(format!("profile {} not found in {}", self.profile, self.filename.display())))?;

        let access_key = section
            .get("aws_access_key_id")
            .ok_or_else(|| Error::invalid_arg(format!("aws_access_key_id missing in profile {}", self.profile)))?;
        let secret_key = section
            .get("aws_secret_access_key")
            .ok_or_else(|| Error::invalid_arg(format!("aws_secret_access_key missing in profile {}", self.profile)))?;
        let session_token = section.get("aws_session_token").cloned().unwrap_or_default();

        Ok(Credentials::new(access_key.clone(), secret_key.clone(), session_token))
    }
}

/// Reads an alias from the MinIO client configuration (`~/.mc/config.json`).
#[derive(Debug)]
pub struct MinioClientConfigProvider {
    filename: PathBuf,
    alias: String,
}

impl MinioClientConfigProvider {
    /// Uses `~/.mc/config.json` and the `MINIO_ALIAS`/`s3` alias when
    /// `filename`/`alias` are `None`.
    ///
    /// # Errors
    /// Returns an error if no filename is given and the home directory
    /// cannot be determined
    pub fn new(filename: Option<PathBuf>, alias: Option<String>) -> Result<Self> {
        let filename = match filename {
            Some(f) => f,
            None => home_dir()
                .ok_or_else(|| Error::invalid_arg("unable to determine home directory"))?
                .join(".mc")
                .join("config.json"),
        };
        let alias = alias
            .or_else(|| std::env::var("MINIO_ALIAS").ok())
            .unwrap_or_else(|| "s3".to_owned());
        Ok(Self { filename, alias })
    }
}

#[async_trait::async_trait]
impl Provider for MinioClientConfigProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let content = tokio::fs::read_to_string(&self.filename).await?;
        let config: serde_json::Value = serde_json::from_str(&content)?;

        // "aliases" in current versions of mc, "hosts" in older ones.
        let entry = ["aliases", "hosts"]
            .iter()
            .find_map(|key| config.get(key).and_then(|m| m.get(&self.alias)))
            .ok_or_else(|| {
                Error::invalid_arg(format!("alias {} not found in {}", self.alias, self.filename.display()))
            })?;

        let access_key = entry.get("accessKey").and_then(|v| v.as_str()).unwrap_or_default();
        let secret_key = entry.get("secretKey").and_then(|v| v.as_str()).unwrap_or_default();
        if access_key.is_empty() || secret_key.is_empty() {
            return Err(Error::invalid_arg(format!(
                "alias {} has no access/secret key in {}",
                self.alias,
                self.filename.display()
            )));
        }

        Ok(Credentials::new(access_key, secret_key, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ini_sections_and_comments() {
        let content = "\n# comment\n[default]\naws_access_key_id = AKID\naws_secret_access_key=SECRET\n; other\n[dev]\naws_access_key_id = DEV\n";
        let sections = parse_ini(content);
        assert_eq!(sections["default"]["aws_access_key_id"], "AKID");
        assert_eq!(sections["default"]["aws_secret_access_key"], "SECRET");
        assert_eq!(sections["dev"]["aws_access_key_id"], "DEV");
    }

    #[tokio::test]
    async fn aws_config_reads_profile() {
        let dir = std::env::temp_dir().join("s3c-test-aws-config");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("credentials");
        tokio::fs::write(&path, "[default]\naws_access_key_id = AKID\naws_secret_access_key = SECRET\n")
            .await
            .unwrap();

        let provider = AwsConfigProvider::new(Some(path), None).unwrap();
        let creds = provider.fetch().await.unwrap();
        assert_eq!(creds.access_key, "AKID");
        assert_eq!(creds.secret_key.expose(), "SECRET");
    }

    #[tokio::test]
    async fn mc_config_reads_alias() {
        let dir = std::env::temp_dir().join("s3c-test-mc-config");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("config.json");
        tokio::fs::write(
            &path,
            r#"{"version":"10","aliases":{"play":{"url":"https://play.min.io","accessKey":"AK","secretKey":"SK"}}}"#,
        )
        .await
        .unwrap();

        let provider = MinioClientConfigProvider::new(Some(path), Some("play".to_owned())).unwrap();
        let creds = provider.fetch().await.unwrap();
        assert_eq!(creds.access_key, "AK");
        assert_eq!(creds.secret_key.expose(), "SK");
    }
}
