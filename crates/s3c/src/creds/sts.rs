//! STS-backed credential providers.
//!
//! `AssumeRole` is a signed POST carrying a form body; the MinIO STS
//! extensions (web identity, client grants, LDAP, certificate) are
//! unauthenticated POSTs carrying their parameters in the query string.

use super::{Credentials, CredentialsCache, Provider, SecretKey};
use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::signer;
use crate::time::UtcTime;
use crate::utils::sha256_hex;

use std::sync::Arc;

use http::Method;
use tracing::debug;
use url::Url;

pub(crate) const STS_VERSION: &str = "2011-06-15";

const DEFAULT_DURATION_SECONDS: u32 = 60 * 60 * 24; // 1 day
const MIN_DURATION_SECONDS: u32 = 60 * 15; // 15 minutes
const MAX_DURATION_SECONDS: u32 = 60 * 60 * 24 * 7; // 7 days

/// A JSON web token with its advertised expiry in seconds.
#[derive(Debug, Clone, Default)]
pub struct Jwt {
    pub token: String,
    pub expiry: u32,
}

/// Callback producing a fresh JWT for each STS exchange.
pub type JwtFn = Arc<dyn Fn() -> Result<Jwt> + Send + Sync>;

fn clamp_duration(duration_seconds: u32, jwt_expiry: u32) -> u32 {
    let mut duration = if duration_seconds > 0 { duration_seconds } else { jwt_expiry };
    if duration == 0 {
        duration = DEFAULT_DURATION_SECONDS;
    }
    duration.clamp(MIN_DURATION_SECONDS, MAX_DURATION_SECONDS)
}

fn host_header_value(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_arg("STS endpoint must have a host"))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Extracts `<Credentials>` fields from any `AssumeRole*` response
/// document.
pub(crate) fn parse_sts_credentials(xml: &str) -> Result<Credentials> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current = String::new();
    let mut access_key = String::new();
    let mut secret_key = String::new();
    let mut session_token = String::new();
    let mut expiration = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = String::from_utf8_lossy(e.name().as_ref()).into_owned();
            }
            Ok(Event::Text(t)) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                match current.as_str() {
                    "AccessKeyId" => access_key = text,
                    "SecretAccessKey" => secret_key = text,
                    "SessionToken" => session_token = text,
                    "Expiration" => expiration = Some(UtcTime::from_iso8601_utc(&text)?),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::invalid_response(format!("unable to parse STS response: {e}"))),
        }
    }

    if access_key.is_empty() || secret_key.is_empty() {
        return Err(Error::invalid_response("STS response carries no credentials"));
    }

    Ok(Credentials {
        access_key,
        secret_key: SecretKey::from(secret_key),
        session_token,
        expiration,
    })
}

async fn post_sts(client: &reqwest::Client, url: Url, body: String, headers: Multimap) -> Result<Credentials> {
    let mut request = client.post(url.as_str());
    for (name, value) in &headers {
        request = request.header(name, value);
    }
    let response = request.body(body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(Error::invalid_response(format!(
            "STS request failed with status {status}: {text}"
        )));
    }
    parse_sts_credentials(&text)
}

/// Classic `AssumeRole` against an STS endpoint, signed with the given
/// access/secret key.
pub struct AssumeRoleProvider {
    client: reqwest::Client,
    sts_endpoint: Url,
    access_key: String,
    secret_key: SecretKey,
    region: String,
    body: String,
    content_sha256: String,
    cache: CredentialsCache,
}

impl AssumeRoleProvider {
    /// # Errors
    /// Returns an error for an invalid endpoint URL
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sts_endpoint: &str,
        access_key: impl Into<String>,
        secret_key: impl Into<SecretKey>,
        duration_seconds: Option<u32>,
        policy: Option<String>,
        region: Option<String>,
        role_arn: Option<String>,
        role_session_name: Option<String>,
        external_id: Option<String>,
    ) -> Result<Self> {
        let sts_endpoint = Url::parse(sts_endpoint)?;

        let duration = clamp_duration(duration_seconds.unwrap_or(0), 0);
        let mut fields: Vec<(&str, String)> = vec![
            ("Action", "AssumeRole".to_owned()),
            ("Version", STS_VERSION.to_owned()),
            ("DurationSeconds", duration.to_string()),
        ];
        if let Some(role_arn) = role_arn.filter(|s| !s.is_empty()) {
            fields.push(("RoleArn", role_arn));
        }
        if let Some(name) = role_session_name.filter(|s| !s.is_empty()) {
            fields.push(("RoleSessionName", name));
        }
        if let Some(policy) = policy.filter(|s| !s.is_empty()) {
            fields.push(("Policy", policy));
        }
        if let Some(external_id) = external_id.filter(|s| !s.is_empty()) {
            fields.push(("ExternalId", external_id));
        }
        let body = serde_urlencoded::to_string(&fields)
            .map_err(|e| Error::invalid_arg(format!("unable to encode AssumeRole body: {e}")))?;
        let content_sha256 = sha256_hex(body.as_bytes());

        Ok(Self {
            client: reqwest::Client::new(),
            sts_endpoint,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.unwrap_or_default(),
            body,
            content_sha256,
            cache: CredentialsCache::default(),
        })
    }
}

#[async_trait::async_trait]
impl Provider for AssumeRoleProvider {
    async fn fetch(&self) -> Result<Credentials> {
        if let Some(creds) = self.cache.get_fresh() {
            return Ok(creds);
        }

        let date = UtcTime::now();
        let host = host_header_value(&self.sts_endpoint)?;
        let path = self.sts_endpoint.path().to_owned();

        let mut headers = Multimap::new();
        headers.add("Host", host);
        headers.add("Content-Type", "application/x-www-form-urlencoded");
        headers.add("x-amz-content-sha256", self.content_sha256.clone());
        headers.add("x-amz-date", date.to_amz_date()?);

        signer::sign_v4_sts(
            &Method::POST,
            &path,
            &self.region,
            &mut headers,
            &Multimap::new(),
            &self.access_key,
            self.secret_key.expose(),
            &self.content_sha256,
            date,
        )?;

        debug!(endpoint = %self.sts_endpoint, "assume role");
        let creds = post_sts(&self.client, self.sts_endpoint.clone(), self.body.clone(), headers).await?;
        self.cache.store(creds.clone());
        Ok(creds)
    }
}

/// Common implementation of the unauthenticated MinIO STS exchanges.
struct StsQueryProvider {
    client: reqwest::Client,
    sts_endpoint: Url,
    cache: CredentialsCache,
}

impl StsQueryProvider {
    async fn exchange(&self, query: &Multimap) -> Result<Credentials> {
        if let Some(creds) = self.cache.get_fresh() {
            return Ok(creds);
        }
        let mut url = self.sts_endpoint.clone();
        url.set_query(Some(&query.to_query_string()));
        let creds = post_sts(&self.client, url, String::new(), Multimap::new()).await?;
        self.cache.store(creds.clone());
        Ok(creds)
    }
}

fn identity_query(
    action: &str,
    token_field: &str,
    jwt: &Jwt,
    duration_seconds: u32,
    policy: Option<&str>,
    role_arn: Option<&str>,
    role_session_name: Option<&str>,
) -> Multimap {
    let mut query = Multimap::new();
    query.add("Action", action);
    query.add("Version", STS_VERSION);
    query.add("DurationSeconds", clamp_duration(duration_seconds, jwt.expiry).to_string());
    query.add(token_field, jwt.token.clone());
    if let Some(policy) = policy.filter(|s| !s.is_empty()) {
        query.add("Policy", policy);
    }
    if let Some(role_arn) = role_arn.filter(|s| !s.is_empty()) {
        query.add("RoleArn", role_arn);
    }
    if let Some(name) = role_session_name.filter(|s| !s.is_empty()) {
        query.add("RoleSessionName", name);
    }
    query
}

/// `AssumeRoleWithWebIdentity` with a caller-supplied JWT callback.
pub struct WebIdentityProvider {
    inner: StsQueryProvider,
    jwt_fn: JwtFn,
    duration_seconds: u32,
    policy: Option<String>,
    role_arn: Option<String>,
    role_session_name: Option<String>,
}

impl WebIdentityProvider {
    /// # Errors
    /// Returns an error for an invalid endpoint URL
    pub fn new(
        jwt_fn: JwtFn,
        sts_endpoint: &str,
        duration_seconds: Option<u32>,
        policy: Option<String>,
        role_arn: Option<String>,
        role_session_name: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            inner: StsQueryProvider {
                client: reqwest::Client::new(),
                sts_endpoint: Url::parse(sts_endpoint)?,
                cache: CredentialsCache::default(),
            },
            jwt_fn,
            duration_seconds: duration_seconds.unwrap_or(0),
            policy,
            role_arn,
            role_session_name,
        })
    }
}

#[async_trait::async_trait]
impl Provider for WebIdentityProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let jwt = (self.jwt_fn)()?;
        let query = identity_query(
            "AssumeRoleWithWebIdentity",
            "WebIdentityToken",
            &jwt,
            self.duration_seconds,
            self.policy.as_deref(),
            self.role_arn.as_deref(),
            self.role_session_name.as_deref(),
        );
        self.inner.exchange(&query).await
    }
}

/// `AssumeRoleWithClientGrants` with a caller-supplied JWT callback.
pub struct ClientGrantsProvider {
    inner: StsQueryProvider,
    jwt_fn: JwtFn,
    duration_seconds: u32,
    policy: Option<String>,
}

impl ClientGrantsProvider {
    /// # Errors
    /// Returns an error for an invalid endpoint URL
    pub fn new(jwt_fn: JwtFn, sts_endpoint: &str, duration_seconds: Option<u32>, policy: Option<String>) -> Result<Self> {
        Ok(Self {
            inner: StsQueryProvider {
                client: reqwest::Client::new(),
                sts_endpoint: Url::parse(sts_endpoint)?,
                cache: CredentialsCache::default(),
            },
            jwt_fn,
            duration_seconds: duration_seconds.unwrap_or(0),
            policy,
        })
    }
}

#[async_trait::async_trait]
impl Provider for ClientGrantsProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let jwt = (self.jwt_fn)()?;
        let query = identity_query(
            "AssumeRoleWithClientGrants",
            "Token",
            &jwt,
            self.duration_seconds,
            self.policy.as_deref(),
            None,
            None,
        );
        self.inner.exchange(&query).await
    }
}

/// `AssumeRoleWithLDAPIdentity`.
pub struct LdapIdentityProvider {
    inner: StsQueryProvider,
    username: String,
    password: String,
}

impl LdapIdentityProvider {
    /// # Errors
    /// Returns an error for an invalid endpoint URL
    pub fn new(sts_endpoint: &str, ldap_username: impl Into<String>, ldap_password: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: StsQueryProvider {
                client: reqwest::Client::new(),
                sts_endpoint: Url::parse(sts_endpoint)?,
                cache: CredentialsCache::default(),
            },
            username: ldap_username.into(),
            password: ldap_password.into(),
        })
    }
}

#[async_trait::async_trait]
impl Provider for LdapIdentityProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let mut query = Multimap::new();
        query.add("Action", "AssumeRoleWithLDAPIdentity");
        query.add("Version", STS_VERSION);
        query.add("LDAPUsername", self.username.clone());
        query.add("LDAPPassword", self.password.clone());
        self.inner.exchange(&query).await
    }
}

/// `AssumeRoleWithCertificate` over mTLS.
pub struct CertificateIdentityProvider {
    inner: StsQueryProvider,
    duration_seconds: u32,
}

impl CertificateIdentityProvider {
    /// # Errors
    /// Returns an error for an invalid or non-HTTPS endpoint, or unreadable
    /// key/cert files
    pub fn new(
        sts_endpoint: &str,
        key_file: &std::path::Path,
        cert_file: &std::path::Path,
        ssl_cert_file: Option<&std::path::Path>,
        duration_seconds: Option<u32>,
    ) -> Result<Self> {
        let sts_endpoint = Url::parse(sts_endpoint)?;
        if sts_endpoint.scheme() != "https" {
            return Err(Error::invalid_arg("sts endpoint scheme must be HTTPS"));
        }

        let mut pem = std::fs::read(cert_file)?;
        pem.extend_from_slice(&std::fs::read(key_file)?);
        let identity = reqwest::Identity::from_pem(&pem)?;

        let mut builder = reqwest::Client::builder().identity(identity);
        if let Some(ca) = ssl_cert_file {
            let cert = reqwest::Certificate::from_pem(&std::fs::read(ca)?)?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            inner: StsQueryProvider {
                client: builder.build()?,
                sts_endpoint,
                cache: CredentialsCache::default(),
            },
            duration_seconds: duration_seconds.unwrap_or(0),
        })
    }
}

#[async_trait::async_trait]
impl Provider for CertificateIdentityProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let mut query = Multimap::new();
        query.add("Action", "AssumeRoleWithCertificate");
        query.add("Version", STS_VERSION);
        query.add("DurationSeconds", clamp_duration(self.duration_seconds, 0).to_string());
        self.inner.exchange(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_clamping() {
        assert_eq!(clamp_duration(0, 0), DEFAULT_DURATION_SECONDS);
        assert_eq!(clamp_duration(0, 3600), 3600);
        assert_eq!(clamp_duration(60, 0), MIN_DURATION_SECONDS);
        assert_eq!(clamp_duration(MAX_DURATION_SECONDS + 1, 0), MAX_DURATION_SECONDS);
    }

    #[test]
    fn parses_assume_role_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASIAEXAMPLE</AccessKeyId>
      <SecretAccessKey>secret</SecretAccessKey>
      <SessionToken>token</SessionToken>
      <Expiration>2030-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#;
        let creds = parse_sts_credentials(xml).unwrap();
        assert_eq!(creds.access_key, "ASIAEXAMPLE");
        assert_eq!(creds.secret_key.expose(), "secret");
        assert_eq!(creds.session_token, "token");
        assert!(creds.expiration.is_some());
        assert!(!creds.is_expired());
    }

    #[test]
    fn parses_web_identity_response() {
        let xml = "<AssumeRoleWithWebIdentityResponse><AssumeRoleWithWebIdentityResult><Credentials>\
                   <AccessKeyId>AK</AccessKeyId><SecretAccessKey>SK</SecretAccessKey>\
                   <SessionToken>ST</SessionToken></Credentials>\
                   </AssumeRoleWithWebIdentityResult></AssumeRoleWithWebIdentityResponse>";
        let creds = parse_sts_credentials(xml).unwrap();
        assert_eq!(creds.access_key, "AK");
        assert!(creds.expiration.is_none());
    }

    #[test]
    fn rejects_response_without_credentials() {
        assert!(parse_sts_credentials("<AssumeRoleResponse/>").is_err());
    }

    #[test]
    fn identity_query_fields() {
        let jwt = Jwt {
            token: "jwt-token".to_owned(),
            expiry: 3600,
        };
        let query = identity_query(
            "AssumeRoleWithWebIdentity",
            "WebIdentityToken",
            &jwt,
            0,
            None,
            Some("arn:aws:iam::123:role/x"),
            None,
        );
        assert_eq!(query.get_front("Action"), Some("AssumeRoleWithWebIdentity"));
        assert_eq!(query.get_front("WebIdentityToken"), Some("jwt-token"));
        assert_eq!(query.get_front("DurationSeconds"), Some("3600"));
        assert_eq!(query.get_front("RoleArn"), Some("arn:aws:iam::123:role/x"));
        assert!(!query.contains("Policy"));
    }
}
