//! Credentials and credential providers.
//!
//! A [`Provider`] produces a possibly-refreshed [`Credentials`] for every
//! request. Providers that talk to STS or instance metadata cache the last
//! fetched credentials and refresh them shortly before expiry.

mod env;
mod file;
mod iam;
mod sts;

pub use self::env::{EnvAwsProvider, EnvMinioProvider};
pub use self::file::{AwsConfigProvider, MinioClientConfigProvider};
pub use self::iam::IamAwsProvider;
pub use self::sts::{
    AssumeRoleProvider, CertificateIdentityProvider, ClientGrantsProvider, Jwt, JwtFn, LdapIdentityProvider,
    WebIdentityProvider,
};

use crate::error::{Error, Result};
use crate::time::UtcTime;

use std::fmt;
use std::sync::Mutex;

use zeroize::Zeroizing;

/// Expiry skew: credentials are treated as expired this many seconds early.
const EXPIRY_SKEW_SECONDS: i64 = 10;

/// Secret access key. The inner value is zeroized on drop and redacted in
/// debug output.
#[derive(Clone)]
pub struct SecretKey(Zeroizing<String>);

impl SecretKey {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self(Zeroizing::new(value))
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self(Zeroizing::new(value.to_owned()))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// An access/secret key pair with an optional session token and expiry.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: SecretKey,
    pub session_token: String,
    pub expiration: Option<UtcTime>,
}

impl Credentials {
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<SecretKey>, session_token: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: session_token.into(),
            expiration: None,
        }
    }

    /// True when an expiration is set and `now + 10s` has reached it.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expiration {
            Some(expiration) => UtcTime::now().add_seconds(EXPIRY_SKEW_SECONDS) >= expiration,
            None => false,
        }
    }
}

/// Credential provider interface.
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Returns valid credentials, refreshing them if necessary.
    async fn fetch(&self) -> Result<Credentials>;
}

/// Fixed credentials.
#[derive(Debug)]
pub struct StaticProvider {
    creds: Credentials,
}

impl StaticProvider {
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<SecretKey>, session_token: impl Into<String>) -> Self {
        Self {
            creds: Credentials::new(access_key, secret_key, session_token),
        }
    }
}

#[async_trait::async_trait]
impl Provider for StaticProvider {
    async fn fetch(&self) -> Result<Credentials> {
        Ok(self.creds.clone())
    }
}

/// Tries providers in order and sticks with the first one that succeeds
/// until its credentials stop working.
pub struct ChainedProvider {
    providers: Vec<Box<dyn Provider>>,
    active: Mutex<Option<usize>>,
}

impl ChainedProvider {
    #[must_use]
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self {
            providers,
            active: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ChainedProvider {
    async fn fetch(&self) -> Result<Credentials> {
        let preferred = *self.active.lock().expect("chained provider lock");
        if let Some(idx) = preferred
            && let Ok(creds) = self.providers[idx].fetch().await
        {
            return Ok(creds);
        }

        let mut last_err = None;
        for (idx, provider) in self.providers.iter().enumerate() {
            match provider.fetch().await {
                Ok(creds) => {
                    *self.active.lock().expect("chained provider lock") = Some(idx);
                    return Ok(creds);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::invalid_arg("no credential provider in chain")))
    }
}

/// Shared refresh-cache used by the STS and IAM providers.
#[derive(Default)]
pub(crate) struct CredentialsCache {
    inner: Mutex<Option<Credentials>>,
}

impl CredentialsCache {
    pub(crate) fn get_fresh(&self) -> Option<Credentials> {
        let guard = self.inner.lock().expect("credentials cache lock");
        guard.as_ref().filter(|c| !c.is_expired()).cloned()
    }

    pub(crate) fn store(&self, creds: Credentials) {
        *self.inner.lock().expect("credentials cache lock") = Some(creds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_debug_is_redacted() {
        let key = SecretKey::from("super-secret");
        assert_eq!(format!("{key:?}"), "SecretKey(***)");
        assert_eq!(key.expose(), "super-secret");
    }

    #[test]
    fn expiry_skew() {
        let mut creds = Credentials::new("ak", "sk", "");
        assert!(!creds.is_expired());

        creds.expiration = Some(UtcTime::now().add_seconds(5));
        assert!(creds.is_expired());

        creds.expiration = Some(UtcTime::now().add_seconds(3600));
        assert!(!creds.is_expired());
    }

    #[tokio::test]
    async fn static_provider_returns_given_credentials() {
        let provider = StaticProvider::new("ak", "sk", "token");
        let creds = provider.fetch().await.unwrap();
        assert_eq!(creds.access_key, "ak");
        assert_eq!(creds.secret_key.expose(), "sk");
        assert_eq!(creds.session_token, "token");
    }

    #[tokio::test]
    async fn chained_provider_stops_at_first_success() {
        struct Failing;
        #[async_trait::async_trait]
        impl Provider for Failing {
            async fn fetch(&self) -> Result<Credentials> {
                Err(Error::invalid_arg("nope"))
            }
        }

        let chain = ChainedProvider::new(vec![Box::new(Failing), Box::new(StaticProvider::new("ak", "sk", ""))]);
        let creds = chain.fetch().await.unwrap();
        assert_eq!(creds.access_key, "ak");
        // second call goes straight to the cached provider
        let creds = chain.fetch().await.unwrap();
        assert_eq!(creds.access_key, "ak");
    }

    #[tokio::test]
    async fn chained_provider_surfaces_last_error() {
        struct Failing;
        #[async_trait::async_trait]
        impl Provider for Failing {
            async fn fetch(&self) -> Result<Credentials> {
                Err(Error::invalid_arg("nope"))
            }
        }

        let chain = ChainedProvider::new(vec![Box::new(Failing)]);
        assert!(chain.fetch().await.is_err());
    }
}
