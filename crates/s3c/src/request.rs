//! Per-call request construction.
//!
//! Sets the mandatory headers in a fixed order, computes the payload hash,
//! and signs when a credential provider is configured. Anonymous requests
//! are still sent, without the SigV4 headers.

use bytes::Bytes;
use http::Method;

use crate::base_url::{BaseUrl, Url};
use crate::creds::Provider;
use crate::error::Result;
use crate::multimap::Multimap;
use crate::signer;
use crate::time::UtcTime;
use crate::transport::HttpRequest;
use crate::utils::{md5sum_base64, sha256_hex};

#[derive(Clone)]
pub(crate) struct S3Request {
    pub method: Method,
    pub region: String,
    pub bucket_name: String,
    pub object_name: String,
    pub headers: Multimap,
    pub query_params: Multimap,
    pub body: Bytes,
}

impl S3Request {
    pub fn new(method: Method, region: impl Into<String>, extra_headers: &Multimap, extra_query_params: &Multimap) -> Self {
        let mut headers = Multimap::new();
        headers.add_all(extra_headers);
        let mut query_params = Multimap::new();
        query_params.add_all(extra_query_params);
        Self {
            method,
            region: region.into(),
            bucket_name: String::new(),
            object_name: String::new(),
            headers,
            query_params,
            body: Bytes::new(),
        }
    }

    async fn build_headers(&mut self, url: &Url, provider: Option<&dyn Provider>, user_agent: &str) -> Result<()> {
        self.headers.add("Host", url.host.clone());
        self.headers.add("User-Agent", user_agent);

        let md5sum_present = self.headers.contains("Content-MD5");
        let mut md5sum = String::new();
        let mut sha256 = String::new();

        if self.method == Method::PUT || self.method == Method::POST {
            self.headers.add("Content-Length", self.body.len().to_string());
            if !self.headers.contains("Content-Type") {
                self.headers.add("Content-Type", "application/octet-stream");
            }
            if provider.is_some() {
                sha256 = sha256_hex(&self.body);
            } else if !md5sum_present {
                md5sum = md5sum_base64(&self.body);
            }
        } else if provider.is_some() {
            sha256 = signer::EMPTY_SHA256.to_owned();
        }

        if !md5sum.is_empty() {
            self.headers.add("Content-MD5", md5sum);
        }
        if !sha256.is_empty() {
            self.headers.add("x-amz-content-sha256", sha256.clone());
        }

        let date = UtcTime::now();
        self.headers.add("x-amz-date", date.to_amz_date()?);

        if let Some(provider) = provider {
            let creds = provider.fetch().await?;
            if !creds.session_token.is_empty() {
                self.headers.add("X-Amz-Security-Token", creds.session_token.clone());
            }
            signer::sign_v4_s3(
                &self.method,
                &url.path,
                &self.region,
                &mut self.headers,
                &self.query_params,
                &creds.access_key,
                creds.secret_key.expose(),
                &sha256,
                date,
            )?;
        }

        Ok(())
    }

    /// Builds the transport request. Returns the request and the URL path
    /// used as the error-report resource.
    pub async fn into_http_request(
        mut self,
        base_url: &BaseUrl,
        provider: Option<&dyn Provider>,
        user_agent: &str,
    ) -> Result<(HttpRequest, String)> {
        let url = base_url.build_url(
            &self.method,
            &self.region,
            &self.query_params,
            &self.bucket_name,
            &self.object_name,
        )?;
        self.build_headers(&url, provider, user_agent).await?;

        let resource = url.path.clone();
        let request = HttpRequest {
            method: self.method,
            url: url.to_string(),
            headers: self.headers,
            body: self.body,
        };
        Ok((request, resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creds::StaticProvider;

    fn base_url() -> BaseUrl {
        BaseUrl::parse("https://play.min.io").unwrap()
    }

    #[tokio::test]
    async fn anonymous_get_has_no_signature_headers() {
        let mut req = S3Request::new(Method::GET, "us-east-1", &Multimap::new(), &Multimap::new());
        req.bucket_name = "bkt".to_owned();
        let (http_req, resource) = req.into_http_request(&base_url(), None, "s3c/0.1.0").await.unwrap();

        assert_eq!(resource, "/bkt");
        assert_eq!(http_req.headers.get_front("Host"), Some("play.min.io"));
        assert_eq!(http_req.headers.get_front("User-Agent"), Some("s3c/0.1.0"));
        assert!(http_req.headers.contains("x-amz-date"));
        assert!(!http_req.headers.contains("Authorization"));
        assert!(!http_req.headers.contains("x-amz-content-sha256"));
    }

    #[tokio::test]
    async fn signed_get_carries_mandatory_headers() {
        let provider = StaticProvider::new("ak", "sk", "");
        let mut req = S3Request::new(Method::GET, "us-east-1", &Multimap::new(), &Multimap::new());
        req.bucket_name = "bkt".to_owned();
        req.object_name = "obj".to_owned();
        let (http_req, _) = req
            .into_http_request(&base_url(), Some(&provider), "s3c/0.1.0")
            .await
            .unwrap();

        assert_eq!(
            http_req.headers.get_front("x-amz-content-sha256"),
            Some(signer::EMPTY_SHA256)
        );
        assert!(http_req.headers.contains("Authorization"));
        assert!(http_req.headers.contains("x-amz-date"));
        let authorization = http_req.headers.get_front("Authorization").unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=ak/"));
        assert!(authorization.contains("SignedHeaders="));
    }

    #[tokio::test]
    async fn session_token_is_signed_in() {
        let provider = StaticProvider::new("ak", "sk", "token");
        let mut req = S3Request::new(Method::GET, "us-east-1", &Multimap::new(), &Multimap::new());
        req.bucket_name = "bkt".to_owned();
        let (http_req, _) = req
            .into_http_request(&base_url(), Some(&provider), "s3c/0.1.0")
            .await
            .unwrap();

        assert_eq!(http_req.headers.get_front("X-Amz-Security-Token"), Some("token"));
        let authorization = http_req.headers.get_front("Authorization").unwrap();
        assert!(authorization.contains("x-amz-security-token"));
    }

    #[tokio::test]
    async fn signed_put_hashes_body() {
        let provider = StaticProvider::new("ak", "sk", "");
        let mut req = S3Request::new(Method::PUT, "us-east-1", &Multimap::new(), &Multimap::new());
        req.bucket_name = "bkt".to_owned();
        req.object_name = "obj".to_owned();
        req.body = Bytes::from_static(b"hello");
        let (http_req, _) = req
            .into_http_request(&base_url(), Some(&provider), "s3c/0.1.0")
            .await
            .unwrap();

        assert_eq!(http_req.headers.get_front("Content-Length"), Some("5"));
        assert_eq!(http_req.headers.get_front("Content-Type"), Some("application/octet-stream"));
        assert_eq!(
            http_req.headers.get_front("x-amz-content-sha256").unwrap(),
            sha256_hex(b"hello")
        );
        assert!(!http_req.headers.contains("Content-MD5"));
    }

    #[tokio::test]
    async fn anonymous_put_gets_content_md5() {
        let mut req = S3Request::new(Method::PUT, "us-east-1", &Multimap::new(), &Multimap::new());
        req.bucket_name = "bkt".to_owned();
        req.object_name = "obj".to_owned();
        req.body = Bytes::from_static(b"hello");
        let (http_req, _) = req.into_http_request(&base_url(), None, "s3c/0.1.0").await.unwrap();

        assert_eq!(http_req.headers.get_front("Content-MD5").unwrap(), md5sum_base64(b"hello"));
        assert!(!http_req.headers.contains("x-amz-content-sha256"));
    }
}
