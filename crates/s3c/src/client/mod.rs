//! S3 client: one method per S3 API plus the high-level orchestration.
//!
//! Every operation validates its arguments, resolves the bucket region
//! (configured region, cache, or `GetBucketLocation`), builds and signs the
//! request, executes it, and maps failures per the status-code table. A
//! HEAD that fails with 400 while a fresh region is known is retried
//! exactly once; the retry decision never escapes this module.

mod bucket;
mod compose;
mod download;
mod list;
mod multipart;
mod object;
mod put;
mod remove;

pub use self::list::ListObjects;
pub use self::remove::RemoveObjects;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use tracing::debug;

use crate::base_url::BaseUrl;
use crate::creds::Provider;
use crate::error::{Error, Result, S3ServerError};
use crate::multimap::Multimap;
use crate::request::S3Request;
use crate::response::parse_location_constraint;
use crate::transport::{DataFn, HttpResponse, Transport, TransportConfig};

const DEFAULT_USER_AGENT: &str = concat!("s3c/", env!("CARGO_PKG_VERSION"));

/// Outcome of a single execution attempt. `RetryHead` is internal: it is
/// consumed by the retry loop and never surfaces to callers.
enum ExecError {
    RetryHead(HttpResponse),
    Other(Error),
}

impl From<Error> for ExecError {
    fn from(err: Error) -> Self {
        Self::Other(err)
    }
}

/// Configures and builds a [`Client`].
pub struct ClientBuilder {
    endpoint: String,
    region: Option<String>,
    provider: Option<Arc<dyn Provider>>,
    transport: TransportConfig,
}

impl ClientBuilder {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: None,
            provider: None,
            transport: TransportConfig::default(),
        }
    }

    /// Default region for every request.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Credential provider; omit for anonymous access.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Verbose transport logging.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.transport.debug = debug;
        self
    }

    /// Disables TLS peer verification.
    #[must_use]
    pub fn ignore_cert_check(mut self, ignore: bool) -> Self {
        self.transport.ignore_cert_check = ignore;
        self
    }

    /// CA bundle for TLS verification.
    #[must_use]
    pub fn ssl_cert_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.transport.ssl_cert_file = Some(path.into());
        self
    }

    /// # Errors
    /// Returns an error for an invalid endpoint or unusable TLS settings
    pub fn build(self) -> Result<Client> {
        let mut base_url = BaseUrl::parse(&self.endpoint)?;
        if let Some(region) = self.region {
            base_url.region = region;
        }
        Ok(Client {
            base_url,
            provider: self.provider,
            transport: Transport::new(&self.transport)?,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            region_cache: Mutex::new(HashMap::new()),
        })
    }
}

/// An S3 / S3-compatible service client.
pub struct Client {
    base_url: BaseUrl,
    provider: Option<Arc<dyn Provider>>,
    transport: Transport,
    user_agent: String,
    region_cache: Mutex<HashMap<String, String>>,
}

impl Client {
    /// # Errors
    /// Returns an error for an invalid endpoint
    pub fn new(endpoint: &str, provider: Option<Arc<dyn Provider>>) -> Result<Self> {
        let mut builder = ClientBuilder::new(endpoint);
        if let Some(provider) = provider {
            builder = builder.provider(provider);
        }
        builder.build()
    }

    #[must_use]
    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub(crate) fn provider(&self) -> Option<&dyn Provider> {
        self.provider.as_deref()
    }

    /// Appends ` <name>/<version>` to the default user agent.
    ///
    /// # Errors
    /// Returns an error when name or version is empty
    pub fn set_app_info(&mut self, app_name: &str, app_version: &str) -> Result<()> {
        if app_name.is_empty() || app_version.is_empty() {
            return Err(Error::invalid_arg("Application name/version cannot be empty"));
        }
        self.user_agent = format!("{DEFAULT_USER_AGENT} {app_name}/{app_version}");
        Ok(())
    }

    /// Total bytes uploaded by this client.
    #[must_use]
    pub fn uploaded_size(&self) -> u64 {
        self.transport.uploaded_size()
    }

    /// Upload throughput of the most recent transfer, in bytes per second.
    #[must_use]
    pub fn upload_speed(&self) -> u64 {
        self.transport.upload_speed()
    }

    pub(crate) fn new_request(
        &self,
        method: Method,
        region: impl Into<String>,
        extra_headers: &Multimap,
        extra_query_params: &Multimap,
    ) -> S3Request {
        S3Request::new(method, region, extra_headers, extra_query_params)
    }

    fn cached_region(&self, bucket_name: &str) -> Option<String> {
        self.region_cache.lock().expect("region cache lock").get(bucket_name).cloned()
    }

    fn store_region(&self, bucket_name: &str, region: &str) {
        self.region_cache
            .lock()
            .expect("region cache lock")
            .insert(bucket_name.to_owned(), region.to_owned());
    }

    fn evict_region(&self, bucket_name: &str) {
        self.region_cache.lock().expect("region cache lock").remove(bucket_name);
    }

    /// Redirect classification for 301/307/400. With `retry` set, a HEAD
    /// with a known fresh region collapses into the internal retry signal.
    fn redirect_code(
        &self,
        status_code: StatusCode,
        method: &Method,
        headers: &Multimap,
        bucket_name: &str,
        retry: bool,
    ) -> (String, String) {
        let (code, message) = match status_code.as_u16() {
            301 => ("PermanentRedirect", "Moved Permanently"),
            307 => ("Redirect", "Temporary redirect"),
            400 => ("BadRequest", "Bad request"),
            _ => ("", ""),
        };
        let mut code = code.to_owned();
        let mut message = message.to_owned();

        let region = headers.get_front("x-amz-bucket-region").unwrap_or_default();
        if !message.is_empty() && !region.is_empty() {
            message = format!("{message}; use region {region}");
        }

        if retry
            && !region.is_empty()
            && *method == Method::HEAD
            && !bucket_name.is_empty()
            && self.cached_region(bucket_name).is_some()
        {
            return ("RetryHead".to_owned(), String::new());
        }

        (code, message)
    }

    /// Maps a non-2xx response into an error per the status-code table.
    fn get_error_response(
        &self,
        resp: HttpResponse,
        resource: &str,
        method: &Method,
        bucket_name: &str,
        object_name: &str,
    ) -> ExecError {
        if !resp.body.is_empty() {
            let is_xml = resp
                .headers
                .get("Content-Type")
                .iter()
                .any(|v| v.to_ascii_lowercase().contains("application/xml"));
            if is_xml {
                return match crate::response::from_xml::<crate::response::ErrorDocument>(&resp.body) {
                    Ok(doc) => ExecError::Other(Error::from(S3ServerError {
                        status_code: Some(resp.status_code),
                        request_id: if doc.request_id.is_empty() {
                            resp.headers.get_front("x-amz-request-id").unwrap_or_default().to_owned()
                        } else {
                            doc.request_id
                        },
                        host_id: doc.host_id,
                        code: doc.code,
                        message: doc.message,
                        resource: if doc.resource.is_empty() { resource.to_owned() } else { doc.resource },
                        bucket_name: if doc.bucket_name.is_empty() { bucket_name.to_owned() } else { doc.bucket_name },
                        object_name: if doc.key.is_empty() { object_name.to_owned() } else { doc.key },
                        headers: resp.headers,
                    })),
                    Err(err) => ExecError::Other(err),
                };
            }
            let content_type = resp.headers.get("Content-Type").join(",");
            return ExecError::Other(Error::invalid_response(format!(
                "invalid response received; status code: {}; content-type: {content_type}",
                resp.status_code.as_u16()
            )));
        }

        let (code, message) = match resp.status_code.as_u16() {
            301 | 307 | 400 => {
                let (code, message) = self.redirect_code(resp.status_code, method, &resp.headers, bucket_name, true);
                if code == "RetryHead" {
                    return ExecError::RetryHead(resp);
                }
                (code, message)
            }
            403 => ("AccessDenied".to_owned(), "Access denied".to_owned()),
            404 => {
                if !object_name.is_empty() {
                    ("NoSuchKey".to_owned(), "Object does not exist".to_owned())
                } else if bucket_name.is_empty() {
                    ("NoSuchBucket".to_owned(), "Bucket does not exist".to_owned())
                } else {
                    ("ResourceNotFound".to_owned(), "Request resource not found".to_owned())
                }
            }
            405 | 501 => (
                "MethodNotAllowed".to_owned(),
                "The specified method is not allowed against this resource".to_owned(),
            ),
            409 => {
                if bucket_name.is_empty() {
                    ("NoSuchBucket".to_owned(), "Bucket does not exist".to_owned())
                } else {
                    ("ResourceConflict".to_owned(), "Request resource conflicts".to_owned())
                }
            }
            status => {
                return ExecError::Other(Error::invalid_response(format!(
                    "server failed with HTTP status code {status}"
                )));
            }
        };

        ExecError::Other(Error::from(S3ServerError {
            status_code: Some(resp.status_code),
            request_id: resp.headers.get_front("x-amz-request-id").unwrap_or_default().to_owned(),
            host_id: resp.headers.get_front("x-amz-id-2").unwrap_or_default().to_owned(),
            headers: resp.headers,
            code,
            message,
            resource: resource.to_owned(),
            bucket_name: bucket_name.to_owned(),
            object_name: object_name.to_owned(),
        }))
    }

    async fn execute_once(&self, req: S3Request, data_fn: Option<DataFn<'_>>) -> Result<HttpResponse, ExecError> {
        let method = req.method.clone();
        let bucket_name = req.bucket_name.clone();
        let object_name = req.object_name.clone();

        let (http_req, resource) = req
            .into_http_request(&self.base_url, self.provider.as_deref(), &self.user_agent)
            .await?;

        let response = match data_fn {
            Some(data_fn) => {
                let outcome = self.transport.execute_streaming(http_req, data_fn).await?;
                outcome.response
            }
            None => self.transport.execute(http_req).await?,
        };

        if response.status_code.is_success() {
            return Ok(response);
        }

        let err = self.get_error_response(response, &resource, &method, &bucket_name, &object_name);
        let code = match &err {
            ExecError::RetryHead(_) => Some("RetryHead"),
            ExecError::Other(Error::S3(e)) => Some(e.code.as_str()),
            ExecError::Other(_) => None,
        };
        if matches!(code, Some("NoSuchBucket" | "RetryHead")) {
            self.evict_region(&bucket_name);
        }
        Err(err)
    }

    /// Executes a request, retrying exactly once on the internal
    /// retry-HEAD signal.
    pub(crate) async fn execute(&self, req: S3Request) -> Result<HttpResponse> {
        match self.execute_once(req.clone(), None).await {
            Ok(resp) => return Ok(resp),
            Err(ExecError::Other(err)) => return Err(err),
            Err(ExecError::RetryHead(_)) => {
                debug!(bucket = %req.bucket_name, "retrying HEAD after region refresh");
            }
        }

        match self.execute_once(req.clone(), None).await {
            Ok(resp) => Ok(resp),
            Err(ExecError::Other(err)) => Err(err),
            Err(ExecError::RetryHead(resp)) => {
                // Second failure: synthesize the terminal redirect error.
                let (code, message) =
                    self.redirect_code(resp.status_code, &req.method, &resp.headers, &req.bucket_name, false);
                Err(Error::from(S3ServerError {
                    status_code: Some(resp.status_code),
                    request_id: resp.headers.get_front("x-amz-request-id").unwrap_or_default().to_owned(),
                    host_id: resp.headers.get_front("x-amz-id-2").unwrap_or_default().to_owned(),
                    headers: resp.headers,
                    code,
                    message,
                    resource: String::new(),
                    bucket_name: req.bucket_name,
                    object_name: req.object_name,
                }))
            }
        }
    }

    /// Executes a request streaming the 2xx body into `data_fn`.
    pub(crate) async fn execute_with_data_fn(&self, req: S3Request, data_fn: DataFn<'_>) -> Result<HttpResponse> {
        match self.execute_once(req, Some(data_fn)).await {
            Ok(resp) => Ok(resp),
            Err(ExecError::Other(err)) => Err(err),
            // Streaming requests are GET/POST; the HEAD retry path cannot
            // trigger here, treat it as a terminal redirect.
            Err(ExecError::RetryHead(resp)) => Err(Error::invalid_response(format!(
                "unexpected redirect with status {}",
                resp.status_code.as_u16()
            ))),
        }
    }

    /// Resolves the effective region for a bucket: explicit override,
    /// configured region, cache, or a `GetBucketLocation` call.
    pub(crate) async fn get_region(&self, bucket_name: &str, region: &str) -> Result<String> {
        let base_region = &self.base_url.region;
        if !region.is_empty() {
            if !base_region.is_empty() && base_region != region {
                return Err(Error::invalid_arg(format!(
                    "region must be {base_region}, but passed {region}"
                )));
            }
            return Ok(region.to_owned());
        }

        if !base_region.is_empty() {
            return Ok(base_region.clone());
        }

        if bucket_name.is_empty() || self.provider.is_none() {
            return Ok("us-east-1".to_owned());
        }

        if let Some(stored) = self.cached_region(bucket_name) {
            return Ok(stored);
        }

        let mut req = self.new_request(Method::GET, "us-east-1", &Multimap::new(), &Multimap::new());
        req.query_params.add("location", "");
        req.bucket_name = bucket_name.to_owned();

        let resp = self.execute(req).await?;
        let mut value = parse_location_constraint(&resp.body)?;
        if value.is_empty() {
            value = "us-east-1".to_owned();
        } else if value == "EU" && self.base_url.aws_host {
            value = "eu-west-1".to_owned();
        }

        debug!(bucket = bucket_name, region = %value, "resolved bucket region");
        self.store_region(bucket_name, &value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn client() -> Client {
        ClientBuilder::new("https://play.min.io").build().unwrap()
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &'static [u8]) -> HttpResponse {
        let mut map = Multimap::new();
        for (k, v) in headers {
            map.add(*k, *v);
        }
        HttpResponse {
            status_code: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body: Bytes::from_static(body),
        }
    }

    fn unwrap_s3(err: ExecError) -> S3ServerError {
        match err {
            ExecError::Other(Error::S3(e)) => *e,
            _ => panic!("expected S3 error"),
        }
    }

    #[test]
    fn status_code_classification() {
        let c = client();

        let err = unwrap_s3(c.get_error_response(response(403, &[], b""), "/b", &Method::GET, "b", ""));
        assert_eq!(err.code, "AccessDenied");

        let err = unwrap_s3(c.get_error_response(response(404, &[], b""), "/b/o", &Method::GET, "b", "o"));
        assert_eq!(err.code, "NoSuchKey");

        let err = unwrap_s3(c.get_error_response(response(404, &[], b""), "/", &Method::GET, "", ""));
        assert_eq!(err.code, "NoSuchBucket");

        let err = unwrap_s3(c.get_error_response(response(404, &[], b""), "/b", &Method::GET, "b", ""));
        assert_eq!(err.code, "ResourceNotFound");

        let err = unwrap_s3(c.get_error_response(response(405, &[], b""), "/b", &Method::GET, "b", ""));
        assert_eq!(err.code, "MethodNotAllowed");

        let err = unwrap_s3(c.get_error_response(response(501, &[], b""), "/b", &Method::GET, "b", ""));
        assert_eq!(err.code, "MethodNotAllowed");

        let err = unwrap_s3(c.get_error_response(response(409, &[], b""), "/b", &Method::GET, "b", ""));
        assert_eq!(err.code, "ResourceConflict");

        let err = unwrap_s3(c.get_error_response(response(409, &[], b""), "/", &Method::GET, "", ""));
        assert_eq!(err.code, "NoSuchBucket");
    }

    #[test]
    fn redirect_carries_region_hint() {
        let c = client();
        let err = unwrap_s3(c.get_error_response(
            response(301, &[("x-amz-bucket-region", "eu-west-1")], b""),
            "/b",
            &Method::GET,
            "b",
            "",
        ));
        assert_eq!(err.code, "PermanentRedirect");
        assert!(err.message.contains("use region eu-west-1"));

        let err = unwrap_s3(c.get_error_response(response(307, &[], b""), "/b", &Method::GET, "b", ""));
        assert_eq!(err.code, "Redirect");
    }

    #[test]
    fn head_with_cached_region_promotes_to_retry() {
        let c = client();
        c.store_region("b", "eu-west-1");
        let err = c.get_error_response(
            response(400, &[("x-amz-bucket-region", "eu-west-1")], b""),
            "/b",
            &Method::HEAD,
            "b",
            "",
        );
        assert!(matches!(err, ExecError::RetryHead(_)));

        // Without a cached region the 400 stays a BadRequest.
        c.evict_region("b");
        let err = unwrap_s3(c.get_error_response(
            response(400, &[("x-amz-bucket-region", "eu-west-1")], b""),
            "/b",
            &Method::HEAD,
            "b",
            "",
        ));
        assert_eq!(err.code, "BadRequest");
    }

    #[test]
    fn xml_error_body_wins() {
        let c = client();
        let body = b"<Error><Code>SlowDown</Code><Message>Reduce your request rate</Message>\
                     <RequestId>req-1</RequestId><HostId>host-1</HostId></Error>";
        let err = unwrap_s3(c.get_error_response(
            response(503, &[("Content-Type", "application/xml")], body),
            "/b/o",
            &Method::GET,
            "b",
            "o",
        ));
        assert_eq!(err.code, "SlowDown");
        assert_eq!(err.message, "Reduce your request rate");
        assert_eq!(err.request_id, "req-1");
        assert_eq!(err.host_id, "host-1");
        assert_eq!(err.bucket_name, "b");
        assert_eq!(err.object_name, "o");
    }

    #[test]
    fn non_xml_error_body_is_invalid_response() {
        let c = client();
        let err = c.get_error_response(
            response(500, &[("Content-Type", "text/html")], b"<html>oops</html>"),
            "/b",
            &Method::GET,
            "b",
            "",
        );
        assert!(matches!(err, ExecError::Other(Error::InvalidResponse(_))));
    }

    #[test]
    fn unmapped_status_is_invalid_response() {
        let c = client();
        let err = c.get_error_response(response(418, &[], b""), "/b", &Method::GET, "b", "");
        match err {
            ExecError::Other(Error::InvalidResponse(msg)) => assert!(msg.contains("418")),
            _ => panic!("expected invalid response"),
        }
    }

    #[test]
    fn set_app_info_validates_and_extends_ua() {
        let mut c = client();
        assert!(c.set_app_info("", "1.0").is_err());
        c.set_app_info("myapp", "1.2.3").unwrap();
        assert!(c.user_agent.ends_with(" myapp/1.2.3"));
        assert!(c.user_agent.starts_with("s3c/"));
    }

    #[tokio::test]
    async fn get_region_prefers_override_and_config() {
        let c = ClientBuilder::new("https://play.min.io").region("us-west-1").build().unwrap();
        assert_eq!(c.get_region("b", "us-west-1").await.unwrap(), "us-west-1");
        assert!(c.get_region("b", "eu-central-1").await.is_err());
        assert_eq!(c.get_region("b", "").await.unwrap(), "us-west-1");
    }

    #[tokio::test]
    async fn get_region_defaults_without_provider() {
        let c = client();
        assert_eq!(c.get_region("b", "").await.unwrap(), "us-east-1");
    }
}
