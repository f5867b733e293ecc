//! HTTP transport adapter.
//!
//! Everything above this module works with [`HttpRequest`]/[`HttpResponse`];
//! `reqwest` stays behind this seam. Response bodies are either buffered or
//! streamed chunk-by-chunk into a data callback, in order, on the
//! transport's execution context.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bytes::Bytes;
use futures::StreamExt as _;
use http::{Method, StatusCode};
use tracing::debug;

use crate::error::Result;
use crate::multimap::Multimap;

/// A fully built outgoing request.
#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Multimap,
    pub body: Bytes,
}

/// Status, headers and (possibly empty) buffered body.
#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status_code: StatusCode,
    pub headers: Multimap,
    pub body: Bytes,
}

/// Outcome of a streamed execution.
pub(crate) struct StreamOutcome {
    pub response: HttpResponse,
    /// True when the data callback stopped the transfer.
    pub cancelled: bool,
}

/// Per-transfer data callback; returning `false` aborts the transfer.
pub(crate) type DataFn<'a> = &'a mut (dyn FnMut(&[u8]) -> bool + Send);

#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub ignore_cert_check: bool,
    pub ssl_cert_file: Option<PathBuf>,
    pub debug: bool,
}

pub(crate) struct Transport {
    client: reqwest::Client,
    debug: bool,
    uploaded_size: AtomicU64,
    upload_speed: AtomicU64,
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.ignore_cert_check {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(ca_file) = &config.ssl_cert_file {
            let cert = reqwest::Certificate::from_pem(&std::fs::read(ca_file)?)?;
            builder = builder.add_root_certificate(cert);
        }
        Ok(Self {
            client: builder.build()?,
            debug: config.debug,
            uploaded_size: AtomicU64::new(0),
            upload_speed: AtomicU64::new(0),
        })
    }

    /// Total bytes uploaded through this transport.
    pub fn uploaded_size(&self) -> u64 {
        self.uploaded_size.load(Ordering::Relaxed)
    }

    /// Upload throughput of the most recent transfer, in bytes per second.
    pub fn upload_speed(&self) -> u64 {
        self.upload_speed.load(Ordering::Relaxed)
    }

    fn build(&self, req: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(req.method.clone(), &req.url);
        for (name, value) in &req.headers {
            // Host and Content-Length are emitted by the HTTP stack itself
            // with the same values they were signed with.
            if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            builder = builder.header(name, value);
        }
        if !req.body.is_empty() || req.method == Method::PUT || req.method == Method::POST {
            builder = builder.body(req.body.clone());
        }
        builder
    }

    fn record_upload(&self, req: &HttpRequest, started: Instant) {
        if req.method != Method::PUT && req.method != Method::POST {
            return;
        }
        let len = req.body.len() as u64;
        self.uploaded_size.fetch_add(len, Ordering::Relaxed);
        let elapsed = started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let speed = (len as f64 / elapsed) as u64;
            self.upload_speed.store(speed, Ordering::Relaxed);
        }
    }

    fn response_headers(response: &reqwest::Response) -> Multimap {
        let mut headers = Multimap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.add(name.as_str(), value);
            }
        }
        headers
    }

    /// Executes the request and buffers the whole response body.
    pub async fn execute(&self, req: HttpRequest) -> Result<HttpResponse> {
        if self.debug {
            debug!(method = %req.method, url = %req.url, body_len = req.body.len(), "request");
        }
        let started = Instant::now();
        let response = self.build(&req).send().await?;
        self.record_upload(&req, started);

        let status_code = response.status();
        let headers = Self::response_headers(&response);
        let body = response.bytes().await?;
        if self.debug {
            debug!(status = %status_code, body_len = body.len(), "response");
        }
        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }

    /// Executes the request. A 2xx body is fed to `on_data` chunk by chunk;
    /// a non-2xx body is buffered for error mapping.
    pub async fn execute_streaming(&self, req: HttpRequest, on_data: DataFn<'_>) -> Result<StreamOutcome> {
        if self.debug {
            debug!(method = %req.method, url = %req.url, "request (streaming)");
        }
        let started = Instant::now();
        let response = self.build(&req).send().await?;
        self.record_upload(&req, started);

        let status_code = response.status();
        let headers = Self::response_headers(&response);

        if !status_code.is_success() {
            let body = response.bytes().await?;
            return Ok(StreamOutcome {
                response: HttpResponse {
                    status_code,
                    headers,
                    body,
                },
                cancelled: false,
            });
        }

        let mut cancelled = false;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !on_data(&chunk) {
                cancelled = true;
                break;
            }
        }
        if self.debug {
            debug!(status = %status_code, cancelled, "response (streamed)");
        }

        Ok(StreamOutcome {
            response: HttpResponse {
                status_code,
                headers,
                body: Bytes::new(),
            },
            cancelled,
        })
    }
}
