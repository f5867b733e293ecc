//! Error taxonomy.
//!
//! Validation errors are produced locally before any I/O. Transport and
//! decode failures wrap the underlying error. HTTP-level failures from the
//! service are carried in [`S3ServerError`] with the classification rules
//! applied by the client (see `client::mod`).

use crate::multimap::Multimap;

use std::fmt;

use http::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Rejected locally, no request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url: {0}")]
    Url(#[from] url::ParseError),

    #[error("time parse: {0}")]
    TimeParse(#[from] time::error::Parse),

    #[error("time format: {0}")]
    TimeFormat(#[from] time::error::Format),

    /// The server answered but the response is not usable as-is.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Event-stream or body checksum verification failed.
    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// Mapped non-2xx service response.
    #[error(transparent)]
    S3(Box<S3ServerError>),
}

impl Error {
    pub(crate) fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Service error code, when this is an [`Error::S3`].
    #[must_use]
    pub fn s3_code(&self) -> Option<&str> {
        match self {
            Self::S3(e) => Some(&e.code),
            _ => None,
        }
    }

    pub(crate) fn is_s3_code(&self, code: &str) -> bool {
        self.s3_code() == Some(code)
    }
}

impl From<S3ServerError> for Error {
    fn from(e: S3ServerError) -> Self {
        Self::S3(Box::new(e))
    }
}

/// A failure reported by the service, after status-code classification and
/// `<Error>` document parsing.
#[derive(Debug, Default, Clone)]
pub struct S3ServerError {
    pub status_code: Option<StatusCode>,
    pub headers: Multimap,
    pub code: String,
    pub message: String,
    pub resource: String,
    pub request_id: String,
    pub host_id: String,
    pub bucket_name: String,
    pub object_name: String,
}

impl fmt::Display for S3ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3 error: code={}", self.code)?;
        if !self.message.is_empty() {
            write!(f, ", message={}", self.message)?;
        }
        if let Some(status) = self.status_code {
            write!(f, ", status={}", status.as_u16())?;
        }
        if !self.resource.is_empty() {
            write!(f, ", resource={}", self.resource)?;
        }
        if !self.request_id.is_empty() {
            write!(f, ", request-id={}", self.request_id)?;
        }
        if !self.host_id.is_empty() {
            write!(f, ", host-id={}", self.host_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for S3ServerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_code_access() {
        let err = Error::from(S3ServerError {
            code: "NoSuchBucket".to_owned(),
            ..S3ServerError::default()
        });
        assert_eq!(err.s3_code(), Some("NoSuchBucket"));
        assert!(err.is_s3_code("NoSuchBucket"));
        assert!(!err.is_s3_code("NoSuchKey"));

        let err = Error::invalid_arg("bucket name cannot be empty");
        assert_eq!(err.s3_code(), None);
    }

    #[test]
    fn server_error_display() {
        let err = S3ServerError {
            status_code: Some(StatusCode::NOT_FOUND),
            code: "NoSuchKey".to_owned(),
            message: "Object does not exist".to_owned(),
            resource: "/b/o".to_owned(),
            ..S3ServerError::default()
        };
        let text = err.to_string();
        assert!(text.contains("code=NoSuchKey"));
        assert!(text.contains("status=404"));
    }
}
