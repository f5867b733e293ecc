//! Server-side encryption request headers.

use crate::multimap::Multimap;
use crate::utils::{base64_encode, md5sum_base64};

/// Server-side encryption mode for write operations.
///
/// `CustomerKey` and `Kms` require a TLS connection; the client rejects
/// them over plain HTTP before any request is sent.
#[derive(Debug, Clone)]
pub enum Sse {
    /// SSE-S3: S3-managed keys.
    S3,
    /// SSE-KMS with a key id and optional encryption context.
    Kms { key: String, context: Option<String> },
    /// SSE-C with a customer-provided key.
    CustomerKey { key: String },
}

impl Sse {
    /// Headers attached to write requests.
    #[must_use]
    pub fn headers(&self) -> Multimap {
        let mut headers = Multimap::new();
        match self {
            Self::S3 => {
                headers.add("X-Amz-Server-Side-Encryption", "AES256");
            }
            Self::Kms { key, context } => {
                headers.add("X-Amz-Server-Side-Encryption-Aws-Kms-Key-Id", key.clone());
                headers.add("X-Amz-Server-Side-Encryption", "aws:kms");
                if let Some(context) = context {
                    headers.add(
                        "X-Amz-Server-Side-Encryption-Context",
                        base64_encode(context.as_bytes()),
                    );
                }
            }
            Self::CustomerKey { key } => {
                headers.add("X-Amz-Server-Side-Encryption-Customer-Algorithm", "AES256");
                headers.add(
                    "X-Amz-Server-Side-Encryption-Customer-Key",
                    base64_encode(key.as_bytes()),
                );
                headers.add(
                    "X-Amz-Server-Side-Encryption-Customer-Key-MD5",
                    md5sum_base64(key.as_bytes()),
                );
            }
        }
        headers
    }

    /// Headers attached to the copy-source side of copy operations.
    /// Only SSE-C carries copy-source headers.
    #[must_use]
    pub fn copy_headers(&self) -> Multimap {
        let mut headers = Multimap::new();
        if let Self::CustomerKey { key } = self {
            headers.add("X-Amz-Copy-Source-Server-Side-Encryption-Customer-Algorithm", "AES256");
            headers.add(
                "X-Amz-Copy-Source-Server-Side-Encryption-Customer-Key",
                base64_encode(key.as_bytes()),
            );
            headers.add(
                "X-Amz-Copy-Source-Server-Side-Encryption-Customer-Key-MD5",
                md5sum_base64(key.as_bytes()),
            );
        }
        headers
    }

    #[must_use]
    pub fn tls_required(&self) -> bool {
        !matches!(self, Self::S3)
    }

    #[must_use]
    pub fn is_customer_key(&self) -> bool {
        matches!(self, Self::CustomerKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_s3_headers() {
        let sse = Sse::S3;
        let headers = sse.headers();
        assert_eq!(headers.get_front("X-Amz-Server-Side-Encryption"), Some("AES256"));
        assert!(!sse.tls_required());
        assert!(sse.copy_headers().is_empty());
    }

    #[test]
    fn sse_kms_headers() {
        let sse = Sse::Kms {
            key: "key-id".to_owned(),
            context: Some("{}".to_owned()),
        };
        let headers = sse.headers();
        assert_eq!(headers.get_front("X-Amz-Server-Side-Encryption"), Some("aws:kms"));
        assert_eq!(
            headers.get_front("X-Amz-Server-Side-Encryption-Aws-Kms-Key-Id"),
            Some("key-id")
        );
        assert_eq!(
            headers.get_front("X-Amz-Server-Side-Encryption-Context"),
            Some("e30=")
        );
        assert!(sse.tls_required());
    }

    #[test]
    fn sse_c_headers_match_copy_headers() {
        let sse = Sse::CustomerKey {
            key: "01234567890123456789012345678901".to_owned(),
        };
        let headers = sse.headers();
        let copy = sse.copy_headers();
        assert_eq!(
            headers.get_front("X-Amz-Server-Side-Encryption-Customer-Key"),
            copy.get_front("X-Amz-Copy-Source-Server-Side-Encryption-Customer-Key"),
        );
        assert!(sse.tls_required());
        assert!(sse.is_customer_key());
    }
}
