//! Endpoint classification and URL building.
//!
//! A [`BaseUrl`] is parsed once from the configured endpoint and classified
//! (AWS / accelerate / dualstack / virtual-style). [`BaseUrl::build_url`]
//! assembles the URL for one request, choosing between path-style and
//! virtual-hosted-style addressing.

use std::fmt;

use http::Method;

use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::utils::encode_path;

/// A fully assembled request URL. The path keeps its exact percent-encoding
/// because the signature is computed over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Url {
    pub https: bool,
    /// Host, including a `:port` suffix when the port is not the scheme
    /// default.
    pub host: String,
    pub path: String,
    pub query_string: String,
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.https { "https" } else { "http" };
        write!(f, "{scheme}://{}{}", self.host, self.path)?;
        if !self.query_string.is_empty() {
            write!(f, "?{}", self.query_string)?;
        }
        Ok(())
    }
}

/// Extracts the region embedded in an AWS S3 host, e.g.
/// `s3.us-west-2.amazonaws.com` or `s3.dualstack.eu-west-1.amazonaws.com`.
fn extract_aws_region(host: &str) -> String {
    let tokens: Vec<&str> = host.split('.').collect();
    let mut token = tokens.get(1).copied().unwrap_or_default();

    // If token is "dualstack", the region might be in the next token.
    if token == "dualstack" {
        token = tokens.get(2).copied().unwrap_or_default();
    }

    // If token is "amazonaws", the region is not passed in the host.
    if token == "amazonaws" {
        return String::new();
    }

    token.to_owned()
}

/// The configured endpoint. Immutable after construction.
#[derive(Debug, Clone)]
pub struct BaseUrl {
    pub https: bool,
    host: String,
    port: u16,
    pub region: String,
    pub aws_host: bool,
    pub accelerate_host: bool,
    pub dualstack_host: bool,
    pub virtual_style: bool,
}

impl BaseUrl {
    /// Parses `value` as `[scheme://]host[:port]`. The scheme defaults to
    /// HTTPS.
    ///
    /// # Errors
    /// Returns an error for values carrying a path or query, or for an AWS
    /// China endpoint without a region
    pub fn parse(value: &str) -> Result<Self> {
        let (https, rest) = if let Some(rest) = value.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = value.strip_prefix("http://") {
            (false, rest)
        } else {
            (true, value)
        };

        if rest.is_empty() || rest.contains('/') || rest.contains('?') {
            return Err(Error::invalid_arg(
                "host value must contain only hostname and optional port number",
            ));
        }

        let (mut host, port) = match rest.rsplit_once(':') {
            Some((h, p))
                if !h.is_empty()
                    && !p.is_empty()
                    && p.bytes().all(|b| b.is_ascii_digit())
                    && (!h.contains(':') || (h.starts_with('[') && h.ends_with(']'))) =>
            {
                let port: u16 = p
                    .parse()
                    .map_err(|_| Error::invalid_arg(format!("invalid port in host value {rest}")))?;
                (h.to_owned(), port)
            }
            _ => (rest.to_owned(), 0),
        };

        let accelerate_host = host.starts_with("s3-accelerate.");
        let aws_host = (host.starts_with("s3.") || accelerate_host)
            && (host.ends_with(".amazonaws.com") || host.ends_with(".amazonaws.com.cn"));
        let virtual_style = aws_host || host.ends_with("aliyuncs.com");

        let mut region = String::new();
        let mut dualstack_host = false;
        let mut accelerate = accelerate_host;

        if aws_host {
            let is_aws_china_host = host.ends_with(".cn");
            region = extract_aws_region(&host);
            if is_aws_china_host && region.is_empty() {
                return Err(Error::invalid_arg(format!(
                    "region must be provided in Amazon S3 China endpoint {host}"
                )));
            }
            dualstack_host = host.contains(".dualstack.");
            host = if is_aws_china_host {
                "amazonaws.com.cn".to_owned()
            } else {
                "amazonaws.com".to_owned()
            };
        } else {
            accelerate = false;
        }

        Ok(Self {
            https,
            host,
            port,
            region,
            aws_host,
            accelerate_host: accelerate,
            dualstack_host,
            virtual_style,
        })
    }

    /// Host with the port appended when it does not match the scheme
    /// default.
    #[must_use]
    pub fn host_header_value(&self) -> String {
        if self.port == 0 || (!self.https && self.port == 80) || (self.https && self.port == 443) {
            return self.host.clone();
        }
        format!("{}:{}", self.host, self.port)
    }

    /// Assembles the URL for one request.
    ///
    /// # Errors
    /// Returns an error for an object name without a bucket, or a dotted
    /// bucket name on an accelerate endpoint
    pub fn build_url(
        &self,
        method: &Method,
        region: &str,
        query_params: &Multimap,
        bucket_name: &str,
        object_name: &str,
    ) -> Result<Url> {
        if bucket_name.is_empty() && !object_name.is_empty() {
            return Err(Error::invalid_arg(format!(
                "empty bucket name for object name {object_name}"
            )));
        }

        let mut host = self.host_header_value();

        if bucket_name.is_empty() {
            if self.aws_host {
                host = format!("s3.{region}.{host}");
            }
            return Ok(Url {
                https: self.https,
                host,
                path: "/".to_owned(),
                query_string: query_params.to_query_string(),
            });
        }

        let enforce_path_style =
            // CreateBucket API requires path style in Amazon AWS S3.
            (*method == Method::PUT && object_name.is_empty() && query_params.is_empty())
            // GetBucketLocation API requires path style in Amazon AWS S3.
            || query_params.contains("location")
            // Use path style for bucket name containing '.' which causes
            // SSL certificate validation error.
            || (bucket_name.contains('.') && self.https);

        if self.aws_host {
            let mut s3_domain = "s3.".to_owned();
            if self.accelerate_host {
                if bucket_name.contains('.') {
                    return Err(Error::invalid_arg(format!(
                        "bucket name '{bucket_name}' with '.' is not allowed for accelerate endpoint"
                    )));
                }
                if !enforce_path_style {
                    s3_domain = "s3-accelerate.".to_owned();
                }
            }
            if self.dualstack_host {
                s3_domain.push_str("dualstack.");
            }
            if enforce_path_style || !self.accelerate_host {
                s3_domain.push_str(region);
                s3_domain.push('.');
            }
            host = format!("{s3_domain}{host}");
        }

        let mut path = String::new();
        if enforce_path_style || !self.virtual_style {
            path = format!("/{bucket_name}");
        } else {
            host = format!("{bucket_name}.{host}");
        }

        if !object_name.is_empty() {
            if !object_name.starts_with('/') {
                path.push('/');
            }
            path.push_str(&encode_path(object_name));
        }

        Ok(Url {
            https: self.https,
            host,
            path,
            query_string: query_params.to_query_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_of(base: &BaseUrl, method: Method, region: &str, bucket: &str, object: &str) -> String {
        base.build_url(&method, region, &Multimap::new(), bucket, object)
            .unwrap()
            .to_string()
    }

    #[test]
    fn classifies_aws_host() {
        let base = BaseUrl::parse("s3.us-west-2.amazonaws.com").unwrap();
        assert!(base.aws_host);
        assert!(base.virtual_style);
        assert!(!base.accelerate_host);
        assert!(!base.dualstack_host);
        assert_eq!(base.region, "us-west-2");
    }

    #[test]
    fn classifies_plain_aws_host() {
        let base = BaseUrl::parse("s3.amazonaws.com").unwrap();
        assert!(base.aws_host);
        assert_eq!(base.region, "");
    }

    #[test]
    fn classifies_accelerate_and_dualstack() {
        let base = BaseUrl::parse("s3-accelerate.amazonaws.com").unwrap();
        assert!(base.aws_host);
        assert!(base.accelerate_host);

        let base = BaseUrl::parse("s3.dualstack.eu-west-1.amazonaws.com").unwrap();
        assert!(base.dualstack_host);
        assert_eq!(base.region, "eu-west-1");
    }

    #[test]
    fn china_endpoint_requires_region() {
        assert!(BaseUrl::parse("s3.amazonaws.com.cn").is_err());
        let base = BaseUrl::parse("s3.cn-north-1.amazonaws.com.cn").unwrap();
        assert_eq!(base.region, "cn-north-1");
        assert_eq!(base.host_header_value(), "amazonaws.com.cn");
    }

    #[test]
    fn aliyun_forces_virtual_style() {
        let base = BaseUrl::parse("oss-cn-hangzhou.aliyuncs.com").unwrap();
        assert!(!base.aws_host);
        assert!(base.virtual_style);
    }

    #[test]
    fn rejects_path_or_query() {
        assert!(BaseUrl::parse("play.min.io/foo").is_err());
        assert!(BaseUrl::parse("play.min.io?x=1").is_err());
        assert!(BaseUrl::parse("").is_err());
    }

    #[test]
    fn port_handling() {
        let base = BaseUrl::parse("http://localhost:9000").unwrap();
        assert!(!base.https);
        assert_eq!(base.host_header_value(), "localhost:9000");

        let base = BaseUrl::parse("https://play.min.io:443").unwrap();
        assert_eq!(base.host_header_value(), "play.min.io");
    }

    #[test]
    fn virtual_style_for_aws_object() {
        let base = BaseUrl::parse("s3.us-east-1.amazonaws.com").unwrap();
        assert_eq!(
            url_of(&base, Method::GET, "us-east-1", "mybucket", "myobject"),
            "https://mybucket.s3.us-east-1.amazonaws.com/myobject"
        );
    }

    #[test]
    fn path_style_for_bucket_creation() {
        let base = BaseUrl::parse("s3.us-east-1.amazonaws.com").unwrap();
        assert_eq!(
            url_of(&base, Method::PUT, "us-east-1", "mybucket", ""),
            "https://s3.us-east-1.amazonaws.com/mybucket"
        );
    }

    #[test]
    fn path_style_for_dotted_bucket_over_https() {
        let base = BaseUrl::parse("s3.us-east-1.amazonaws.com").unwrap();
        assert_eq!(
            url_of(&base, Method::GET, "us-east-1", "my.bucket", "obj"),
            "https://s3.us-east-1.amazonaws.com/my.bucket/obj"
        );
    }

    #[test]
    fn location_query_forces_path_style() {
        let base = BaseUrl::parse("s3.us-east-1.amazonaws.com").unwrap();
        let mut query = Multimap::new();
        query.add("location", "");
        let url = base
            .build_url(&Method::GET, "us-east-1", &query, "mybucket", "")
            .unwrap();
        assert_eq!(url.to_string(), "https://s3.us-east-1.amazonaws.com/mybucket?location=");
    }

    #[test]
    fn accelerate_rejects_dotted_bucket() {
        let base = BaseUrl::parse("s3-accelerate.amazonaws.com").unwrap();
        let err = base
            .build_url(&Method::GET, "us-east-1", &Multimap::new(), "my.bucket", "obj")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn accelerate_host_skips_region() {
        let base = BaseUrl::parse("s3-accelerate.amazonaws.com").unwrap();
        assert_eq!(
            url_of(&base, Method::GET, "us-east-1", "mybucket", "obj"),
            "https://mybucket.s3-accelerate.amazonaws.com/obj"
        );
    }

    #[test]
    fn dualstack_infix() {
        let base = BaseUrl::parse("s3.dualstack.us-east-1.amazonaws.com").unwrap();
        assert_eq!(
            url_of(&base, Method::GET, "us-east-1", "mybucket", "obj"),
            "https://mybucket.s3.dualstack.us-east-1.amazonaws.com/obj"
        );
    }

    #[test]
    fn root_url_for_aws() {
        let base = BaseUrl::parse("s3.us-east-1.amazonaws.com").unwrap();
        assert_eq!(url_of(&base, Method::GET, "us-east-1", "", ""), "https://s3.us-east-1.amazonaws.com/");
    }

    #[test]
    fn non_aws_path_style() {
        let base = BaseUrl::parse("https://play.min.io").unwrap();
        assert_eq!(
            url_of(&base, Method::GET, "us-east-1", "mybucket", "a/b c"),
            "https://play.min.io/mybucket/a/b%20c"
        );
    }

    #[test]
    fn object_without_bucket_is_rejected() {
        let base = BaseUrl::parse("https://play.min.io").unwrap();
        assert!(base.build_url(&Method::GET, "us-east-1", &Multimap::new(), "", "obj").is_err());
    }

    #[test]
    fn object_leading_and_trailing_slash() {
        let base = BaseUrl::parse("https://play.min.io").unwrap();
        assert_eq!(
            url_of(&base, Method::GET, "us-east-1", "bkt", "/dir/obj/"),
            "https://play.min.io/bkt/dir/obj/"
        );
    }
}
