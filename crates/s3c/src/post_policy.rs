//! POST policy for browser-based uploads.
//!
//! See <https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-HTTPPOSTConstructPolicy.html>

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::{Error, Result};
use crate::signer;
use crate::time::UtcTime;
use crate::utils::base64_encode;

const EQ: &str = "eq";
const STARTS_WITH: &str = "starts-with";

fn trim_dollar(element: &str) -> &str {
    element.strip_prefix('$').unwrap_or(element)
}

fn is_reserved_element(element: &str) -> bool {
    matches!(
        element,
        "bucket" | "x-amz-algorithm" | "x-amz-credential" | "x-amz-date" | "policy" | "x-amz-signature"
    )
}

/// A POST policy document under construction.
#[derive(Debug, Clone)]
pub struct PostPolicy {
    pub bucket: String,
    pub region: String,
    expiration: UtcTime,
    eq_conditions: BTreeMap<String, String>,
    starts_with_conditions: BTreeMap<String, String>,
    lower_limit: Option<u64>,
    upper_limit: Option<u64>,
}

impl PostPolicy {
    #[must_use]
    pub fn new(bucket: impl Into<String>, expiration: UtcTime) -> Self {
        Self {
            bucket: bucket.into(),
            region: String::new(),
            expiration,
            eq_conditions: BTreeMap::new(),
            starts_with_conditions: BTreeMap::new(),
            lower_limit: None,
            upper_limit: None,
        }
    }

    /// # Errors
    /// Returns an error for empty, reserved or unsupported elements
    pub fn add_equals_condition(&mut self, element: &str, value: impl Into<String>) -> Result<()> {
        if element.is_empty() {
            return Err(Error::invalid_arg("condition element cannot be empty"));
        }
        let element = trim_dollar(element);
        if matches!(element, "success_action_redirect" | "redirect" | "content-length-range") {
            return Err(Error::invalid_arg(format!("{element} is unsupported for equals condition")));
        }
        if is_reserved_element(element) {
            return Err(Error::invalid_arg(format!("{element} cannot be set")));
        }
        self.eq_conditions.insert(element.to_owned(), value.into());
        Ok(())
    }

    pub fn remove_equals_condition(&mut self, element: &str) {
        self.eq_conditions.remove(trim_dollar(element));
    }

    /// # Errors
    /// Returns an error for empty, reserved or unsupported elements
    pub fn add_starts_with_condition(&mut self, element: &str, value: impl Into<String>) -> Result<()> {
        if element.is_empty() {
            return Err(Error::invalid_arg("condition element cannot be empty"));
        }
        let element = trim_dollar(element);
        if element == "success_action_status"
            || element == "content-length-range"
            || (element.starts_with("x-amz-") && !element.starts_with("x-amz-meta-"))
        {
            return Err(Error::invalid_arg(format!(
                "{element} is unsupported for starts-with condition"
            )));
        }
        if is_reserved_element(element) {
            return Err(Error::invalid_arg(format!("{element} cannot be set")));
        }
        self.starts_with_conditions.insert(element.to_owned(), value.into());
        Ok(())
    }

    pub fn remove_starts_with_condition(&mut self, element: &str) {
        self.starts_with_conditions.remove(trim_dollar(element));
    }

    /// # Errors
    /// Returns an error when the lower limit exceeds the upper limit
    pub fn add_content_length_range_condition(&mut self, lower_limit: u64, upper_limit: u64) -> Result<()> {
        if lower_limit > upper_limit {
            return Err(Error::invalid_arg("lower limit cannot be greater than upper limit"));
        }
        self.lower_limit = Some(lower_limit);
        self.upper_limit = Some(upper_limit);
        Ok(())
    }

    pub fn remove_content_length_range_condition(&mut self) {
        self.lower_limit = None;
        self.upper_limit = None;
    }

    /// Produces the form fields for a browser POST upload: the base64
    /// policy, the credential fields and the signature.
    ///
    /// # Errors
    /// Returns an error when no `key` condition is set or the region is
    /// empty
    pub fn form_data(
        &self,
        access_key: &str,
        secret_key: &str,
        session_token: &str,
        region: &str,
    ) -> Result<BTreeMap<String, String>> {
        if region.is_empty() {
            return Err(Error::invalid_arg("region cannot be empty"));
        }
        if !self.eq_conditions.contains_key("key") && !self.starts_with_conditions.contains_key("key") {
            return Err(Error::invalid_arg("key condition must be set"));
        }

        let date = UtcTime::now();
        let credential = format!("{access_key}/{}/{region}/s3/aws4_request", date.to_signer_date()?);
        let amz_date = date.to_amz_date()?;

        let mut conditions = vec![json!([EQ, "$bucket", self.bucket])];
        for (key, value) in &self.eq_conditions {
            conditions.push(json!([EQ, format!("${key}"), value]));
        }
        for (key, value) in &self.starts_with_conditions {
            conditions.push(json!([STARTS_WITH, format!("${key}"), value]));
        }
        if let (Some(lower), Some(upper)) = (self.lower_limit, self.upper_limit) {
            conditions.push(json!(["content-length-range", lower, upper]));
        }
        conditions.push(json!([EQ, "$x-amz-algorithm", signer::ALGORITHM]));
        conditions.push(json!([EQ, "$x-amz-credential", credential]));
        if !session_token.is_empty() {
            conditions.push(json!([EQ, "$x-amz-security-token", session_token]));
        }
        conditions.push(json!([EQ, "$x-amz-date", amz_date]));

        let policy = json!({
            "expiration": self.expiration.to_iso8601_utc()?,
            "conditions": conditions,
        });

        let encoded_policy = base64_encode(policy.to_string().as_bytes());
        let signature = signer::post_presign_v4(&encoded_policy, secret_key, date, region)?;

        let mut data = BTreeMap::new();
        data.insert("x-amz-algorithm".to_owned(), signer::ALGORITHM.to_owned());
        data.insert("x-amz-credential".to_owned(), credential);
        data.insert("x-amz-date".to_owned(), amz_date);
        data.insert("policy".to_owned(), encoded_policy);
        data.insert("x-amz-signature".to_owned(), signature);
        if !session_token.is_empty() {
            data.insert("x-amz-security-token".to_owned(), session_token.to_owned());
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PostPolicy {
        PostPolicy::new("my-bucket", UtcTime::now().add_seconds(3600))
    }

    #[test]
    fn reserved_elements_are_rejected() {
        let mut p = policy();
        assert!(p.add_equals_condition("bucket", "x").is_err());
        assert!(p.add_equals_condition("x-amz-signature", "x").is_err());
        assert!(p.add_equals_condition("content-length-range", "x").is_err());
        assert!(p.add_starts_with_condition("x-amz-date", "x").is_err());
        assert!(p.add_starts_with_condition("x-amz-storage-class", "x").is_err());
        // metadata prefixes are allowed
        assert!(p.add_starts_with_condition("x-amz-meta-tag", "").is_ok());
    }

    #[test]
    fn content_length_range_validation() {
        let mut p = policy();
        assert!(p.add_content_length_range_condition(1024, 64).is_err());
        assert!(p.add_content_length_range_condition(64, 1024).is_ok());
    }

    #[test]
    fn form_data_requires_key_condition() {
        let p = policy();
        assert!(p.form_data("ak", "sk", "", "us-east-1").is_err());

        let mut p = policy();
        p.add_starts_with_condition("key", "uploads/").unwrap();
        assert!(p.form_data("ak", "sk", "", "").is_err());
        let data = p.form_data("ak", "sk", "", "us-east-1").unwrap();
        assert_eq!(data["x-amz-algorithm"], signer::ALGORITHM);
        assert!(data["x-amz-credential"].ends_with("/us-east-1/s3/aws4_request"));
        assert_eq!(data["x-amz-signature"].len(), 64);
        assert!(!data.contains_key("x-amz-security-token"));
    }

    #[test]
    fn form_data_includes_session_token() {
        let mut p = policy();
        p.add_equals_condition("key", "exact-object").unwrap();
        let data = p.form_data("ak", "sk", "token", "us-east-1").unwrap();
        assert_eq!(data["x-amz-security-token"], "token");

        let decoded = base64_simd::STANDARD.decode_to_vec(data["policy"].as_bytes()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        let conditions = parsed["conditions"].as_array().unwrap();
        assert!(conditions.iter().any(|c| c[1] == "$x-amz-security-token"));
        assert!(conditions.iter().any(|c| c[1] == "$key" && c[2] == "exact-object"));
    }
}
