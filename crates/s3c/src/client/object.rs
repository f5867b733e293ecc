//! Object-level operations.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::Method;

use super::Client;
use crate::args::{
    DeleteObjectTagsArgs, DisableObjectLegalHoldArgs, EnableObjectLegalHoldArgs, GetObjectArgs, GetObjectRetentionArgs,
    GetObjectTagsArgs, GetPresignedObjectUrlArgs, IsObjectLegalHoldEnabledArgs, PutObjectApiArgs, RemoveObjectArgs,
    SelectObjectContentArgs, SetObjectRetentionArgs, SetObjectTagsArgs, StatObjectArgs,
};
use crate::error::{Error, Result};
use crate::multimap::Multimap;
use crate::post_policy::PostPolicy;
use crate::response::{PutObjectResponse, StatObjectResponse, parse_legal_hold, parse_object_retention, parse_tags, trim_etag};
use crate::select::{SelectEvent, SelectHandler};
use crate::signer;
use crate::sse::Sse;
use crate::time::UtcTime;
use crate::types::{Retention, RetentionMode, tags_to_xml, user_metadata_of};
use crate::utils::md5sum_base64;
use crate::xml::XmlWriter;

impl Client {
    fn check_ssec(&self, ssec: Option<&Sse>) -> Result<()> {
        if ssec.is_some() && !self.base_url().https {
            return Err(Error::invalid_arg(
                "SSE-C operation must be performed over a secure connection",
            ));
        }
        Ok(())
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn stat_object(&self, args: StatObjectArgs) -> Result<StatObjectResponse> {
        args.validate()?;
        self.check_ssec(args.ssec.as_ref())?;

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::HEAD, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.object_name = args.object.clone();
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id.clone());
        }
        req.headers.add_all(&args.conditions.headers(args.ssec.as_ref())?);

        let resp = self.execute(req).await?;

        let mut stat = StatObjectResponse {
            bucket_name: args.bucket,
            object_name: args.object,
            version_id: resp.headers.get_front("x-amz-version-id").unwrap_or_default().to_owned(),
            etag: trim_etag(resp.headers.get_front("etag").unwrap_or_default()),
            ..StatObjectResponse::default()
        };
        if let Some(value) = resp.headers.get_front("content-length") {
            stat.size = value
                .parse()
                .map_err(|_| Error::invalid_response(format!("invalid content-length {value}")))?;
        }
        if let Some(value) = resp.headers.get_front("last-modified") {
            stat.last_modified = Some(UtcTime::from_http_header_value(value)?);
        }
        if let Some(value) = resp.headers.get_front("x-amz-object-lock-mode") {
            stat.retention_mode = Some(RetentionMode::parse(value)?);
        }
        if let Some(value) = resp.headers.get_front("x-amz-object-lock-retain-until-date") {
            stat.retention_retain_until_date = Some(UtcTime::from_iso8601_utc(value)?);
        }
        if let Some(value) = resp.headers.get_front("x-amz-object-lock-legal-hold") {
            stat.legal_hold = Some(value == "ON");
        }
        if let Some(value) = resp.headers.get_front("x-amz-delete-marker") {
            stat.delete_marker = value == "true";
        }
        stat.user_metadata = user_metadata_of(&resp.headers);
        stat.headers = resp.headers;
        Ok(stat)
    }

    /// Streams an object's bytes into `on_data` in order; returning `false`
    /// aborts the download. Returns the response headers.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_object(
        &self,
        args: GetObjectArgs,
        on_data: &mut (dyn FnMut(&[u8]) -> bool + Send),
    ) -> Result<Multimap> {
        args.validate()?;
        self.check_ssec(args.ssec.as_ref())?;

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.object_name = args.object.clone();
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id.clone());
        }
        req.headers.add_all(&args.conditions.headers(args.ssec.as_ref())?);

        let resp = self.execute_with_data_fn(req, on_data).await?;
        Ok(resp.headers)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn remove_object(&self, args: RemoveObjectArgs) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::DELETE, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        self.execute(req).await?;
        Ok(())
    }

    /// Low-level single PUT; also carries upload-part query parameters.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn put_object_api(&self, args: PutObjectApiArgs) -> Result<PutObjectResponse> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;

        let mut req = self.new_request(Method::PUT, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        req.query_params.add_all(&args.query_params);
        req.headers.add_all(&args.headers);
        req.body = args.data;

        let resp = self.execute(req).await?;
        Ok(PutObjectResponse {
            etag: trim_etag(resp.headers.get_front("etag").unwrap_or_default()),
            version_id: resp.headers.get_front("x-amz-version-id").unwrap_or_default().to_owned(),
        })
    }

    /// Runs a SELECT query; `on_event` receives decoded records, progress
    /// and stats events. Returning `false` stops decoding.
    ///
    /// # Errors
    /// Returns an error on validation, request failure, a decode/CRC
    /// failure, or a server error event
    pub async fn select_object_content(
        &self,
        args: SelectObjectContentArgs,
        on_event: &mut (dyn FnMut(SelectEvent) -> bool + Send),
    ) -> Result<()> {
        args.validate()?;
        self.check_ssec(args.ssec.as_ref())?;

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::POST, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.object_name = args.object.clone();
        req.query_params.add("select", "");
        req.query_params.add("select-type", "2");
        if let Some(ssec) = &args.ssec {
            req.headers.add_all(&ssec.headers());
        }
        let body = args.request.to_xml();
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);

        let mut handler = SelectHandler::new(on_event);
        {
            let mut on_data = |chunk: &[u8]| handler.feed(chunk);
            self.execute_with_data_fn(req, &mut on_data).await?;
        }
        handler.finish()
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_object_tags(&self, args: GetObjectTagsArgs) -> Result<BTreeMap<String, String>> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        req.query_params.add("tagging", "");
        let resp = self.execute(req).await?;
        parse_tags(&resp.body)
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_object_tags(&self, args: SetObjectTagsArgs) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::PUT, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        req.query_params.add("tagging", "");
        let body = tags_to_xml(&args.tags);
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);
        self.execute(req).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn delete_object_tags(&self, args: DeleteObjectTagsArgs) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::DELETE, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        req.query_params.add("tagging", "");
        self.execute(req).await?;
        Ok(())
    }

    async fn put_legal_hold(&self, args: ObjectVersionRequest<'_>, enable: bool) -> Result<()> {
        let region = self.get_region(args.bucket, args.region).await?;
        let mut req = self.new_request(Method::PUT, region, args.extra_headers, args.extra_query_params);
        req.bucket_name = args.bucket.to_owned();
        req.object_name = args.object.to_owned();
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id.to_owned());
        }
        req.query_params.add("legal-hold", "");

        let mut w = XmlWriter::new();
        w.start("LegalHold")
            .leaf("Status", if enable { "ON" } else { "OFF" })
            .end("LegalHold");
        let body = w.finish();
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);
        self.execute(req).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn enable_object_legal_hold(&self, args: EnableObjectLegalHoldArgs) -> Result<()> {
        args.validate()?;
        self.put_legal_hold(ObjectVersionRequest::of(&args), true).await
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn disable_object_legal_hold(&self, args: DisableObjectLegalHoldArgs) -> Result<()> {
        args.validate()?;
        self.put_legal_hold(ObjectVersionRequest::of(&args), false).await
    }

    /// A missing object-lock configuration maps to `Ok(false)`.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn is_object_legal_hold_enabled(&self, args: IsObjectLegalHoldEnabledArgs) -> Result<bool> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        req.query_params.add("legal-hold", "");
        match self.execute(req).await {
            Ok(resp) => parse_legal_hold(&resp.body),
            Err(err) if err.is_s3_code("NoSuchObjectLockConfiguration") => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// A missing object-lock configuration yields `None`, not an error.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn get_object_retention(&self, args: GetObjectRetentionArgs) -> Result<Option<Retention>> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        req.query_params.add("retention", "");
        match self.execute(req).await {
            Ok(resp) => parse_object_retention(&resp.body),
            Err(err) if err.is_s3_code("NoSuchObjectLockConfiguration") => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn set_object_retention(&self, args: SetObjectRetentionArgs) -> Result<()> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::PUT, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket;
        req.object_name = args.object;
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id);
        }
        req.query_params.add("retention", "");

        let mut w = XmlWriter::new();
        w.start("Retention")
            .leaf("Mode", args.retention_mode.as_str())
            .leaf("RetainUntilDate", &args.retain_until_date.to_iso8601_utc()?)
            .end("Retention");
        let body = w.finish();
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);
        self.execute(req).await?;
        Ok(())
    }

    /// Produces a presigned URL embedding the signature in the query
    /// string. Without a provider the plain URL is returned.
    ///
    /// # Errors
    /// Returns an error on validation failure or a signing failure
    pub async fn get_presigned_object_url(&self, args: GetPresignedObjectUrlArgs) -> Result<String> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;

        let mut query_params = Multimap::new();
        query_params.add_all(&args.extra_query_params);
        if !args.version_id.is_empty() {
            query_params.add("versionId", args.version_id.clone());
        }

        let mut url = self
            .base_url()
            .build_url(&args.method, &region, &query_params, &args.bucket, &args.object)?;

        if let Some(provider) = self.provider() {
            let creds = provider.fetch().await?;
            if !creds.session_token.is_empty() {
                query_params.add("X-Amz-Security-Token", creds.session_token.clone());
            }
            let date = args.request_time.unwrap_or_else(UtcTime::now);
            signer::presign_v4(
                &args.method,
                &url.host,
                &url.path,
                &region,
                &mut query_params,
                &creds.access_key,
                creds.secret_key.expose(),
                date,
                args.expiry_seconds,
            )?;
            url.query_string = query_params.to_query_string();
        }

        Ok(url.to_string())
    }

    /// Produces the form fields for a presigned POST upload.
    ///
    /// # Errors
    /// Returns an error without a provider, or on a policy/signing failure
    pub async fn get_presigned_post_form_data(&self, policy: &PostPolicy) -> Result<BTreeMap<String, String>> {
        let Some(provider) = self.provider() else {
            return Err(Error::invalid_arg(
                "Anonymous access does not require presigned post form-data",
            ));
        };

        let region = self.get_region(&policy.bucket, &policy.region).await?;
        let creds = provider.fetch().await?;
        policy.form_data(
            &creds.access_key,
            creds.secret_key.expose(),
            &creds.session_token,
            &region,
        )
    }
}

/// Borrowed view of the common object+version argument fields.
struct ObjectVersionRequest<'a> {
    extra_headers: &'a Multimap,
    extra_query_params: &'a Multimap,
    bucket: &'a str,
    region: &'a str,
    object: &'a str,
    version_id: &'a str,
}

impl<'a> ObjectVersionRequest<'a> {
    fn of(args: &'a crate::args::ObjectVersionArgs) -> Self {
        Self {
            extra_headers: &args.extra_headers,
            extra_query_params: &args.extra_query_params,
            bucket: &args.bucket,
            region: &args.region,
            object: &args.object,
            version_id: &args.version_id,
        }
    }
}
