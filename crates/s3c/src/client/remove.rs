//! Bulk delete: the per-batch API and the batching iterator.

use std::collections::VecDeque;

use bytes::Bytes;
use http::Method;

use super::Client;
use crate::args::RemoveObjectsArgs;
use crate::error::Result;
use crate::response::{RemoveObjectsResponse, parse_remove_objects};
use crate::types::{DeleteError, DeleteObject};
use crate::utils::md5sum_base64;
use crate::xml::XmlWriter;

/// At most this many keys go into one `DeleteObjects` request.
const DELETE_BATCH_SIZE: usize = 1000;

impl Client {
    /// One `DeleteObjects` request for up to 1000 keys.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn remove_objects_api(
        &self,
        args: &RemoveObjectsArgs,
        objects: &[DeleteObject],
    ) -> Result<RemoveObjectsResponse> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;

        let mut req = self.new_request(Method::POST, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add("delete", "");
        if args.bypass_governance_mode {
            req.headers.add("x-amz-bypass-governance-retention", "true");
        }

        let mut w = XmlWriter::new();
        w.start("Delete");
        if args.quiet {
            w.leaf("Quiet", "true");
        }
        for object in objects {
            w.start("Object");
            w.leaf("Key", &object.name);
            if !object.version_id.is_empty() {
                w.leaf("VersionId", &object.version_id);
            }
            w.end("Object");
        }
        w.end("Delete");
        let body = w.finish();

        req.headers.add("Content-Type", "application/xml");
        req.headers.add("Content-MD5", md5sum_base64(body.as_bytes()));
        req.body = Bytes::from(body);

        let resp = self.execute(req).await?;
        parse_remove_objects(&resp.body)
    }

    /// Deletes the keys produced by `objects` in batches of up to 1000,
    /// yielding per-key failures as they arrive. A transport error stops
    /// the iterator.
    #[must_use]
    pub fn remove_objects<I>(&self, args: RemoveObjectsArgs, objects: I) -> RemoveObjects<'_, I>
    where
        I: Iterator<Item = DeleteObject> + Send,
    {
        RemoveObjects {
            client: self,
            args,
            source: objects,
            errors: VecDeque::new(),
            done: false,
        }
    }
}

/// Batching bulk-delete iterator.
pub struct RemoveObjects<'a, I> {
    client: &'a Client,
    args: RemoveObjectsArgs,
    source: I,
    errors: VecDeque<DeleteError>,
    done: bool,
}

impl<I> RemoveObjects<'_, I>
where
    I: Iterator<Item = DeleteObject> + Send,
{
    /// Yields the next per-key failure, or `None` once every batch has been
    /// sent and no failures remain.
    pub async fn next(&mut self) -> Option<Result<DeleteError>> {
        loop {
            if let Some(error) = self.errors.pop_front() {
                return Some(Ok(error));
            }
            if self.done {
                return None;
            }

            let batch: Vec<DeleteObject> = self.source.by_ref().take(DELETE_BATCH_SIZE).collect();
            if batch.is_empty() {
                self.done = true;
                return None;
            }

            match self.client.remove_objects_api(&self.args, &batch).await {
                Ok(resp) => self.errors.extend(resp.errors),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
