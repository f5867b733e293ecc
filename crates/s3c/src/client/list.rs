//! Listings: the per-page APIs and the lazy paginating iterator.

use std::collections::VecDeque;

use http::Method;

use super::Client;
use crate::args::ListObjectsArgs;
use crate::error::Result;
use crate::multimap::Multimap;
use crate::response::{ListObjectsResponse, parse_list_objects};
use crate::types::Item;

fn common_list_query(delimiter: &str, encoding_type: &str, max_keys: u32, prefix: &str) -> Multimap {
    let mut query = Multimap::new();
    query.add("delimiter", delimiter);
    let max_keys = if max_keys > 0 { max_keys } else { 1000 };
    query.add("max-keys", max_keys.to_string());
    query.add("prefix", prefix);
    if !encoding_type.is_empty() {
        query.add("encoding-type", encoding_type);
    }
    query
}

fn encoding_type(args: &ListObjectsArgs) -> &'static str {
    if args.use_url_encoding_type { "url" } else { "" }
}

impl Client {
    /// One `ListObjects` (V1) page.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn list_objects_v1(&self, args: &ListObjectsArgs) -> Result<ListObjectsResponse> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;

        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params
            .add_all(&common_list_query(&args.delimiter, encoding_type(args), args.max_keys, &args.prefix));
        if !args.marker.is_empty() {
            req.query_params.add("marker", args.marker.clone());
        }

        let resp = self.execute(req).await?;
        parse_list_objects(&resp.body, false)
    }

    /// One `ListObjectsV2` page.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn list_objects_v2(&self, args: &ListObjectsArgs) -> Result<ListObjectsResponse> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;

        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add("list-type", "2");
        req.query_params
            .add_all(&common_list_query(&args.delimiter, encoding_type(args), args.max_keys, &args.prefix));
        if !args.continuation_token.is_empty() {
            req.query_params.add("continuation-token", args.continuation_token.clone());
        }
        if args.fetch_owner {
            req.query_params.add("fetch-owner", "true");
        }
        if !args.start_after.is_empty() {
            req.query_params.add("start-after", args.start_after.clone());
        }
        if args.include_user_metadata {
            req.query_params.add("metadata", "true");
        }

        let resp = self.execute(req).await?;
        parse_list_objects(&resp.body, false)
    }

    /// One `ListObjectVersions` page.
    ///
    /// # Errors
    /// Returns an error on validation or request failure
    pub async fn list_object_versions(&self, args: &ListObjectsArgs) -> Result<ListObjectsResponse> {
        args.validate()?;
        let region = self.get_region(&args.bucket, &args.region).await?;

        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.query_params.add("versions", "");
        req.query_params
            .add_all(&common_list_query(&args.delimiter, encoding_type(args), args.max_keys, &args.prefix));
        if !args.key_marker.is_empty() {
            req.query_params.add("key-marker", args.key_marker.clone());
        }
        if !args.version_id_marker.is_empty() {
            req.query_params.add("version-id-marker", args.version_id_marker.clone());
        }

        let resp = self.execute(req).await?;
        parse_list_objects(&resp.body, true)
    }

    /// Lazy iterator over a full listing, paginating as needed. Each
    /// [`ListObjects::next`] yields one entry; an error terminates the
    /// iteration after being yielded once.
    #[must_use]
    pub fn list_objects(&self, args: ListObjectsArgs) -> ListObjects<'_> {
        ListObjects {
            client: self,
            args,
            buffer: VecDeque::new(),
            started: false,
            is_truncated: false,
            done: false,
        }
    }
}

/// Stateful listing cursor. Advancing copies the next page's marker into
/// the arguments and issues the matching listing call.
pub struct ListObjects<'a> {
    client: &'a Client,
    args: ListObjectsArgs,
    buffer: VecDeque<Item>,
    started: bool,
    is_truncated: bool,
    done: bool,
}

impl ListObjects<'_> {
    async fn fetch_page(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            self.args.validate()?;
            if self.args.recursive {
                self.args.delimiter = String::new();
            } else if self.args.delimiter.is_empty() {
                self.args.delimiter = "/".to_owned();
            }
        }

        let page = if self.args.include_versions || !self.args.version_id_marker.is_empty() {
            self.client.list_object_versions(&self.args).await?
        } else if self.args.use_api_v1 {
            self.client.list_objects_v1(&self.args).await?
        } else {
            self.client.list_objects_v2(&self.args).await?
        };

        self.is_truncated = page.is_truncated;
        if self.args.include_versions {
            self.args.key_marker = page.next_key_marker.clone();
            self.args.version_id_marker = page.next_version_id_marker.clone();
        } else if self.args.use_api_v1 {
            // V1 omits NextMarker without a delimiter; fall back to the
            // last listed key.
            self.args.marker = if page.next_marker.is_empty() {
                page.contents
                    .iter()
                    .rev()
                    .find(|item| !item.is_prefix)
                    .map(|item| item.name.clone())
                    .unwrap_or_default()
            } else {
                page.next_marker.clone()
            };
        } else {
            self.args.continuation_token = page.next_continuation_token.clone();
        }

        self.buffer.extend(page.contents);
        Ok(())
    }

    /// Yields the next entry, or `None` when the listing is exhausted.
    pub async fn next(&mut self) -> Option<Result<Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if self.started && !self.is_truncated {
                self.done = true;
                return None;
            }
            if let Err(err) = self.fetch_page().await {
                self.done = true;
                return Some(Err(err));
            }
        }
    }

    /// Drains the remaining entries into a vector, stopping at the first
    /// error.
    ///
    /// # Errors
    /// Returns the first error yielded by the listing
    pub async fn collect(mut self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }
}
