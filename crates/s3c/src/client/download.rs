//! Object download to a local file.

use std::io::Write as _;

use http::Method;

use super::Client;
use crate::args::{DownloadObjectArgs, StatObjectArgs};
use crate::error::{Error, Result};

impl Client {
    /// Downloads an object to `filename`, writing through a temporary file
    /// named after the object's ETag and renaming atomically on success. On
    /// failure the temporary file is removed.
    ///
    /// # Errors
    /// Returns an error on validation, I/O or request failure
    pub async fn download_object(&self, args: DownloadObjectArgs) -> Result<()> {
        args.validate()?;
        if args.ssec.is_some() && !self.base_url().https {
            return Err(Error::invalid_arg(
                "SSE-C operation must be performed over a secure connection",
            ));
        }

        let stat = self
            .stat_object(StatObjectArgs {
                bucket: args.bucket.clone(),
                region: args.region.clone(),
                object: args.object.clone(),
                version_id: args.version_id.clone(),
                ssec: args.ssec.clone(),
                ..StatObjectArgs::default()
            })
            .await?;

        let mut temp_filename = args.filename.clone().into_os_string();
        temp_filename.push(format!(".{}.part.minio", urlencoding::encode(&stat.etag)));
        let temp_path = std::path::PathBuf::from(temp_filename);

        let mut file = std::fs::File::create(&temp_path)
            .map_err(|e| Error::invalid_arg(format!("unable to open file {}; {e}", temp_path.display())))?;

        let region = self.get_region(&args.bucket, &args.region).await?;
        let mut req = self.new_request(Method::GET, region, &args.extra_headers, &args.extra_query_params);
        req.bucket_name = args.bucket.clone();
        req.object_name = args.object.clone();
        if !args.version_id.is_empty() {
            req.query_params.add("versionId", args.version_id.clone());
        }
        if let Some(ssec) = &args.ssec {
            req.headers.add_all(&ssec.headers());
        }

        let mut write_error: Option<std::io::Error> = None;
        let result = {
            let mut on_data = |chunk: &[u8]| -> bool {
                match file.write_all(chunk) {
                    Ok(()) => true,
                    Err(err) => {
                        write_error = Some(err);
                        false
                    }
                }
            };
            self.execute_with_data_fn(req, &mut on_data).await
        };

        if write_error.is_none()
            && result.is_ok()
            && let Err(err) = file.flush()
        {
            write_error = Some(err);
        }
        drop(file);

        match (result, write_error) {
            (Ok(_), None) => {
                tokio::fs::rename(&temp_path, &args.filename).await?;
                Ok(())
            }
            (Ok(_), Some(err)) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(Error::Io(err))
            }
            (Err(err), _) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(err)
            }
        }
    }
}
