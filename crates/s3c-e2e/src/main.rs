//! Runs the end-to-end scenarios against a live S3-compatible endpoint.
//!
//! Configuration via environment:
//! - `S3C_E2E_ENDPOINT` (default `https://play.min.io`)
//! - `S3C_E2E_ACCESS_KEY` / `S3C_E2E_SECRET_KEY` (default play credentials)

#![allow(clippy::cast_possible_truncation)]

mod basic;
mod compose;
mod list;
mod multipart;
mod select;
mod utils;

use anyhow::Result;
use tracing::{error, info};

type Scenario = (&'static str, fn(&'static s3c::Client) -> futures_boxed::BoxFuture);

mod futures_boxed {
    pub type BoxFuture = std::pin::Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;
}

fn scenarios() -> Vec<Scenario> {
    vec![
        ("bucket lifecycle", |c| Box::pin(basic::bucket_lifecycle(c))),
        ("small put/get round trip", |c| Box::pin(basic::small_round_trip(c))),
        ("multipart put", |c| Box::pin(multipart::multipart_put(c))),
        ("compose two sources", |c| Box::pin(compose::compose_two_sources(c))),
        ("list 1010 objects", |c| Box::pin(list::list_many_objects(c))),
        ("select object content", |c| Box::pin(select::select_csv(c))),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let client: &'static s3c::Client = Box::leak(Box::new(utils::client()?));

    let mut failures = 0;
    for (name, scenario) in scenarios() {
        info!("running: {name}");
        match scenario(client).await {
            Ok(()) => info!("passed: {name}"),
            Err(err) => {
                error!("failed: {name}: {err:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} scenario(s) failed");
    }
    Ok(())
}
