//! Feed retrieval: the [`HttpClient`] seam, its decorators, and the
//! [`FeedFetcher`] that ties them to the vault-held API key.

mod basic;
mod client;
mod feed;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use feed::FeedFetcher;

use anyhow::Result;
use reqwest::Url;

/// Issues one GET and returns the body. Non-2xx statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &Url) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
