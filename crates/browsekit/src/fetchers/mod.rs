//! Page fetching
//!
//! The browser only needs "give me the body of this URL". The [`Fetcher`]
//! trait is that seam; [`HttpFetcher`] is the real implementation, and tests
//! plug in canned ones.

mod http;

pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::{FetchRequest, FetchedPage};
use async_trait::async_trait;

/// Something that can fetch a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Fetch the page, failing on transport errors and non-success statuses
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError>;
}
