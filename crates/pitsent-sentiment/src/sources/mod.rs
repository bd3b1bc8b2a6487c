//! Search source abstraction and the Reddit implementation.

mod reddit;

pub use reddit::RedditSearchClient;

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{SearchPage, SearchQuery};

/// A paged keyword search over the platform.
///
/// `after` is the opaque cursor from the previous [`SearchPage`]; `None`
/// requests the first page.
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(
        &self,
        query: &SearchQuery,
        after: Option<&str>,
    ) -> Result<SearchPage, SearchError>;
}
