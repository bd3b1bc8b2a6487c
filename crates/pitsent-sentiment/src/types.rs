use chrono::{DateTime, Utc};
use pitsent_core::CandidatePost;

/// Ranking requested from the search source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Top,
    New,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Top => "top",
            SortOrder::New => "new",
        }
    }
}

/// Time window the search source ranks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    Day,
    All,
}

impl TimeFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFilter::Day => "day",
            TimeFilter::All => "all",
        }
    }
}

/// One page request against the search source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub sort: SortOrder,
    pub time_filter: TimeFilter,
    /// Maximum posts in this page.
    pub limit: usize,
}

impl SearchQuery {
    /// Multi-word keywords are quoted so the source matches the phrase.
    #[must_use]
    pub fn phrase(keyword: &str) -> String {
        let keyword = keyword.trim();
        if keyword.contains(' ') {
            format!("\"{keyword}\"")
        } else {
            keyword.to_string()
        }
    }
}

/// A post as returned by the search source, before tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub forum: String,
    /// Epoch seconds.
    pub created_utc: i64,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
}

impl RawPost {
    /// Tag with the keyword and ticker it was collected for.
    ///
    /// Returns `None` when `created_utc` is outside the representable range.
    #[must_use]
    pub fn into_candidate(self, keyword: &str, ticker: &str) -> Option<CandidatePost> {
        let created_at: DateTime<Utc> = DateTime::from_timestamp(self.created_utc, 0)?;
        Some(CandidatePost {
            natural_id: self.id,
            title: self.title,
            body: self.body,
            author: self.author,
            forum: self.forum,
            created_at,
            upvote_count: self.score,
            comment_count: self.num_comments,
            source_url: self.url,
            matched_keyword: keyword.to_string(),
            owning_ticker: ticker.to_string(),
        })
    }
}

/// One page of search results plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub posts: Vec<RawPost>,
    pub after: Option<String>,
}
