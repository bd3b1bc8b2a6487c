use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post returned by the search source and tagged with the keyword and
/// ticker it was collected for.
///
/// `natural_id` is the platform's post id and the dedup key everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePost {
    pub natural_id: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub forum: String,
    pub created_at: DateTime<Utc>,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub source_url: String,
    pub matched_keyword: String,
    pub owning_ticker: String,
}

impl CandidatePost {
    /// Title and body joined with a single space, as fed to the scorer.
    #[must_use]
    pub fn text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.body)
        }
    }

    /// Case-insensitive substring match of `keyword` against title and body.
    #[must_use]
    pub fn mentions(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.body.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, body: &str) -> CandidatePost {
        CandidatePost {
            natural_id: "t3_abc".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            author: None,
            forum: "gaming".to_string(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            upvote_count: 0,
            comment_count: 0,
            source_url: String::new(),
            matched_keyword: "EA".to_string(),
            owning_ticker: "EA".to_string(),
        }
    }

    #[test]
    fn text_joins_title_and_body() {
        assert_eq!(post("Great", "game").text(), "Great game");
        assert_eq!(post("Title only", "").text(), "Title only");
    }

    #[test]
    fn mentions_is_case_insensitive() {
        let p = post("New BATTLEFIELD trailer", "");
        assert!(p.mentions("battlefield"));
        assert!(p.mentions("Battlefield"));
    }

    #[test]
    fn mentions_checks_body() {
        let p = post("Weekend plans", "Playing apex legends all night");
        assert!(p.mentions("Apex Legends"));
        assert!(!p.mentions("Madden"));
    }
}
