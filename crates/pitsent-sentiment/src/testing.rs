//! Scripted collaborators shared by the pipeline unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::cancel::CancelToken;
use crate::error::SearchError;
use crate::sources::SearchSource;
use crate::types::{RawPost, SearchPage, SearchQuery, SortOrder};

type Script = VecDeque<Result<SearchPage, SearchError>>;

/// Search source that replays queued responses per `(query, sort)`.
///
/// Unscripted requests get an empty final page.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    scripts: Mutex<HashMap<(String, SortOrder), Script>>,
    calls: Mutex<Vec<(SearchQuery, Option<String>)>>,
    cancel_on_call: Mutex<Option<(usize, CancelToken)>>,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, query: &str, sort: SortOrder, result: Result<SearchPage, SearchError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry((query.to_string(), sort))
            .or_default()
            .push_back(result);
    }

    pub(crate) fn push_posts(&self, query: &str, sort: SortOrder, posts: Vec<RawPost>) {
        self.push(query, sort, Ok(SearchPage { posts, after: None }));
    }

    /// Trip `token` when the `n`th call (1-based) arrives.
    pub(crate) fn cancel_on_call(&self, n: usize, token: CancelToken) {
        *self.cancel_on_call.lock().unwrap() = Some((n, token));
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<(SearchQuery, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchSource for ScriptedSource {
    async fn search(
        &self,
        query: &SearchQuery,
        after: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((query.clone(), after.map(str::to_string)));
            calls.len()
        };
        if let Some((n, token)) = self.cancel_on_call.lock().unwrap().as_ref() {
            if *n == call_number {
                token.cancel();
            }
        }

        self.scripts
            .lock()
            .unwrap()
            .get_mut(&(query.query.clone(), query.sort))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }
}

pub(crate) fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub(crate) fn raw_post(id: &str, title: &str, created: DateTime<Utc>, score: i64) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: title.to_string(),
        body: String::new(),
        author: Some("someone".to_string()),
        forum: "gaming".to_string(),
        created_utc: created.timestamp(),
        score,
        num_comments: 0,
        url: format!("https://reddit.com/{id}"),
    }
}
