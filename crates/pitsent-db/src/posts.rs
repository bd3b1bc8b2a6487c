//! Database operations for the `reddit_posts` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use pitsent_core::CandidatePost;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `reddit_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RedditPostRow {
    pub id: i64,
    pub reddit_id: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub subreddit: String,
    pub created_datetime: DateTime<Utc>,
    pub upvotes: i64,
    pub num_comments: i64,
    pub url: String,
    pub ticker: String,
    pub keyword_matched: String,
    pub collected_at: DateTime<Utc>,
}

impl RedditPostRow {
    #[must_use]
    pub fn into_candidate(self) -> CandidatePost {
        CandidatePost {
            natural_id: self.reddit_id,
            title: self.title,
            body: self.content,
            author: self.author,
            forum: self.subreddit,
            created_at: self.created_datetime,
            upvote_count: self.upvotes,
            comment_count: self.num_comments,
            source_url: self.url,
            matched_keyword: self.keyword_matched,
            owning_ticker: self.ticker,
        }
    }
}

/// Result of a batched [`insert_new_posts`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    /// Posts whose `reddit_id` already existed; only their counts were refreshed.
    pub skipped: usize,
}

/// Return the subset of `ids` already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn existing_reddit_ids(pool: &PgPool, ids: &[String]) -> Result<HashSet<String>, DbError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<String> =
        sqlx::query_scalar("SELECT reddit_id FROM reddit_posts WHERE reddit_id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().collect())
}

/// Insert posts keyed by `reddit_id`.
///
/// Existing rows keep their `collected_at`; only `upvotes` and
/// `num_comments` are refreshed. The whole batch runs in one transaction, so
/// any failure rolls back every row of this call.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn insert_new_posts(
    pool: &PgPool,
    posts: &[CandidatePost],
    collected_at: DateTime<Utc>,
) -> Result<InsertOutcome, DbError> {
    let mut tx = pool.begin().await?;
    let mut outcome = InsertOutcome::default();

    for post in posts {
        // xmax is 0 only for rows created by this statement.
        let inserted: bool = sqlx::query_scalar(
            "INSERT INTO reddit_posts \
                 (reddit_id, title, content, author, subreddit, created_datetime, \
                  upvotes, num_comments, url, ticker, keyword_matched, collected_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (reddit_id) DO UPDATE SET \
                 upvotes = EXCLUDED.upvotes, \
                 num_comments = EXCLUDED.num_comments, \
                 updated_at = NOW() \
             RETURNING (xmax = 0)",
        )
        .bind(&post.natural_id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.author)
        .bind(&post.forum)
        .bind(post.created_at)
        .bind(post.upvote_count)
        .bind(post.comment_count)
        .bind(&post.source_url)
        .bind(&post.owning_ticker)
        .bind(&post.matched_keyword)
        .bind(collected_at)
        .fetch_one(&mut *tx)
        .await?;

        if inserted {
            outcome.inserted += 1;
        } else {
            outcome.skipped += 1;
        }
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Posts for `ticker` created in `[from, until)`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts_in_window(
    pool: &PgPool,
    ticker: &str,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<RedditPostRow>, DbError> {
    let rows = sqlx::query_as::<_, RedditPostRow>(
        "SELECT id, reddit_id, title, content, author, subreddit, created_datetime, \
                upvotes, num_comments, url, ticker, keyword_matched, collected_at \
         FROM reddit_posts \
         WHERE ticker = $1 AND created_datetime >= $2 AND created_datetime < $3 \
         ORDER BY created_datetime ASC, id ASC",
    )
    .bind(ticker)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
