//! Integration tests for `RedditSearchClient` using wiremock HTTP mocks.

use pitsent_core::RedditConfig;
use pitsent_sentiment::{
    RedditSearchClient, SearchError, SearchQuery, SearchSource, SortOrder, TimeFilter,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> RedditConfig {
    RedditConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        user_agent: "pitsent-tests/0.1".to_string(),
    }
}

fn test_client(base_url: &str) -> RedditSearchClient {
    RedditSearchClient::with_base_urls(&config(), 5, base_url, base_url)
        .expect("client construction should not fail")
}

fn query() -> SearchQuery {
    SearchQuery {
        query: "EA".to_string(),
        sort: SortOrder::Top,
        time_filter: TimeFilter::Day,
        limit: 25,
    }
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token,
            "token_type": "bearer",
            "expires_in": 86400
        })))
        .mount(server)
        .await;
}

fn listing() -> serde_json::Value {
    serde_json::json!({
        "kind": "Listing",
        "data": {
            "after": "t3_def",
            "children": [
                {
                    "kind": "t3",
                    "data": {
                        "id": "abc",
                        "title": "EA earnings thread",
                        "selftext": "Numbers look good",
                        "author": "trader1",
                        "subreddit": "stocks",
                        "created_utc": 1704110400.0,
                        "score": 42,
                        "num_comments": 7,
                        "url": "https://www.reddit.com/r/stocks/comments/abc/"
                    }
                },
                {
                    "kind": "t3",
                    "data": {
                        "id": "def",
                        "title": "FC 24 is EA's best in years",
                        "selftext": "",
                        "author": null,
                        "subreddit": "gaming",
                        "created_utc": 1704114000.0,
                        "score": 3,
                        "num_comments": 0,
                        "url": "https://i.redd.it/xyz.png"
                    }
                }
            ]
        }
    })
}

#[tokio::test]
async fn search_returns_parsed_page() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .and(header("Authorization", "Bearer tok-1"))
        .and(query_param("q", "EA"))
        .and(query_param("sort", "top"))
        .and(query_param("t", "day"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client.search(&query(), None).await.expect("should parse page");

    assert_eq!(page.after.as_deref(), Some("t3_def"));
    assert_eq!(page.posts.len(), 2);
    assert_eq!(page.posts[0].id, "abc");
    assert_eq!(page.posts[0].body, "Numbers look good");
    assert_eq!(page.posts[0].forum, "stocks");
    assert_eq!(page.posts[0].created_utc, 1_704_110_400);
    assert_eq!(page.posts[0].score, 42);
    assert_eq!(page.posts[0].num_comments, 7);
    assert!(page.posts[1].author.is_none());
}

#[tokio::test]
async fn cursor_is_forwarded() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .and(query_param("after", "t3_def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "after": null, "children": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client.search(&query(), Some("t3_def")).await.unwrap();

    assert!(page.posts.is_empty());
    assert!(page.after.is_none());
}

#[tokio::test]
async fn token_is_cached_between_searches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "tok" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.search(&query(), None).await.unwrap();
    client.search(&query(), None).await.unwrap();
}

#[tokio::test]
async fn rate_limit_carries_retry_hint() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "17"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.search(&query(), None).await.unwrap_err();

    assert!(
        matches!(
            err,
            SearchError::RateLimited {
                retry_after_secs: Some(17)
            }
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.search(&query(), None).await.unwrap_err();

    assert!(matches!(err, SearchError::Transient(_)), "got {err:?}");
}

#[tokio::test]
async fn rejected_credentials_are_auth_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.search(&query(), None).await.unwrap_err();

    assert!(matches!(err, SearchError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "old" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "new" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client.search(&query(), None).await.unwrap();

    assert_eq!(page.posts.len(), 2);
}
