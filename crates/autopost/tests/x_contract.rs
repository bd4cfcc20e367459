//! X API v2 Client Contract Tests
//!
//! Verify request shape, authentication and response parsing of `XClient`
//! against a mock server.

use autopost::config::XCredentials;
use autopost::error::AutopostError;
use autopost::x::{SortOrder, XApi, XClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> XClient {
    let creds = XCredentials {
        api_key: "consumer-key".into(),
        api_secret: "consumer-secret".into(),
        access_token: "access-token".into(),
        access_token_secret: "access-secret".into(),
        bearer_token: "bearer-token".into(),
        username: "me".into(),
    };
    XClient::new(creds).unwrap().with_base_url(server.uri())
}

async fn mount_user_lookup(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "42", "username": "me"}})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_sends_bearer_and_parses_metrics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("authorization", "Bearer bearer-token"))
        .and(query_param("query", "AIツール lang:ja -is:retweet -is:reply"))
        .and(query_param("max_results", "10"))
        .and(query_param("sort_order", "relevancy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "1",
                "text": "AIで仕事が変わる",
                "author_id": "7",
                "created_at": "2026-03-01T00:00:00.000Z",
                "public_metrics": {"like_count": 320, "retweet_count": 12, "reply_count": 3, "quote_count": 1}
            }],
            "meta": {"result_count": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posts = client(&server)
        .search_recent("AIツール lang:ja -is:retweet -is:reply", 5, SortOrder::Relevancy)
        .await
        .unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author_id.as_deref(), Some("7"));
    assert_eq!(posts[0].public_metrics.like_count, 320);
    assert_eq!(posts[0].public_metrics.impression_count, 0);
}

#[tokio::test]
async fn test_search_without_results_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})))
        .mount(&server)
        .await;

    let posts = client(&server)
        .search_recent("nothing", 10, SortOrder::Recency)
        .await
        .unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_forbidden_search_reports_status_and_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "title": "Forbidden",
            "detail": "When authenticating requests to the Twitter API v2 endpoints, you must use keys and tokens from a Project.",
            "status": 403
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .search_recent("AI", 10, SortOrder::Relevancy)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("Project"));
}

#[tokio::test]
async fn test_rate_limit_is_waited_out_once() {
    let server = MockServer::start().await;

    // Reset already passed, so the client waits the one-second minimum.
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(429).insert_header("x-rate-limit-reset", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "9", "text": "retry ok"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posts = client(&server)
        .search_recent("AI", 10, SortOrder::Recency)
        .await
        .unwrap();
    assert_eq!(posts[0].id, "9");
}

#[tokio::test]
async fn test_create_post_is_oauth_signed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({"text": "時間は最大の資産である。"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1001", "text": "時間は最大の資産である。"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let published = client(&server)
        .create_post("時間は最大の資産である。", None)
        .await
        .unwrap();
    assert_eq!(published.id, "1001");

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("OAuth "));
    assert!(auth.contains("oauth_signature_method=\"HMAC-SHA1\""));
    assert!(auth.contains("oauth_consumer_key=\"consumer-key\""));
}

#[tokio::test]
async fn test_reply_sets_in_reply_to() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(body_partial_json(json!({"reply": {"in_reply_to_tweet_id": "555"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1002", "text": "ありがとうございます！"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .create_post("ありがとうございます！", Some("555"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_overlong_post_never_reaches_the_api() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .create_post(&"長".repeat(141), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AutopostError::Validation(_)));
}

#[tokio::test]
async fn test_mentions_resolve_author_handles() {
    let server = MockServer::start().await;
    mount_user_lookup(&server).await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/mentions"))
        .and(query_param("since_id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "102", "text": "@me 参考になりました", "author_id": "7"},
                {"id": "101", "text": "@me 質問です", "author_id": "8"}
            ],
            "includes": {"users": [{"id": "7", "username": "alice"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mentions = client(&server).mentions(Some("100"), 20).await.unwrap();

    assert_eq!(mentions.len(), 2);
    assert_eq!(mentions[0].author_username, "alice");
    assert_eq!(mentions[1].author_username, "unknown");
}

#[tokio::test]
async fn test_like_uses_cached_user_id() {
    let server = MockServer::start().await;
    mount_user_lookup(&server).await;

    Mock::given(method("POST"))
        .and(path("/2/users/42/likes"))
        .and(body_partial_json(json!({"tweet_id": "77"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"liked": true}})))
        .expect(2)
        .mount(&server)
        .await;

    let x = client(&server);
    assert!(x.like("77").await.unwrap());
    assert!(x.like("77").await.unwrap());
}
