//! Integration tests for the GitHub contents API store.
//!
//! A wiremock server stands in for api.github.com and verifies the requests
//! the store sends: headers, query, conditional-write bodies, and the mapping
//! of status codes onto shelf errors.

use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use shelf_core::codec::encode_transport;
use shelf_core::{Error, RemoteStore, RepoRef, VersionToken};
use shelf_remote::{GitHubStore, RemoteConfig, TokenAuth};

const CONTENTS_PATH: &str = "/repos/octocat/shelf-data/contents/data/stars.json";

fn repo() -> RepoRef {
    RepoRef::new("octocat", "shelf-data")
}

fn store(server: &MockServer) -> GitHubStore {
    let config = RemoteConfig::default()
        .with_api_url(server.uri())
        .with_retries(2, 1);
    GitHubStore::new(config, Arc::new(TokenAuth::new("octocat", "ghp_test"))).unwrap()
}

/// Base64 wrapped at 60 columns, the way the contents API returns it.
fn wrapped_base64(text: &str) -> String {
    encode_transport(text)
        .as_bytes()
        .chunks(60)
        .map(|c| format!("{}\n", std::str::from_utf8(c).unwrap()))
        .collect()
}

#[tokio::test]
async fn test_read_file_decodes_unicode_content() {
    let server = MockServer::start().await;
    let document = "[\n  {\n    \"title\": \"大语言模型 🚀\"\n  }\n]\n";

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .and(query_param("ref", "main"))
        .and(header("Authorization", "Bearer ghp_test"))
        .and(header("Accept", "application/vnd.github+json"))
        .and(header("X-GitHub-Api-Version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "stars.json",
            "path": "data/stars.json",
            "sha": "3d21ec53a331a6f037a91c368710b99387d012c1",
            "encoding": "base64",
            "content": wrapped_base64(document),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = store(&server)
        .read_file(&repo(), "data/stars.json")
        .await
        .unwrap()
        .expect("file should exist");

    assert_eq!(file.content, document);
    assert_eq!(
        file.version.as_str(),
        "3d21ec53a331a6f037a91c368710b99387d012c1"
    );
}

#[tokio::test]
async fn test_read_missing_file_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let file = store(&server).read_file(&repo(), "data/stars.json").await.unwrap();
    assert!(file.is_none());
}

#[tokio::test]
async fn test_write_file_sends_version_token() {
    let server = MockServer::start().await;
    let document = "[]\n";

    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .and(body_partial_json(json!({
            "message": "Update stars",
            "content": encode_transport(document),
            "sha": "old-sha",
            "branch": "main",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {"name": "stars.json", "sha": "new-sha"},
            "commit": {"sha": "commit-sha"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let version = store(&server)
        .write_file(
            &repo(),
            "data/stars.json",
            document,
            Some(&VersionToken::new("old-sha")),
            "Update stars",
        )
        .await
        .unwrap();

    assert_eq!(version.as_str(), "new-sha");
}

#[tokio::test]
async fn test_create_file_omits_sha() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .and(|req: &Request| {
            serde_json::from_slice::<Value>(&req.body)
                .map(|body| body.get("sha").is_none())
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": {"sha": "created-sha"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let version = store(&server)
        .write_file(&repo(), "data/stars.json", "[]\n", None, "Initialize stars")
        .await
        .unwrap();
    assert_eq!(version.as_str(), "created-sha");
}

#[tokio::test]
async fn test_stale_sha_is_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "data/stars.json does not match 3d21ec53",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server)
        .write_file(
            &repo(),
            "data/stars.json",
            "[]\n",
            Some(&VersionToken::new("stale")),
            "Update stars",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_create_over_existing_file_is_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Invalid request.\n\n\"sha\" wasn't supplied.",
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .write_file(&repo(), "data/stars.json", "[]\n", None, "Initialize stars")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&server)
        .await;

    let err = store(&server)
        .read_file(&repo(), "data/stars.json")
        .await
        .unwrap_err();
    assert!(err.requires_login());
    assert!(err.to_string().contains("Bad credentials"));
}

#[tokio::test]
async fn test_forbidden_vs_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "1707552000")
                .set_body_json(json!({"message": "API rate limit exceeded"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/shelf-data"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "4999")
                .set_body_json(json!({"message": "Resource not accessible by integration"})),
        )
        .mount(&server)
        .await;

    let store = store(&server);

    let err = store
        .read_file(&repo(), "data/stars.json")
        .await
        .unwrap_err();
    match err {
        Error::RateLimited(msg) => assert!(msg.contains("resets at 2024-02-10")),
        other => panic!("Expected RateLimited, got {:?}", other),
    }

    let err = store.repository_exists(&repo()).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "abc",
            "encoding": "base64",
            "content": encode_transport("[]\n"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = store(&server)
        .read_file(&repo(), "data/stars.json")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(file.content, "[]\n");
}

#[tokio::test]
async fn test_persistent_server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = store(&server)
        .read_file(&repo(), "data/stars.json")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transient(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_create_repository_is_private_and_initialized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(body_partial_json(json!({
            "name": "shelf-data",
            "private": true,
            "auto_init": true,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"full_name": "octocat/shelf-data"})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).create_repository(&repo()).await.unwrap();
}

#[tokio::test]
async fn test_create_existing_repository_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Repository creation failed.",
            "errors": [{"message": "name already exists on this account"}],
        })))
        .mount(&server)
        .await;

    store(&server).create_repository(&repo()).await.unwrap();
}

#[tokio::test]
async fn test_repository_exists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/shelf-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"private": true})))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.repository_exists(&repo()).await.unwrap());
    assert!(!store
        .repository_exists(&RepoRef::new("octocat", "missing"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_signed_out_never_hits_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = GitHubStore::new(
        RemoteConfig::default().with_api_url(server.uri()),
        Arc::new(TokenAuth::signed_out()),
    )
    .unwrap();

    let err = store
        .read_file(&repo(), "data/stars.json")
        .await
        .unwrap_err();
    assert!(err.requires_login());
}
