//! Integration tests using wiremock to simulate rate limited REST servers.

use futures::future::{self, BoxFuture, FutureExt};
use http::Method;
use ratewise::jitter::Jitter;
use ratewise::rate_limit::RateLimitConfig;
use ratewise::timer::Timer;
use ratewise::{
    Attachment, BasicCredentials, Body, Client, Credentials, Error, Outcome, RequestDescriptor,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{
    body_json, body_string, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Issue {
    key: String,
    summary: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Completes immediately and remembers each requested wait.
#[derive(Clone, Default)]
struct RecordingTimer {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingTimer {
    fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Timer for RecordingTimer {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.waits.lock().unwrap().push(duration);
        future::ready(()).boxed()
    }
}

/// Never completes; signals when a wait begins.
#[derive(Clone, Default)]
struct GatedTimer {
    entered: Arc<Notify>,
}

impl Timer for GatedTimer {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        self.entered.notify_one();
        future::pending().boxed()
    }
}

/// Always waits the full ceiling.
struct MaxJitter;

impl Jitter for MaxJitter {
    fn between(&self, _low: u64, high: u64) -> u64 {
        high
    }
}

/// Hands out a fresh token on every attempt.
#[derive(Clone, Default)]
struct RotatingToken {
    issued: Arc<AtomicUsize>,
}

impl Credentials for RotatingToken {
    fn authenticate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        request.bearer_auth(format!("token-{}", n))
    }
}

fn too_many_requests() -> ResponseTemplate {
    ResponseTemplate::new(429).set_body_string("Rate limit exceeded")
}

fn retrying_client(server: &MockServer, timer: impl Timer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_on_rate_limit(true)
        .timer(timer)
        .jitter(MaxJitter)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_returns_document() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/PROJ-1"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-1")
                .set_body_json(json!({"key": "PROJ-1", "summary": "Broken build"})),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let response = client.get("/rest/api/2/issue/PROJ-1").await.unwrap();

    assert_eq!(
        response.data,
        Outcome::Document(json!({"key": "PROJ-1", "summary": "Broken build"}))
    );
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
    assert_eq!(response.header("x-request-id"), Some("req-1"));

    let issue = response.json::<Issue>().unwrap();
    assert_eq!(issue.data.summary, "Broken build");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    init_tracing();
    let mock_server = MockServer::start().await;

    let issue = Issue {
        key: "PROJ-2".to_string(),
        summary: "Flaky test".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .and(body_json(&issue))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "10002"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let response = client.post("/rest/api/2/issue", &issue).await.unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.data.document(), Some(&json!({"id": "10002"})));
}

#[tokio::test]
async fn test_empty_bodies_are_no_content() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(201).set_body_string("  \n"))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let get = client.get("/empty").await.unwrap();
    assert!(get.data.is_no_content());

    let post = client.post("/empty", &json!({"a": 1})).await.unwrap();
    assert!(post.data.is_no_content());

    let put = client.put("/empty", &json!({"a": 2})).await.unwrap();
    assert!(put.data.is_no_content());
    assert_eq!(put.status.as_u16(), 204);
}

#[tokio::test]
async fn test_post_text_sends_quoted_string() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/PROJ-1/assignee"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#""jdoe""#))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let response = client
        .post_text("/rest/api/2/issue/PROJ-1/assignee", "jdoe")
        .await
        .unwrap();
    assert!(response.data.is_no_content());
}

#[tokio::test]
async fn test_post_attachments_sends_multipart() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/PROJ-1/attachments"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(header("x-atlassian-token", "nocheck"))
        .and(body_string_contains(r#"name="file"; filename="build.log""#))
        .and(body_string_contains("BUILD FAILED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let log = Attachment::new("build.log", "BUILD FAILED").with_content_type("text/plain");
    let response = client
        .post_attachments("/rest/api/2/issue/PROJ-1/attachments", [log])
        .await
        .unwrap();
    assert_eq!(response.data.document(), Some(&json!([{"id": "1"}])));
}

#[tokio::test]
async fn test_post_file_uploads_from_disk() {
    init_tracing();
    let mock_server = MockServer::start().await;

    let file = std::env::temp_dir().join(format!("ratewise-upload-{}.txt", std::process::id()));
    std::fs::write(&file, "stack trace follows").unwrap();
    let filename = file.file_name().unwrap().to_string_lossy().into_owned();

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/PROJ-2/attachments"))
        .and(header("x-atlassian-token", "nocheck"))
        .and(body_string_contains(format!(r#"filename="{}""#, filename)))
        .and(body_string_contains("application/octet-stream"))
        .and(body_string_contains("stack trace follows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "2"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.post_file("/rest/api/2/issue/PROJ-2/attachments", &file).await;
    std::fs::remove_file(&file).unwrap();
    assert_eq!(result.unwrap().data.document(), Some(&json!([{"id": "2"}])));

    let missing = client
        .post_file("/rest/api/2/issue/PROJ-2/attachments", &file)
        .await
        .unwrap_err();
    assert!(matches!(missing, Error::FileRead { .. }), "got {:?}", missing);
}

#[tokio::test]
async fn test_delete_request() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/api/2/issue/PROJ-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let response = client.delete("/rest/api/2/issue/PROJ-9").await.unwrap();
    assert!(response.data.is_no_content());
}

#[tokio::test]
async fn test_get_with_params_and_base_path() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jira/rest/api/2/search"))
        .and(query_param("jql", "project = PROJ"))
        .and(query_param("startAt", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/jira", mock_server.uri()))
        .unwrap()
        .build()
        .unwrap();

    let response = client
        .get_with_params("/rest/api/2/search", [("jql", "project = PROJ"), ("startAt", "50")])
        .await
        .unwrap();
    assert_eq!(response.data.document(), Some(&json!({"total": 0})));
}

#[tokio::test]
async fn test_http_error_keeps_reason_and_body() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/NOPE-1"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(r#"{"errorMessages":["Issue Does Not Exist"]}"#),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    let result = client.get("/rest/api/2/issue/NOPE-1").await;

    match result {
        Err(Error::Http {
            status,
            reason,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(reason, "Not Found");
            assert!(raw_response.contains("Issue Does Not Exist"));
        }
        other => panic!("Expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_keeps_server_reason_phrase() {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(
                b"HTTP/1.1 520 Origin Is Unreachable Today\r\n\
                  content-length: 0\r\n\
                  connection: close\r\n\r\n",
            )
            .await
            .unwrap();
    });

    let client = Client::builder()
        .base_url(format!("http://{}", address))
        .unwrap()
        .build()
        .unwrap();

    match client.get("/rest/api/2/serverInfo").await {
        Err(Error::Http { status, reason, .. }) => {
            assert_eq!(status.as_u16(), 520);
            assert_eq!(reason, "Origin Is Unreachable Today");
        }
        other => panic!("Expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_json_is_a_deserialization_error() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .build()
        .unwrap();

    match client.get("/broken").await {
        Err(Error::Deserialization {
            raw_response,
            status,
            ..
        }) => {
            assert_eq!(raw_response, "<html>maintenance</html>");
            assert_eq!(status.as_u16(), 200);
        }
        other => panic!("Expected Deserialization error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_429_without_retry_is_returned_after_one_request() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(too_many_requests().insert_header("Retry-After", "1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let timer = RecordingTimer::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timer(timer.clone())
        .build()
        .unwrap();

    let error = client.get("/limited").await.unwrap_err();
    assert!(error.is_rate_limited());
    assert_eq!(error.raw_response(), Some("Rate limit exceeded"));
    assert!(timer.waits().is_empty());
}

#[tokio::test]
async fn test_retry_after_is_honoured() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(too_many_requests().insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let timer = RecordingTimer::default();
    let client = retrying_client(&mock_server, timer.clone());

    let response = client.get("/limited").await.unwrap();

    assert_eq!(response.attempts, 2);
    assert!(response.was_retried());
    assert_eq!(timer.waits(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_gives_up_after_ten_retries() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            too_many_requests()
                .insert_header("X-RateLimit-Interval-Seconds", "1")
                .insert_header("X-RateLimit-FillRate", "100"),
        )
        .expect(11)
        .mount(&mock_server)
        .await;

    let timer = RecordingTimer::default();
    let client = retrying_client(&mock_server, timer.clone());

    let error = client.get("/limited").await.unwrap_err();
    assert!(error.is_rate_limited());
    assert_eq!(error.status().map(|s| s.as_u16()), Some(429));

    // 1000ms / 100 = 10ms, doubled to 20ms, then doubled per retry.
    let expected: Vec<Duration> = (0..10).map(|a| Duration::from_millis(20 << a)).collect();
    assert_eq!(timer.waits(), expected);
}

#[tokio::test]
async fn test_fail_fast_when_ceiling_exceeds_max_wait() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            too_many_requests()
                .insert_header("X-RateLimit-Interval-Seconds", "60")
                .insert_header("X-RateLimit-FillRate", "1"),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let timer = RecordingTimer::default();
    let client = retrying_client(&mock_server, timer.clone());

    let error = client.get("/slow").await.unwrap_err();
    assert!(error.is_fail_fast());

    let message = error.to_string();
    assert!(message.contains("Exponential backoff ceiling (240s) exceeds threshold"));
    assert!(message.contains("Retry-After: []"));
    assert!(message.contains("X-RateLimit-Interval-Seconds: [60]"));
    assert!(message.contains("X-RateLimit-FillRate: [1]"));

    assert_eq!(
        timer.waits(),
        vec![Duration::from_secs(60), Duration::from_secs(120)]
    );
}

#[tokio::test]
async fn test_custom_max_retries() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(too_many_requests())
        .expect(3)
        .mount(&mock_server)
        .await;

    let timer = RecordingTimer::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .rate_limit_config(RateLimitConfig::builder().enabled(true).max_retries(2).build())
        .timer(timer.clone())
        .build()
        .unwrap();

    let error = client.get("/limited").await.unwrap_err();
    assert!(error.is_rate_limited());
    assert_eq!(timer.waits().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_keep_independent_attempts() {
    init_tracing();
    let mock_server = MockServer::start().await;

    for name in ["/a", "/b", "/c"] {
        Mock::given(method("GET"))
            .and(path(name))
            .respond_with(too_many_requests().insert_header("Retry-After", "1"))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(name))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "path": name })))
            .mount(&mock_server)
            .await;
    }

    let timer = RecordingTimer::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_on_rate_limit(true)
        .max_in_flight(2)
        .timer(timer.clone())
        .jitter(MaxJitter)
        .build()
        .unwrap();

    let (a, b, c) = tokio::join!(client.get("/a"), client.get("/b"), client.get("/c"));

    for (response, name) in [(a, "/a"), (b, "/b"), (c, "/c")] {
        let response = response.unwrap();
        assert_eq!(response.attempts, 3);
        assert_eq!(response.data.document(), Some(&json!({ "path": name })));
    }

    let mut waits = timer.waits();
    waits.sort();
    assert_eq!(
        waits,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(2),
            Duration::from_secs(2),
        ]
    );
}

#[tokio::test]
async fn test_transport_failure_is_not_retried() {
    init_tracing();
    let timer = RecordingTimer::default();
    let client = Client::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .retry_on_rate_limit(true)
        .timer(timer.clone())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let error = client.get("/unreachable").await.unwrap_err();
    assert!(error.is_transport(), "expected transport error, got {:?}", error);
    assert!(timer.waits().is_empty());
}

#[tokio::test]
async fn test_cancel_during_backoff_stops_the_call() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(too_many_requests().insert_header("Retry-After", "30"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let timer = GatedTimer::default();
    let client = retrying_client(&mock_server, timer.clone());

    let url = client.build_url("/limited", [("page", "1")]);
    let handle = client.submit(RequestDescriptor::new(Method::GET, url));

    timer.entered.notified().await;
    handle.cancel();

    let result = handle.await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_credentials_are_applied_on_every_attempt() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .and(header("authorization", "Bearer token-0"))
        .respond_with(too_many_requests().insert_header("Retry-After", "1"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "automation"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = RotatingToken::default();
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .credentials(credentials.clone())
        .retry_on_rate_limit(true)
        .timer(RecordingTimer::default())
        .build()
        .unwrap();

    let response = client.get("/rest/api/2/myself").await.unwrap();
    assert_eq!(response.attempts, 2);
    assert_eq!(credentials.issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_basic_credentials_and_default_headers() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("user-agent", "release-bot/1.0"))
        .and(header("x-atlassian-token", "no-check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "user"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .credentials(BasicCredentials::new("user", "pass"))
        .default_header("User-Agent", "release-bot/1.0")
        .unwrap()
        .build()
        .unwrap();

    let url = client.build_url("/rest/api/2/myself", Vec::<(String, String)>::new());
    let request = RequestDescriptor::new(Method::GET, url)
        .with_header("X-Atlassian-Token", "no-check")
        .unwrap();
    let response = client.call(request).await.unwrap();
    assert_eq!(response.data.document(), Some(&json!({"name": "user"})));
}

#[tokio::test]
async fn test_request_headers_override_defaults() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "user"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("X-Env", "default")
        .unwrap()
        .default_header("Accept", "application/xml")
        .unwrap()
        .build()
        .unwrap();

    let url = client.build_url("/rest/api/2/myself", Vec::<(String, String)>::new());
    let request = RequestDescriptor::new(Method::GET, url)
        .with_header("X-Env", "override")
        .unwrap();
    client.call(request).await.unwrap();

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let env: Vec<_> = received[0].headers.get_all("x-env").iter().collect();
    assert_eq!(env, vec!["override"]);
    let accept: Vec<_> = received[0].headers.get_all("accept").iter().collect();
    assert_eq!(accept, vec!["application/xml"]);
}

#[tokio::test]
async fn test_retried_attempt_resends_the_same_body() {
    init_tracing();
    let mock_server = MockServer::start().await;

    let transition = json!({"transition": {"id": "31"}});

    Mock::given(method("POST"))
        .and(path("/transitions"))
        .and(body_json(&transition))
        .respond_with(too_many_requests())
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/transitions"))
        .and(body_json(&transition))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = retrying_client(&mock_server, RecordingTimer::default());

    let url = client.build_url("/transitions", [("expand", "fields")]);
    let request =
        RequestDescriptor::new(Method::POST, url).with_body(Body::json(&transition).unwrap());
    let response = client.call(request).await.unwrap();
    assert!(response.data.is_no_content());
    assert_eq!(response.attempts, 2);
}

#[test]
fn test_blocking_client_waits_for_the_whole_chain() {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mock_server = runtime.block_on(MockServer::start());

    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(too_many_requests().insert_header("Retry-After", "2"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/slow-limiter"))
            .respond_with(
                too_many_requests()
                    .insert_header("X-RateLimit-Interval-Seconds", "60")
                    .insert_header("X-RateLimit-FillRate", "1"),
            )
            .mount(&mock_server)
            .await;
    });

    let timer = RecordingTimer::default();
    let client = ratewise::blocking::Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_on_rate_limit(true)
        .timer(timer.clone())
        .jitter(MaxJitter)
        .worker_threads(1)
        .build()
        .unwrap();

    let response = client.get("/limited").unwrap();
    assert_eq!(response.attempts, 2);
    assert_eq!(response.data.document(), Some(&json!({"ok": true})));
    assert_eq!(timer.waits(), vec![Duration::from_secs(2)]);

    match client.delete("/missing") {
        Err(Error::Http { status, .. }) => assert_eq!(status.as_u16(), 404),
        other => panic!("Expected Http error, got {:?}", other),
    }

    match client.get("/slow-limiter") {
        Err(Error::FailFast(fail_fast)) => assert_eq!(fail_fast.ceiling, Duration::from_secs(240)),
        other => panic!("Expected fail-fast, got {:?}", other),
    }

    let unreachable = ratewise::blocking::Client::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .retry_on_rate_limit(true)
        .timeout(Duration::from_secs(5))
        .worker_threads(1)
        .build()
        .unwrap();
    let error = unreachable.get("/unreachable").unwrap_err();
    assert!(error.is_transport(), "expected transport error, got {:?}", error);

    drop(unreachable);
    drop(client);
    runtime.block_on(async move { drop(mock_server) });
}
