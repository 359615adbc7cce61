//! Example demonstrating rate limit handling against a simulated server.
//!
//! This example shows how to:
//! - Enable retrying of 429 responses
//! - Tune the retry budget and the longest tolerated backoff
//! - Tell a fail-fast apart from an ordinary HTTP error
//! - Cancel a call that is waiting out a backoff
//!
//! Run with: `RUST_LOG=ratewise=debug cargo run --example rate_limited`

use http::Method;
use ratewise::{rate_limit::RateLimitConfig, Client, Error, RequestDescriptor};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ratewise=info".into()))
        .init();

    let server = MockServer::start().await;

    // Two throttled answers, then a real one.
    Mock::given(method("GET"))
        .and(path("/rest/api/2/serverInfo"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/serverInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "9.4.0"})))
        .mount(&server)
        .await;

    // A limiter that refills one token a minute.
    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("X-RateLimit-Interval-Seconds", "60")
                .insert_header("X-RateLimit-FillRate", "1"),
        )
        .mount(&server)
        .await;

    println!("=== Example 1: Retrying throttled calls ===");

    let client = Client::builder()
        .base_url(server.uri())?
        .timeout(Duration::from_secs(10))
        .retry_on_rate_limit(true)
        .build()?;

    let info = client.get("/rest/api/2/serverInfo").await?;
    println!(
        "Got {:?} after {} attempts in {:?}\n",
        info.data.document(),
        info.attempts,
        info.latency
    );

    println!("=== Example 2: Failing fast on a slow limiter ===");

    let impatient = Client::builder()
        .base_url(server.uri())?
        .rate_limit_config(
            RateLimitConfig::builder()
                .enabled(true)
                .max_retries(5)
                .max_wait(Duration::from_secs(30))
                .build(),
        )
        .build()?;

    match impatient.get("/rest/api/2/search").await {
        Ok(response) => println!("Unexpected success: {:?}", response.data),
        Err(Error::FailFast(fail_fast)) => println!("{}\n", fail_fast),
        Err(e) => println!("Error: {}\n", e),
    }

    println!("=== Example 3: Retrying disabled ===");

    let plain = Client::builder().base_url(server.uri())?.build()?;
    match plain.get("/rest/api/2/search").await {
        Err(e) if e.is_rate_limited() => println!("Rate limited: {}\n", e),
        other => println!("Unexpected: {:?}\n", other),
    }

    println!("=== Example 4: Cancelling a waiting call ===");

    let url = client.build_url("/rest/api/2/search", [("jql", "project = PROJ")]);
    let handle = client.submit(RequestDescriptor::new(Method::GET, url));
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel();
    match handle.await {
        Err(Error::Cancelled) => println!("Call cancelled while backing off"),
        other => println!("Unexpected: {:?}", other),
    }

    Ok(())
}
