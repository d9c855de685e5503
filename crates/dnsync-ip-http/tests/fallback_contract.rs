//! Contract Test: IP lookup fallback chain
//!
//! Constraints verified:
//! - The primary service is used when it answers
//! - A failing or wrong-family primary falls back to the next service
//! - The lookup fails only when every service failed
//! - Every call is a fresh lookup

use dnsync_core::{Error, IpSource};
use dnsync_ip_http::HttpIpSource;
use std::net::{Ipv4Addr, Ipv6Addr};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn service(server: &MockServer, route: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

fn source(server: &MockServer, v4: &[&str], v6: &[&str]) -> HttpIpSource {
    let urls = |routes: &[&str]| -> Vec<String> {
        routes
            .iter()
            .map(|r| format!("{}{}", server.uri(), r))
            .collect()
    };
    HttpIpSource::with_services(urls(v4), urls(v6)).unwrap()
}

#[tokio::test]
async fn primary_answer_is_used() {
    let server = MockServer::start().await;
    service(&server, "/primary", ResponseTemplate::new(200).set_body_string("203.0.113.7\n"), 1).await;
    service(&server, "/fallback", ResponseTemplate::new(200).set_body_string("198.51.100.1"), 0).await;

    let ip = source(&server, &["/primary", "/fallback"], &[])
        .current_v4()
        .await
        .unwrap();

    assert_eq!(ip, Ipv4Addr::new(203, 0, 113, 7));
}

#[tokio::test]
async fn failing_primary_falls_back() {
    let server = MockServer::start().await;
    service(&server, "/primary", ResponseTemplate::new(503), 1).await;
    service(&server, "/fallback", ResponseTemplate::new(200).set_body_string("198.51.100.1"), 1).await;

    let ip = source(&server, &["/primary", "/fallback"], &[])
        .current_v4()
        .await
        .unwrap();

    assert_eq!(ip, Ipv4Addr::new(198, 51, 100, 1));
}

#[tokio::test]
async fn wrong_family_falls_back() {
    let server = MockServer::start().await;
    service(&server, "/v6-primary", ResponseTemplate::new(200).set_body_string("203.0.113.7"), 1).await;
    service(&server, "/v6-fallback", ResponseTemplate::new(200).set_body_string("2001:db8::7"), 1).await;

    let ip = source(&server, &["/unused"], &["/v6-primary", "/v6-fallback"])
        .current_v6()
        .await
        .unwrap();

    assert_eq!(ip, "2001:db8::7".parse::<Ipv6Addr>().unwrap());
}

#[tokio::test]
async fn all_services_failing_is_an_error() {
    let server = MockServer::start().await;
    service(&server, "/primary", ResponseTemplate::new(500), 1).await;
    service(&server, "/fallback", ResponseTemplate::new(200).set_body_string("not an ip"), 1).await;

    let result = source(&server, &["/primary", "/fallback"], &[]).current_v4().await;

    match result {
        Err(Error::IpSource(message)) => assert!(message.contains("invalid IP address")),
        other => panic!("expected IP source error, got {:?}", other),
    }
}

#[tokio::test]
async fn every_call_is_a_fresh_lookup() {
    let server = MockServer::start().await;
    service(&server, "/primary", ResponseTemplate::new(200).set_body_string("203.0.113.7"), 3).await;

    let source = source(&server, &["/primary"], &[]);
    for _ in 0..3 {
        source.current_v4().await.unwrap();
    }
}
