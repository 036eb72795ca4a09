mod common;

use axum::http::StatusCode;
use claims::{assert_none, assert_some, assert_some_eq};
use common::{production_edge, TestApp};
use edge_gateway::infrastructure::config::EdgeConfig;
use rstest::rstest;

const HTTPS_HOST: [(&str, &str); 2] = [("host", "example.com"), ("x-forwarded-proto", "https")];

#[tokio::test]
async fn test_root_redirects_to_negotiated_locale_and_sets_cookie() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app.get_with_headers("/", &[("accept-language", "en")]).await;

    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_some_eq!(response.location(), "/en");
    let cookies = response.set_cookies();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("locale=en;"));
    assert!(cookies[0].contains("Path=/"));
    assert!(cookies[0].contains("Max-Age=31536000"));
    assert!(cookies[0].contains("SameSite=Lax"));
    assert!(!cookies[0].contains("Secure"));
}

#[tokio::test]
async fn test_matching_cookie_and_prefix_pass_through_without_cookie_write() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app.get_with_headers("/ru/lessons", &[("cookie", "locale=ru")]).await;

    response.assert_status(StatusCode::OK);
    assert!(response.set_cookies().is_empty());
    assert!(response.body.contains("<html lang=\"ru\">"));
}

#[tokio::test]
async fn test_stale_cookie_is_synced_to_path_locale() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app.get_with_headers("/uz", &[("cookie", "locale=en")]).await;

    response.assert_status(StatusCode::OK);
    let cookies = response.set_cookies();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("locale=uz;"));
}

#[tokio::test]
async fn test_csp_nonce_matches_rendered_nonce() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app.get_with_headers("/en/dashboard", &[("cookie", "locale=en")]).await;

    response.assert_status(StatusCode::OK);
    let nonce = assert_some!(response.csp_nonce());
    assert!(response.body.contains(&format!("<script nonce=\"{nonce}\">")));
}

#[tokio::test]
async fn test_nonce_differs_between_requests() {
    let app = TestApp::new(EdgeConfig::default());

    let first = app.get_with_headers("/en", &[("cookie", "locale=en")]).await;
    let second = app.get_with_headers("/en", &[("cookie", "locale=en")]).await;

    assert_ne!(first.csp_nonce(), second.csp_nonce());
}

#[rstest]
#[case("/", "https://example.com/")]
#[case("/en/lessons?page=2", "https://example.com/en/lessons?page=2")]
#[case("/about", "https://example.com/about")]
#[tokio::test]
async fn test_www_host_redirects_to_apex(#[case] path: &str, #[case] expected: &str) {
    let app = TestApp::new(EdgeConfig::default());

    let response = app.get_with_headers(path, &[("host", "www.example.com")]).await;

    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_some_eq!(response.location(), expected);
}

#[tokio::test]
async fn test_www_redirect_ignores_limiter_state() {
    let app = TestApp::new(EdgeConfig { rate_limit_threshold: 1, ..EdgeConfig::default() });
    let client = ("x-forwarded-for", "203.0.113.50");

    app.get_with_headers("/en", &[client, ("cookie", "locale=en")]).await;
    let limited = app.get_with_headers("/en", &[client, ("cookie", "locale=en")]).await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let response = app.get_with_headers("/en?q=1", &[client, ("host", "www.example.com")]).await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_some_eq!(response.location(), "https://example.com/en?q=1");
}

#[tokio::test]
async fn test_canonical_https_localized_url_never_redirects() {
    let app = TestApp::new(production_edge());
    let headers = [HTTPS_HOST[0], HTTPS_HOST[1], ("cookie", "locale=en")];

    for _ in 0..3 {
        let response = app.get_with_headers("/en/settings", &headers).await;
        response.assert_status(StatusCode::OK);
        assert_none!(response.location());
    }
}

#[tokio::test]
async fn test_production_http_request_is_upgraded_once() {
    let app = TestApp::new(production_edge());

    let response = app.get_with_headers("/en/settings?tab=2", &[("host", "www.example.com")]).await;

    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_some_eq!(response.location(), "https://example.com/en/settings?tab=2");
}

#[tokio::test]
async fn test_production_pages_carry_hsts_and_secure_cookie() {
    let app = TestApp::new(production_edge());

    let response = app.get_with_headers("/", &[HTTPS_HOST[0], HTTPS_HOST[1]]).await;

    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_some_eq!(response.location(), "/en");
    assert_some_eq!(
        response.header("strict-transport-security"),
        "max-age=63072000; includeSubDomains; preload"
    );
    assert!(response.set_cookies()[0].ends_with("; Secure"));
    let csp = response.header("content-security-policy").unwrap();
    assert!(csp.contains("upgrade-insecure-requests"));
}

#[tokio::test]
async fn test_development_pages_skip_hsts() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app
        .get_with_headers("/en", &[("host", "localhost:3000"), ("cookie", "locale=en")])
        .await;

    response.assert_status(StatusCode::OK);
    assert_none!(response.header("strict-transport-security"));
    assert_some_eq!(response.header("x-content-type-options"), "nosniff");
    assert_some_eq!(response.header("x-frame-options"), "DENY");
    assert_some_eq!(response.header("referrer-policy"), "strict-origin-when-cross-origin");
    assert_some_eq!(response.header("cross-origin-opener-policy"), "same-origin");
    assert_some_eq!(response.header("link"), "<http://localhost:3000/en>; rel=\"canonical\"");
}

#[tokio::test]
async fn test_malformed_host_fails_closed() {
    let app = TestApp::new(production_edge());

    let response =
        app.get_with_headers("/en", &[("host", "bad_host!"), ("cookie", "locale=en")]).await;

    response.assert_status(StatusCode::OK);
    assert_none!(response.header("strict-transport-security"));
    assert_none!(response.header("link"));
}

#[tokio::test]
async fn test_inbound_request_id_is_reused() {
    let app = TestApp::new(EdgeConfig::default());
    let request_id = "6f1c2b1e-8a8e-4d3c-9f0a-2b7c4d5e6f70";

    let response = app
        .get_with_headers("/en", &[("x-request-id", request_id), ("cookie", "locale=en")])
        .await;

    assert_some_eq!(response.header("x-request-id"), request_id);
}

#[rstest]
#[case("/api/health")]
#[case("/favicon.ico")]
#[case("/_static/app.js")]
#[case("/robots.txt")]
#[tokio::test]
async fn test_excluded_paths_skip_pipeline(#[case] path: &str) {
    let app = TestApp::new(production_edge());

    let response = app.get_with_headers(path, &[("host", "www.example.com")]).await;

    assert_ne!(response.status, StatusCode::MOVED_PERMANENTLY);
    assert_none!(response.header("content-security-policy"));
}

#[tokio::test]
async fn test_unsupported_cookie_falls_back_to_negotiation() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app
        .get_with_headers(
            "/lessons",
            &[("cookie", "locale=de"), ("accept-language", "ru-RU,ru;q=0.9")],
        )
        .await;

    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_some_eq!(response.location(), "/ru/lessons");
    assert!(response.set_cookies()[0].starts_with("locale=ru;"));
}

#[tokio::test]
async fn test_malformed_accept_language_uses_default_locale() {
    let app = TestApp::new(EdgeConfig::default());

    let response = app.get_with_headers("/", &[("accept-language", "ru;q=abc")]).await;

    assert_some_eq!(response.location(), "/en");
}
