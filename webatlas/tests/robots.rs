use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webatlas::robots::{is_allowed_with_robots, RobotsTxt};

/// `fetch_for_domain` builds `http://{domain}/robots.txt`; a wiremock
/// server's own host:port pair is a valid "domain" for that purpose.
fn domain_for(server: &MockServer) -> String {
    server.address().to_string()
}

#[tokio::test]
async fn robots_fetch_and_allow_deny() {
    let server = MockServer::start().await;
    let body = "User-agent: *\nDisallow: /private\nAllow: /private/open\nCrawl-delay: 2\n";
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let robots = RobotsTxt::fetch_for_domain(&client, &domain_for(&server))
        .await
        .expect("robots fetched");

    assert!(!robots.is_allowed("webatlasbot", "/private/secret"));
    assert!(robots.is_allowed("webatlasbot", "/private/open/index"));
    assert_eq!(robots.crawl_delay("webatlasbot").unwrap().as_secs(), 2);
}

#[tokio::test]
async fn robots_union_of_specific_and_wildcard_sections() {
    let server = MockServer::start().await;
    let body = "User-agent: webatlasbot\nAllow: /public\n\nUser-agent: *\nDisallow: /private\n";
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let robots = RobotsTxt::fetch_for_domain(&client, &domain_for(&server))
        .await
        .expect("robots fetched");

    // The wildcard section's disallow still binds webatlasbot even though
    // it has its own section: the applicable ruleset is a union, not a
    // single best-matching group.
    assert!(robots.is_allowed("webatlasbot", "/public/page"));
    assert!(!robots.is_allowed("webatlasbot", "/private/page"));
}

#[tokio::test]
async fn robots_absent_defaults_to_allow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let result = RobotsTxt::fetch_for_domain(&client, &domain_for(&server)).await;

    assert!(result.is_none(), "missing robots should yield None");
    assert!(is_allowed_with_robots(None, "webatlasbot", "/any/path"));
}
