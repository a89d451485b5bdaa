#![allow(clippy::unwrap_used)]
// Integration tests for `ScraperConnector` using wiremock.

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jss_api::{ConnectorConfig, Error, ScrapedResource, ScraperConnector};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ScraperConnector) {
    let server = MockServer::start().await;
    let config = ConnectorConfig::new(&server.uri(), "admin", "s3cret pw".to_owned()).unwrap();
    let web = ScraperConnector::new(config).unwrap();
    (server, web)
}

const DASHBOARD: &str = "<html><body><h1>Dashboard</h1></body></html>";

const LOGIN_PAGE: &str = r#"<html><body>
    <form method="post"><input name="username"><input type="password" name="password"></form>
    </body></html>"#;

const JCDS_PAGE: &str = r#"<html><body>
    <form id="jcds" method="post" action="packages.html?id=-1&amp;o=c">
      <input type="hidden" name="session-token" value="f00d">
      <input type="text" name="region" value="us-east-1">
    </form></body></html>"#;

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("username=admin"))
        .and(body_string_contains("password=s3cret+pw"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "JSESSIONID=web42; Path=/")
                .set_body_string(DASHBOARD),
        )
        .expect(1)
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_posts_form_and_keeps_cookie() {
    let (server, web) = setup().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/legacy/packages.html"))
        .and(query_param("id", "-1"))
        .and(query_param("o", "c"))
        .and(header("cookie", "JSESSIONID=web42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JCDS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!web.is_logged_in());
    web.login().await.unwrap();
    assert!(web.is_logged_in());

    let page = web
        .fetch_resource(ScrapedResource::JcdsConfiguration)
        .await
        .unwrap();
    let form = page.form("form#jcds").unwrap().unwrap();
    assert_eq!(form.field("session-token"), Some("f00d"));
    assert_eq!(form.field("region"), Some("us-east-1"));
}

#[tokio::test]
async fn test_login_posts_to_context_path_as_is() {
    let server = MockServer::start().await;
    let config =
        ConnectorConfig::new(&format!("{}/jamf/", server.uri()), "admin", "pw".to_owned())
            .unwrap();
    let web = ScraperConnector::new(config).unwrap();

    Mock::given(method("POST"))
        .and(path("/jamf"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DASHBOARD))
        .expect(1)
        .mount(&server)
        .await;

    web.login().await.unwrap();
    assert!(web.is_logged_in());
}

#[tokio::test]
async fn test_login_rejected_by_status() {
    let (server, web) = setup().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = web.login().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!web.is_logged_in());
}

#[tokio::test]
async fn test_login_page_served_again() {
    let (server, web) = setup().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(&server)
        .await;

    let result = web.login().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!web.is_logged_in());
}

// ── Pages and forms ─────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_form_round_trip() {
    let (server, web) = setup().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/legacy/packages.html"))
        .and(header("cookie", "JSESSIONID=web42"))
        .and(body_string_contains("session-token=f00d"))
        .and(body_string_contains("region=eu-central-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DASHBOARD))
        .expect(1)
        .mount(&server)
        .await;

    web.login().await.unwrap();

    let mut form = jss_api::ScrapedPage::new(
        url::Url::parse(&server.uri()).unwrap(),
        200,
        JCDS_PAGE.to_owned(),
    )
    .form("form#jcds")
    .unwrap()
    .unwrap();
    form.set("region", "eu-central-1");

    let page = web
        .submit_form(ScrapedResource::JcdsConfiguration.path(), &form.fields)
        .await
        .unwrap();
    assert_eq!(page.status(), 200);
    assert!(page.body().contains("Dashboard"));
}

#[tokio::test]
async fn test_fetch_page_failure() {
    let (server, web) = setup().await;

    Mock::given(method("GET"))
        .and(path("/missing.html"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<p>Not Found</p>"))
        .mount(&server)
        .await;

    let err = web.fetch_page("missing.html").await.unwrap_err();
    assert!(matches!(err, Error::Get { .. }), "got: {err:?}");
    assert!(err.is_not_found());
}
