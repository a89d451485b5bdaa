#![allow(clippy::unwrap_used)]
// Integration tests for `XmlApiConnector` using wiremock.

use std::sync::Mutex;

use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{basic_auth, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jss_api::{
    Connector, ConnectorConfig, Element, Error, Failure, ObjectFactory, ObjectKind,
    RepositoryPrefs, XmlApiConnector,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig::new(&server.uri(), "api", "hunter2".to_owned()).unwrap()
}

async fn setup() -> (MockServer, XmlApiConnector) {
    let server = MockServer::start().await;
    let api = XmlApiConnector::new(config(&server)).unwrap();
    (server, api)
}

const PACKAGE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
    <package><id>42</id><name>Firefox.pkg</name><category>Browsers</category></package>";

const NOT_FOUND_PAGE: &str = "<html><body><p>Not Found</p>\
    <p>The server has not found anything matching the request URI</p></body></html>";

/// Records every `(kind, id)` it is asked to build.
#[derive(Default)]
struct RecordingFactory {
    calls: Mutex<Vec<(ObjectKind, u64)>>,
}

impl ObjectFactory for RecordingFactory {
    type Object = (ObjectKind, u64);

    async fn get_object(
        &self,
        _api: &XmlApiConnector<Self>,
        kind: ObjectKind,
        id: u64,
    ) -> Result<Self::Object, Error> {
        self.calls.lock().unwrap().push((kind, id));
        Ok((kind, id))
    }
}

// ── GET ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_parses_document_with_basic_auth() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/JSSResource/packages/id/42"))
        .and(basic_auth("api", "hunter2"))
        .and(header("accept", "application/xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PACKAGE))
        .expect(1)
        .mount(&server)
        .await;

    let doc = api.get("/packages/id/42").await.unwrap();
    assert_eq!(doc.tag, "package");
    assert_eq!(doc.find_text("name"), Some("Firefox.pkg"));
}

#[tokio::test]
async fn test_get_encodes_path_segments() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/JSSResource/packages/name/My%20Package"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<package/>"))
        .expect(1)
        .mount(&server)
        .await;

    let doc = api.get("/packages/name/My Package").await.unwrap();
    assert_eq!(doc.tag, "package");
}

#[tokio::test]
async fn test_get_not_found_keeps_status_and_body() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/JSSResource/packages/id/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string(NOT_FOUND_PAGE))
        .mount(&server)
        .await;

    let err = api.get("/packages/id/9").await.unwrap_err();
    assert!(matches!(err, Error::Get { .. }), "got: {err:?}");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.body(), Some(NOT_FOUND_PAGE));
    assert!(err.to_string().contains("Not Found"));
}

#[tokio::test]
async fn test_get_malformed_xml() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/JSSResource/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<packages><size>1</packages>"))
        .mount(&server)
        .await;

    let err = api.get("/packages").await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Get {
                failure: Failure::MalformedXml { .. },
                ..
            }
        ),
        "got: {err:?}"
    );
    assert_eq!(err.status(), None);
}

// ── POST ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_hands_created_id_to_factory_once() {
    let server = MockServer::start().await;
    let api = XmlApiConnector::with_factory(config(&server), RecordingFactory::default()).unwrap();

    Mock::given(method("POST"))
        .and(path("/JSSResource/packages/id/0"))
        .and(header("content-type", "text/xml"))
        .and(body_string("<package><name>Firefox.pkg</name></package>"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_string("<?xml version=\"1.0\"?><package><id>42</id></package>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let document = Element::new("package").with_child(Element::new("name").with_text("Firefox.pkg"));
    let created = api
        .post(ObjectKind::Package, &ObjectKind::Package.create_path(), &document)
        .await
        .unwrap();

    assert_eq!(created, (ObjectKind::Package, 42));
    assert_eq!(
        *api.factory().calls.lock().unwrap(),
        vec![(ObjectKind::Package, 42)]
    );
}

#[tokio::test]
async fn test_post_default_factory_fetches_created_object() {
    let (server, api) = setup().await;

    Mock::given(method("POST"))
        .and(path("/JSSResource/packages/id/0"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<package><id>42</id></package>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/JSSResource/packages/id/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PACKAGE))
        .expect(1)
        .mount(&server)
        .await;

    let created = api
        .post(
            ObjectKind::Package,
            "/packages/id/0",
            &Element::new("package").with_child(Element::new("name").with_text("Firefox.pkg")),
        )
        .await
        .unwrap();

    assert_eq!(created.id, 42);
    assert_eq!(created.kind, ObjectKind::Package);
    assert_eq!(created.name(), Some("Firefox.pkg"));
    assert_eq!(created.document.find_text("category"), Some("Browsers"));
}

#[tokio::test]
async fn test_post_rejected() {
    let server = MockServer::start().await;
    let api = XmlApiConnector::with_factory(config(&server), RecordingFactory::default()).unwrap();

    Mock::given(method("POST"))
        .and(path("/JSSResource/policies/id/0"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_string("<html><body><p>Conflict</p><p>Error: Duplicate name</p></body></html>"),
        )
        .mount(&server)
        .await;

    let err = api
        .post(ObjectKind::Policy, "/policies/id/0", &Element::new("policy"))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            Error::Post {
                failure: Failure::Status { status: 409, .. },
                ..
            }
        ),
        "got: {err:?}"
    );
    assert!(err.to_string().contains("Duplicate name"));
    assert!(api.factory().calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_without_id_in_answer() {
    let server = MockServer::start().await;
    let api = XmlApiConnector::with_factory(config(&server), RecordingFactory::default()).unwrap();

    Mock::given(method("POST"))
        .and(path("/JSSResource/scripts/id/0"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<script><name>x</name></script>"))
        .mount(&server)
        .await;

    let err = api
        .post(ObjectKind::Script, "/scripts/id/0", &Element::new("script"))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            Error::Post {
                failure: Failure::MissingId { .. },
                ..
            }
        ),
        "got: {err:?}"
    );
    assert!(api.factory().calls.lock().unwrap().is_empty());
}

// ── PUT ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_put_created_is_success() {
    let (server, api) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/JSSResource/packages/id/42"))
        .and(body_string("<package><name>Renamed.pkg</name></package>"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<package><id>42</id></package>"))
        .expect(1)
        .mount(&server)
        .await;

    api.put(
        "/packages/id/42",
        &Element::new("package").with_child(Element::new("name").with_text("Renamed.pkg")),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_put_ok_is_not_created() {
    let (server, api) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/JSSResource/packages/id/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<package/>"))
        .mount(&server)
        .await;

    let err = api
        .put("/packages/id/42", &Element::new("package"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Put {
                failure: Failure::UnexpectedStatus {
                    status: 200,
                    expected: 201,
                    ..
                },
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_put_rejected() {
    let (server, api) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/JSSResource/packages/id/42"))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let err = api
        .put("/packages/id/42", &Element::new("package"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Put { .. }), "got: {err:?}");
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.body(), Some("conflict"));
}

// ── DELETE ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_without_body() {
    let (server, api) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/42"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    api.delete("/packages/id/42", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_delete_with_body() {
    let (server, api) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/computergroups/id/3"))
        .and(body_string("<computer_group><computers/></computer_group>"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let payload = Element::new("computer_group").with_child(Element::new("computers"));
    api.delete("/computergroups/id/3", Some(&payload))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_not_found() {
    let (server, api) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string(NOT_FOUND_PAGE))
        .mount(&server)
        .await;

    let err = api.delete("/packages/id/404", None).await.unwrap_err();
    assert!(matches!(err, Error::Delete { .. }), "got: {err:?}");
    assert!(err.is_not_found());
    assert_eq!(err.body(), Some(NOT_FOUND_PAGE));
}

#[tokio::test]
async fn test_delete_error_body_cut_short_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await.unwrap();
        // Promises 100 bytes, sends 6, then hangs up.
        socket
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 100\r\n\r\n<p>Not")
            .await
            .unwrap();
    });

    let config = ConnectorConfig::new(&format!("http://{addr}"), "api", "pw".to_owned()).unwrap();
    let api = XmlApiConnector::new(config).unwrap();

    let err = api.delete("/packages/id/1", None).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert_eq!(err.body(), None);
}

// ── Connector state ─────────────────────────────────────────────────

#[tokio::test]
async fn test_policy_changes_apply_to_next_request() {
    let (server, mut api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/JSSResource/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<categories/>"))
        .expect(2)
        .mount(&server)
        .await;

    assert!(api.ssl_verify());
    api.get("/categories").await.unwrap();

    api.set_ssl_verify(false).unwrap();
    assert!(!api.ssl_verify());
    assert!(!api.config().ssl_verify());
    api.get("/categories").await.unwrap();
}

#[tokio::test]
async fn test_endpoint_and_repos() {
    let server = MockServer::start().await;
    let config = config(&server).with_repo_prefs(vec![
        RepositoryPrefs::named("CasperShare"),
        RepositoryPrefs::named("Cloud"),
    ]);
    let mut api = XmlApiConnector::new(config).unwrap();

    assert_eq!(api.api_url(), format!("{}/JSSResource", server.uri()));
    assert_eq!(api.distribution_points().len(), 2);

    api.set_endpoint("https://jss.example.com:8443/").unwrap();
    assert_eq!(api.endpoint().as_str(), "https://jss.example.com:8443");
    assert_eq!(api.api_url(), "https://jss.example.com:8443/JSSResource");
}
