//! Redirect handling tests using wiremock.

use errand::{Client, Data, Error, ErrorKind, StatusCode, options};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string, method, path},
};

fn redirect(status: u16, location: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("Location", location)
}

#[tokio::test]
async fn test_redirect_not_followed_when_disallowed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(redirect(302, "/end"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let url = format!("{}/start", mock_server.uri());
    let response = errand::get(options![url.as_str(), false])
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/end"));
    assert_eq!(response.url().path(), "/start");
}

#[tokio::test]
async fn test_redirect_followed_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(redirect(301, "/middle"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/middle"))
        .respond_with(redirect(302, "end"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/start", mock_server.uri());
    let response = errand::get(options![url.as_str()]).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text(), "done");
    assert_eq!(response.url().path(), "/end");
    // the originating request is the one the caller built
    assert_eq!(
        response.request().url().map(errand::url::Url::path),
        Some("/start")
    );
}

#[tokio::test]
async fn test_too_many_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(redirect(302, "/loop"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = Client::builder().max_redirects(3).build();
    let url = format!("{}/loop", mock_server.uri());
    let err = client
        .get(options![url.as_str()])
        .await
        .expect_err("redirect loop");

    assert!(matches!(err, Error::TooManyRedirects { max: 3 }));
}

#[tokio::test]
async fn test_see_other_switches_to_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(redirect(303, "/result"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/submit", mock_server.uri());
    errand::post(options![url.as_str(), Data::new().with("a", "1")])
        .await
        .expect("response");

    let requests = mock_server.received_requests().await.expect("recorded");
    let followed = requests.get(1).expect("second request");
    assert!(followed.body.is_empty());
    assert!(followed.headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_temporary_redirect_keeps_method_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/old"))
        .respond_with(redirect(307, "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/new"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/old", mock_server.uri());
    let response = errand::put(options![url.as_str(), b"payload".to_vec()])
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_redirect_without_location_is_returned() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(302))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = errand::get(options![mock_server.uri()])
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_unresolvable_location_is_a_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(redirect(302, "http://[::1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = errand::get(options![mock_server.uri()])
        .await
        .expect_err("bad Location");

    assert!(matches!(err, Error::InvalidRedirect(_)), "unexpected error: {err}");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_before_dispatch());

    let requests = mock_server.received_requests().await.expect("recorded");
    assert_eq!(requests.len(), 1);
}
