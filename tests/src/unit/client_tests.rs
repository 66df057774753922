use super::test_runtime;
use abacus_core::client::{RequestOptions, SessionClient, REFRESH_PATH};
use abacus_core::credentials::{CredentialStore, MemoryCredentialStore, TokenKind};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEDGER_PATH: &str = "/api/scales/ledger/";

fn store_with(access: &str, refresh: &str) -> Arc<MemoryCredentialStore> {
    let store = Arc::new(MemoryCredentialStore::new());
    store.set(TokenKind::Access, access);
    store.set(TokenKind::Refresh, refresh);
    store
}

async fn requests_by_path(server: &MockServer, wanted: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == wanted)
        .collect()
}

#[test]
fn refresh_is_attempted_exactly_once_even_when_retry_fails() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("A1", "R1");
        let client = SessionClient::new(server.uri(), store);
        let response = client
            .request(LEDGER_PATH, RequestOptions::get())
            .await
            .expect("request");

        // The retried call is still unauthorized; no second refresh and no
        // further retries follow.
        assert_eq!(response.status(), 401);
        assert_eq!(requests_by_path(&server, LEDGER_PATH).await.len(), 2);
        assert_eq!(requests_by_path(&server, REFRESH_PATH).await.len(), 1);
    });
}

#[test]
fn unauthorized_without_refresh_token_is_returned_as_is() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_with("A1", "");
        let client = SessionClient::new(server.uri(), store);
        let response = client
            .request(LEDGER_PATH, RequestOptions::get())
            .await
            .expect("request");

        assert_eq!(response.status(), 401);
        assert_eq!(requests_by_path(&server, LEDGER_PATH).await.len(), 1);
    });
}

#[test]
fn failed_refresh_falls_back_to_the_original_response() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("original rejection"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "detail": "issuer down" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("A1", "R1");
        let client = SessionClient::new(server.uri(), store);
        let response = client
            .request(LEDGER_PATH, RequestOptions::get())
            .await
            .expect("request");

        // The refresh endpoint's response never surfaces; the caller sees
        // the original 401 and no retry happens.
        assert_eq!(response.status(), 401);
        assert_eq!(response.text().await.expect("body"), "original rejection");
        assert_eq!(requests_by_path(&server, LEDGER_PATH).await.len(), 1);
    });
}

#[test]
fn successful_refresh_retries_once_with_the_new_token() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let store = store_with("A1-stale", "R1");
        let client = SessionClient::new(server.uri(), store.clone());
        let response = client
            .request(LEDGER_PATH, RequestOptions::get())
            .await
            .expect("request");

        assert_eq!(response.status(), 200);
        assert_eq!(store.get(TokenKind::Access), "A2");

        // Exactly three calls hit the wire: the rejected original, the
        // refresh, and the single retry.
        let all = server.received_requests().await.unwrap_or_default();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].url.path(), LEDGER_PATH);
        assert_eq!(all[1].url.path(), REFRESH_PATH);
        assert_eq!(all[2].url.path(), LEDGER_PATH);

        let bearer = |request: &wiremock::Request| {
            request
                .headers
                .get("authorization")
                .map(|value| value.to_str().expect("ascii header").to_string())
        };
        assert_eq!(bearer(&all[0]).as_deref(), Some("Bearer A1-stale"));
        assert_eq!(bearer(&all[2]).as_deref(), Some("Bearer A2"));
    });
}

#[test]
fn non_unauthorized_errors_pass_through_without_refresh() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })))
            .expect(0)
            .mount(&server)
            .await;

        let store = store_with("A1", "R1");
        let client = SessionClient::new(server.uri(), store);
        let response = client
            .request(LEDGER_PATH, RequestOptions::get())
            .await
            .expect("request");

        assert_eq!(response.status(), 503);
    });
}

#[test]
fn refresh_without_access_field_still_retries_with_the_stored_token() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with("A1", "R1");
        let client = SessionClient::new(server.uri(), store.clone());
        let response = client
            .request(LEDGER_PATH, RequestOptions::get())
            .await
            .expect("request");

        assert_eq!(response.status(), 401);
        assert_eq!(store.get(TokenKind::Access), "A1");
        let ledger_calls = requests_by_path(&server, LEDGER_PATH).await;
        assert_eq!(ledger_calls.len(), 2);
        assert_eq!(
            ledger_calls[1]
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok()),
            Some("Bearer A1")
        );
    });
}

#[test]
fn caller_headers_are_sent_but_cannot_override_the_bearer() {
    let runtime = test_runtime();
    runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LEDGER_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = store_with("A1", "");
        let client = SessionClient::new(server.uri(), store);
        let options = RequestOptions::get()
            .header("X-Requested-With", "abacus")
            .header("Authorization", "Bearer forged");
        client.request(LEDGER_PATH, options).await.expect("request");

        let requests = requests_by_path(&server, LEDGER_PATH).await;
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;
        assert_eq!(
            headers.get("x-requested-with").unwrap().to_str().unwrap(),
            "abacus"
        );
        assert_eq!(
            headers.get("authorization").unwrap().to_str().unwrap(),
            "Bearer A1"
        );
    });
}
