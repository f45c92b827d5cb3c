use std::collections::HashMap;

use chrono::{Duration as ChronoDuration, Utc};
use fiscalhub_api::config::ApiConfig;
use fiscalhub_auth::JwtClaims;
use fiscalhub_core::UserId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";
const ADMIN_USERNAME: &str = "root";
const ADMIN_PASSWORD: &str = "root-password";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory storage, bound to an ephemeral port.
        let env: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", JWT_SECRET),
            ("ADMIN_USERNAME", ADMIN_USERNAME),
            ("ADMIN_PASSWORD", ADMIN_PASSWORD),
        ]);
        let config = ApiConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
            .expect("test config is valid");

        let app = fiscalhub_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn admin_token(&self) -> String {
        let res = self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn patch(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Register a user and return `(id, token)`.
    async fn register_and_login(&self, username: &str) -> (i64, String) {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": "pw", "inn": "7700000000" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let user: Value = res.json().await.unwrap();

        let res = self.login(username, "pw").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        (
            user["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_module(&self, admin: &str, factory_number: &str, owner: i64) -> Value {
        let res = self
            .post(
                admin,
                "/fiscal-modules",
                json!({ "fiscal_number": format!("FN-{factory_number}"), "factory_number": factory_number, "user_id": owner }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn provision(&self, token: &str, cash_register_number: &str) -> reqwest::Response {
        self.post(
            token,
            "/terminals",
            json!({
                "cash_register_number": cash_register_number,
                "assembly_number": "ASM-1",
                "inn": "7700000000",
                "company_name": "Acme",
                "address": "Main st. 1",
                "module_number": "MOD-1",
                "last_request_date": "2024-03-01T10:00:00Z",
                "free_record_balance": 100
            }),
        )
        .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: i64, is_admin: bool) -> String {
    let claims = JwtClaims::new(UserId::new(user_id), is_admin, Utc::now(), ChronoDuration::minutes(10));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("not-a-jwt", "/terminals").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn caller_identity_is_derived_from_token() {
    let srv = TestServer::spawn().await;

    let res = srv.get(&mint_jwt(42, false), "/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], 42);
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn login_rejects_wrong_password_and_hides_hash() {
    let srv = TestServer::spawn().await;

    let res = srv.login(ADMIN_USERNAME, "nope").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    let res = srv.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["is_admin"], true);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn self_registration_never_grants_admin() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "mallory", "password": "pw", "is_admin": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register_and_login("alice").await;

    assert_eq!(srv.get(&token, "/users").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.get(&token, "/fiscal-modules").await.status(), StatusCode::FORBIDDEN);
    let res = srv
        .client
        .delete(srv.url("/terminals/1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn provisioning_binds_owner_and_activates_module() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (alice_id, alice) = srv.register_and_login("alice").await;
    let module = srv.create_module(&admin, "CR-100", alice_id).await;
    assert_eq!(module["is_active"], false);

    // Any authenticated caller may provision; the owner comes from the module.
    let res = srv.provision(&mint_jwt(999, false), "CR-100").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let terminal: Value = res.json().await.unwrap();
    assert_eq!(terminal["user_id"], alice_id);
    assert_eq!(terminal["is_active"], true);
    assert_eq!(terminal["status_changed_by_admin"], false);

    let res = srv.get(&admin, &format!("/fiscal-modules/{}", module["id"])).await;
    let module: Value = res.json().await.unwrap();
    assert_eq!(module["is_active"], true);

    let res = srv.get(&alice, "/terminals").await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn provisioning_unknown_cash_register_is_not_found() {
    let srv = TestServer::spawn().await;
    let (_, alice) = srv.register_and_login("alice").await;

    let res = srv.provision(&alice, "CR-404").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn admin_status_change_locks_the_terminal_for_its_owner() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (alice_id, alice) = srv.register_and_login("alice").await;
    srv.create_module(&admin, "CR-200", alice_id).await;
    let terminal: Value = srv.provision(&alice, "CR-200").await.json().await.unwrap();
    let path = format!("/terminals/{}", terminal["id"]);

    // Owner may toggle while no admin has touched the status.
    let res = srv.patch(&alice, &path, json!({ "is_active": false })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["is_active"], false);
    assert_eq!(body["status_changed_by_admin"], false);

    let res = srv.patch(&admin, &path, json!({ "is_active": true })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status_changed_by_admin"], true);

    let res = srv.patch(&alice, &path, json!({ "is_active": false })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Other fields stay editable by the owner.
    let res = srv.patch(&alice, &path, json!({ "address": "New st. 2" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["address"], "New st. 2");
    assert_eq!(body["is_active"], true);

    let res = srv.get(&alice, &format!("{path}/status")).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "is_active": true }));
}

#[tokio::test]
async fn terminals_are_private_to_their_owner() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (alice_id, alice) = srv.register_and_login("alice").await;
    let (_, bob) = srv.register_and_login("bob").await;
    srv.create_module(&admin, "CR-300", alice_id).await;
    let terminal: Value = srv.provision(&alice, "CR-300").await.json().await.unwrap();
    let path = format!("/terminals/{}", terminal["id"]);

    assert_eq!(srv.get(&bob, &path).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        srv.patch(&bob, &path, json!({ "address": "x" })).await.status(),
        StatusCode::FORBIDDEN
    );
    let body: Value = srv.get(&bob, "/terminals").await.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());

    assert_eq!(srv.get(&admin, &path).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn exists_lookup_returns_terminal_id() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (alice_id, alice) = srv.register_and_login("alice").await;
    srv.create_module(&admin, "CR-400", alice_id).await;
    let terminal: Value = srv.provision(&alice, "CR-400").await.json().await.unwrap();

    let res = srv
        .post(&alice, "/terminals/exists", json!({ "cash_register_number": "CR-400" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], terminal["id"]);

    let res = srv
        .post(&alice, "/terminals/exists", json!({ "cash_register_number": "CR-missing" }))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_ids_are_rejected() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    assert_eq!(srv.get(&admin, "/terminals/abc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.get(&admin, "/terminals/12345").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn activation_endpoint_is_idempotent() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (alice_id, _) = srv.register_and_login("alice").await;
    let module = srv.create_module(&admin, "CR-500", alice_id).await;
    let path = format!("/fiscal-modules/{}/activate", module["id"]);

    for _ in 0..2 {
        let res = srv.post(&admin, &path, json!({})).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["is_active"], true);
    }

    let res = srv.get(&admin, "/fiscal-modules/by-fiscal-number/FN-CR-500").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_factory_number_conflicts() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (alice_id, _) = srv.register_and_login("alice").await;
    srv.create_module(&admin, "CR-600", alice_id).await;

    let res = srv
        .post(
            &admin,
            "/fiscal-modules",
            json!({ "fiscal_number": "FN-other", "factory_number": "CR-600", "user_id": alice_id }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn export_renders_csv_attachment_with_owner_login() {
    let srv = TestServer::spawn().await;
    let (alice_id, alice) = srv.register_and_login("alice").await;

    let res = srv
        .post(
            &alice,
            "/export",
            json!({
                "filename": "terminals",
                "objects": [{ "id": 1, "user_id": alice_id, "address": "Main st. 1" }]
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    assert!(
        res.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("filename=\"terminals.csv\"")
    );

    let body = res.text().await.unwrap();
    let mut lines = body.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("ID,"));
    assert!(lines.next().unwrap().contains("alice"));
}

#[tokio::test]
async fn export_renders_xlsx_workbook_on_request() {
    let srv = TestServer::spawn().await;
    let (_, alice) = srv.register_and_login("alice").await;

    let res = srv
        .post(
            &alice,
            "/export",
            json!({
                "filename": "terminals",
                "format": "xlsx",
                "objects": [{ "id": 1, "is_active": true, "address": "Main st. 1" }]
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(
        res.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("filename=\"terminals.xlsx\"")
    );
    let body = res.bytes().await.unwrap();
    assert!(body.starts_with(b"PK"));

    let res = srv
        .post(&alice, "/export", json!({ "format": "xlsx", "objects": [] }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

