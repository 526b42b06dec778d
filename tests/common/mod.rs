use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use autovm::config::{Config, GoogleConfig, RegistrationMode};
use autovm::identity::{IdentityError, IdentityProvider, Profile};

pub const PASSWORD: &str = "password123";

/// Token-driven stand-in for Google's userinfo endpoint.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn exchange(&self, token: &str) -> Result<Profile, IdentityError> {
        match token {
            "google-ok" => Ok(Profile {
                email: Some("Social@Example.com".to_string()),
                name: Some("Social User".to_string()),
            }),
            "google-renamed" => Ok(Profile {
                email: Some("social@example.com".to_string()),
                name: Some("Someone Else".to_string()),
            }),
            "google-no-email" => Ok(Profile {
                email: None,
                name: Some("Nameless".to_string()),
            }),
            "google-bad-email" => Ok(Profile {
                email: Some("not-an-email".to_string()),
                name: None,
            }),
            "google-timeout" => Err(IdentityError::Transport(
                "Google API request failed: operation timed out".to_string(),
            )),
            _ => Err(IdentityError::Rejected {
                status: 401,
                body: "Invalid Credentials".to_string(),
            }),
        }
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> (Value, StatusCode) {
        self.post(
            "/api/v1/auth/register",
            &json!({ "email": email, "password": password, "name": name }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        self.post(
            "/api/v1/auth/login",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Unauthenticated POST with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register the first user (the platform admin), return its access token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register("admin@test.com", PASSWORD, "Admin").await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        assert_eq!(body["user"]["role"], "admin");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Self-register a customer, return (access token, user id).
    pub async fn customer(&self, email: &str) -> (String, String) {
        let (body, status) = self.register(email, PASSWORD, "Customer").await;
        assert_eq!(status, StatusCode::OK, "customer register failed: {body}");
        assert_eq!(body["user"]["role"], "customer");
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Register a guest under the customer holding `token`, return the guest JSON.
    pub async fn guest(&self, token: &str, email: &str, status: &str) -> Value {
        let (body, code) = self
            .post_auth(
                "/api/v1/guest-registration",
                token,
                &json!({ "email": email, "name": "Guest", "status": status }),
            )
            .await;
        assert_eq!(code, StatusCode::OK, "guest registration failed: {body}");
        body["guest"].clone()
    }

    /// Create a rate plan as admin, return the plan JSON.
    pub async fn rate_plan(&self, admin: &str, plan: &str, price: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/rate-plans",
                admin,
                &json!({ "plan": plan, "price": price, "vm_limit": 2, "backup_limit": 1 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create rate plan failed: {body}");
        body
    }

    pub async fn deposit(&self, token: &str, amount: Value) -> (Value, StatusCode) {
        self.post_auth(
            "/api/v1/billing-accounts/deposit",
            token,
            &json!({ "amount": amount }),
        )
        .await
    }

    pub async fn balance(&self, token: &str) -> (Value, StatusCode) {
        self.get_auth("/api/v1/billing-accounts/balance", token).await
    }

    pub async fn user_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn database_url_for(base_url: &str, db_name: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with open registration and a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(RegistrationMode::Open).await
}

pub async fn spawn_app_with(registration: RegistrationMode) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("autovm_test_{}", Uuid::now_v7().simple());

    // Connect to default postgres DB to create test DB
    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url_for(&base_url, "postgres"))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = database_url_for(&base_url, &db_name);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        registration,
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        google: GoogleConfig {
            userinfo_url: "http://127.0.0.1:9/userinfo".to_string(),
            timeout_secs: 1,
        },
    };

    let (app, _state) =
        autovm::build_app_with_identity(pool.clone(), config, Arc::new(FakeIdentity));

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url_for(&base_url, "postgres"))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
