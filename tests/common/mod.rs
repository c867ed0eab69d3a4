#![allow(dead_code)]

use blog_api::configuration::{
    ApplicationSettings, AuthSettings, DatabaseSettings, Environment, JwtSettings,
    SecuritySettings, Settings, TelemetrySettings,
};
use blog_api::startup::run;
use blog_api::store::Stores;
use reqwest::header::SET_COOKIE;
use serde_json::{json, Value};
use std::net::TcpListener;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "longenough1";
pub const FRONTEND_ORIGIN: &str = "http://localhost:3000";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

/// A registered account: its access token and the raw refresh token
pub struct TestUser {
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
}

fn test_settings(port: u16) -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port,
            environment: Environment::Development,
        },
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "blog_api_test".to_string(),
            use_memory_store: true,
            max_connections: 1,
        },
        jwt: JwtSettings {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
            issuer: "blog_api_test".to_string(),
        },
        auth: AuthSettings {
            hash_cost: 4,
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        security: SecuritySettings {
            allowed_origins: vec![FRONTEND_ORIGIN.to_string()],
            rate_limit_per_minute: 0,
        },
        telemetry: TelemetrySettings::default(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like `spawn_app`, with a chance to adjust the settings first
pub async fn spawn_app_with(customize: impl FnOnce(&mut Settings)) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut settings = test_settings(port);
    customize(&mut settings);

    let server = run(listener, Stores::in_memory(), settings)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

/// Value of the `refreshToken` cookie set by a response, if any
pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim_start_matches("refreshToken=").to_string())
}

pub fn set_cookie_header(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .unwrap_or_default()
        .to_string()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    pub async fn post_register(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_refresh(&self, refresh_token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(self.url("/auth/refresh-token"));
        if let Some(token) = refresh_token {
            request = request.header("Cookie", format!("refreshToken={}", token));
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn register(&self, email: &str, role: Option<&str>) -> TestUser {
        let mut body = json!({ "email": email, "password": PASSWORD });
        if let Some(role) = role {
            body["role"] = json!(role);
        }

        let response = self.post_register(&body).await;
        assert_eq!(201, response.status().as_u16(), "registration of {} failed", email);

        let refresh_token = refresh_cookie(&response).expect("No refresh cookie set");
        let body: Value = response.json().await.expect("Failed to parse response");

        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            access_token: body["accessToken"].as_str().unwrap().to_string(),
            refresh_token,
        }
    }

    pub async fn register_admin(&self) -> TestUser {
        self.register(ADMIN_EMAIL, Some("admin")).await
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Publish a blog as `admin` and return its JSON
    pub async fn create_blog(&self, admin: &TestUser, title: &str, status: &str) -> Value {
        let response = self
            .post(
                "/blogs",
                &admin.access_token,
                &json!({ "title": title, "content": "<p>Body</p>", "status": status }),
            )
            .await;
        assert_eq!(201, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        body["blog"].clone()
    }
}
