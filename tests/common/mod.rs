//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use langate_console::{ApiClient, Config, NotificationQueue, Notifier};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "tok123";

pub struct Harness {
    pub server: MockServer,
    pub client: ApiClient,
    pub queue: Arc<NotificationQueue>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with_age(86_400).await
    }

    pub async fn start_with_age(session_age_secs: u64) -> Self {
        let server = MockServer::start().await;
        let mut config = Config::new(&server.uri()).expect("config");
        config.session_cookie_age = std::time::Duration::from_secs(session_age_secs);
        let client = ApiClient::new(config).expect("client");
        Self {
            server,
            client,
            queue: Arc::new(NotificationQueue::new()),
        }
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.queue.clone()
    }

    /// CSRF endpoint that sets the `TOKEN` cookie, hit exactly `times` times
    pub async fn mount_csrf(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/user/get-csrf/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "csrftoken=tok123; Path=/")
                    .set_body_json(json!({"csrf": "CSRF cookie set"})),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// (method, path) of every request the server saw, in order
    pub async fn requests(&self) -> Vec<(String, String)> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| (r.method.to_string(), r.url.path().to_string()))
            .collect()
    }
}

pub fn user_json(role: &str) -> Value {
    json!({
        "id": 7,
        "username": "alice",
        "role": role,
        "is_active": true,
        "max_device_nb": 3,
        "tournament": "lol"
    })
}
