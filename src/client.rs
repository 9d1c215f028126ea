//! Backend API client
//!
//! Owns the HTTP client, the cookie jar and the CSRF token. Stores never
//! touch cookies themselves: reads go through `get_json`, writes through
//! `mutate`, which always fetches a fresh token first.

use crate::config::Config;
use crate::error::{extract_error_message, ApiError, Result};
use parking_lot::RwLock;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, REFERER};
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Cookie the backend stores the anti-forgery token in
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header mutations must carry the token in
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Endpoint that (re)sets the CSRF cookie
pub const CSRF_PATH: &str = "/user/get-csrf/";

/// Cookie jar that can be emptied on logout
#[derive(Default)]
struct SessionJar(RwLock<Jar>);

impl SessionJar {
    fn add_cookie_str(&self, cookie: &str, url: &Url) {
        self.0.read().add_cookie_str(cookie, url);
    }

    fn clear(&self) {
        *self.0.write() = Jar::default();
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.0.read().set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.0.read().cookies(url)
    }
}

/// Shared handle to the backend. Clones share cookies and token.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    jar: Arc<SessionJar>,
    config: Arc<Config>,
    csrf: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(config: Config) -> Result<Self> {
        let jar = Arc::new(SessionJar::default());

        let mut builder = Client::builder().cookie_provider(Arc::clone(&jar));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            jar,
            config: Arc::new(config),
            csrf: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token from the last refresh
    pub fn csrf_token(&self) -> Option<String> {
        self.csrf.read().clone()
    }

    pub fn set_csrf_token(&self, token: Option<String>) {
        *self.csrf.write() = token;
    }

    /// Forget every cookie and the CSRF token
    pub fn clear_session(&self) {
        self.jar.clear();
        *self.csrf.write() = None;
        debug!("Session cookies cleared");
    }

    /// Ask the backend for a fresh CSRF cookie and keep its value
    pub async fn refresh_csrf(&self) -> Result<String> {
        let url = self.config.endpoint(CSRF_PATH)?;
        let response = self.http.get(url.clone()).send().await?;
        let response = check_status(response).await?;

        let from_response = response
            .cookies()
            .find(|c| c.name() == CSRF_COOKIE)
            .map(|c| c.value().to_string());

        let token = from_response
            .or_else(|| self.cookie_value(&url, CSRF_COOKIE))
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingCsrf)?;

        debug!("CSRF token refreshed ({} chars)", token.len());
        *self.csrf.write() = Some(token.clone());
        Ok(token)
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_query(path, &[]).await
    }

    /// GET a JSON document with query parameters
    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.config.endpoint(path)?;
        debug!("GET {}", path);

        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = check_status(request.send().await?).await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }

    /// Refresh the CSRF token, then send one state-changing request
    pub async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let token = self.refresh_csrf().await?;
        self.send_with_token(method, path, body, &token).await
    }

    /// `mutate` without a body
    pub async fn mutate_empty(&self, method: Method, path: &str) -> Result<Response> {
        self.mutate::<Value>(method, path, None).await
    }

    /// `mutate` and decode the answer
    pub async fn mutate_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.mutate(method, path, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }

    /// Send a state-changing request with an already fetched token.
    ///
    /// Used by batch operations that share one refresh between many calls.
    pub async fn send_with_token<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: &str,
    ) -> Result<Response> {
        let url = self.config.endpoint(path)?;
        debug!("{} {}", method, path);

        let mut request = self
            .http
            .request(method, url)
            .header(CSRF_HEADER, token)
            .header(REFERER, self.config.api_url.as_str());

        request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_TYPE, "application/json"),
        };

        check_status(request.send().await?).await
    }

    /// Cookies the jar would send to the API, as a `Cookie` header value
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.config.api_url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    /// Put previously exported cookies back into the jar
    pub fn restore_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.jar.add_cookie_str(pair, &self.config.api_url);
        }
    }

    fn cookie_value(&self, url: &Url, name: &str) -> Option<String> {
        let header: HeaderValue = self.jar.cookies(url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

/// Turn non-2xx answers into `ApiError::Status` with the server's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(status, &body);
    debug!("API error {}: {}", status, message);
    Err(ApiError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_round_trip() {
        let client = ApiClient::new(Config::new("http://gate.lan").unwrap()).unwrap();
        assert!(client.cookie_header().is_none());

        client.restore_cookies("sessionid=abc123; csrftoken=tok");
        let header = client.cookie_header().unwrap();
        assert!(header.contains("sessionid=abc123"));
        assert!(header.contains("csrftoken=tok"));

        let url = client.config().endpoint(CSRF_PATH).unwrap();
        assert_eq!(client.cookie_value(&url, CSRF_COOKIE).as_deref(), Some("tok"));
    }

    #[test]
    fn test_token_holder() {
        let client = ApiClient::new(Config::new("http://gate.lan").unwrap()).unwrap();
        let clone = client.clone();
        client.set_csrf_token(Some("abc".to_string()));
        // Clones share the token
        assert_eq!(clone.csrf_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_clear_session() {
        let client = ApiClient::new(Config::new("http://gate.lan").unwrap()).unwrap();
        let clone = client.clone();
        client.restore_cookies("sessionid=abc123; csrftoken=tok");
        client.set_csrf_token(Some("tok".to_string()));

        clone.clear_session();
        assert!(client.cookie_header().is_none());
        assert!(client.csrf_token().is_none());

        // Still usable afterwards
        client.restore_cookies("sessionid=def456");
        assert_eq!(client.cookie_header().as_deref(), Some("sessionid=def456"));
    }
}
