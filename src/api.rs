// API client module: a small blocking HTTP client for the Dropstack auth
// endpoints (login, signup, password reset). Requests go through the
// `HttpTransport` trait so the client can be driven without a network.

use reqwest::blocking::Client;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::debug;

use crate::error::CredentialError;

/// Parsed JSON object returned by the auth endpoints.
pub type ApiResponse = Map<String, Value>;

/// Username, password and session token for a single auth call. Every
/// field is optional so that missing values are reported before any
/// request goes out.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// Authorization attached to a request.
#[derive(Debug, Clone, Copy)]
pub enum Authorization<'a> {
    None,
    Bearer(&'a str),
}

/// Status line and raw body of an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Sends a JSON POST and returns the response.
pub trait HttpTransport {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        auth: Authorization<'_>,
    ) -> Result<HttpResponse, CredentialError>;
}

/// Production transport backed by a blocking reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, CredentialError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        auth: Authorization<'_>,
    ) -> Result<HttpResponse, CredentialError> {
        let mut req = self.client.post(url).json(body);
        if let Authorization::Bearer(token) = auth {
            req = req.bearer_auth(token);
        }

        let res = req.send()?;
        let status = res.status();
        let body = res.text()?;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

/// Client for the auth endpoints under a base URL.
#[derive(Clone)]
pub struct ApiClient<T = ReqwestTransport> {
    transport: T,
    base_url: String,
}

impl ApiClient<ReqwestTransport> {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CredentialError> {
        Ok(Self::with_transport(ReqwestTransport::new()?, base_url))
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn with_transport(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in with username and password. The returned object normally
    /// carries the session `token`.
    pub fn login(&self, creds: &Credentials) -> Result<ApiResponse, CredentialError> {
        let username = required(&creds.username, "username")?;
        let password = required(&creds.password, "password")?;
        let url = self.endpoint("auth/login")?;

        let body = json!({ "username": username, "password": password });
        let res = self.transport.post_json(&url, &body, Authorization::None)?;
        parse_response(res, true)
    }

    /// Register a new account. The password may be left out, in which case
    /// the API sends its own activation mail.
    pub fn signup(&self, creds: &Credentials) -> Result<ApiResponse, CredentialError> {
        let username = required(&creds.username, "username")?;
        let url = self.endpoint("auth/signup")?;

        let body = json!({ "username": username, "password": creds.password });
        let res = self.transport.post_json(&url, &body, Authorization::None)?;
        parse_response(res, false)
    }

    /// Request a password reset for the logged-in user.
    pub fn reset(&self, creds: &Credentials) -> Result<ApiResponse, CredentialError> {
        let username = required(&creds.username, "username")?;
        let token = required(&creds.token, "token")?;
        let url = self.endpoint("auth/reset")?;

        let body = json!({ "username": username });
        let res = self
            .transport
            .post_json(&url, &body, Authorization::Bearer(token))?;
        parse_response(res, true)
    }

    fn endpoint(&self, path: &str) -> Result<String, CredentialError> {
        let base = self.base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(CredentialError::MissingParameter("url"));
        }
        let url = format!("{base}/{path}");
        debug!(%url, "auth request");
        Ok(url)
    }
}

fn required<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, CredentialError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(CredentialError::MissingParameter(name))
}

/// The body signal wins over the status code, so a 401 carrying
/// `{"message": "Unauthorized"}` is reported as `Unauthorized`.
fn parse_response(
    res: HttpResponse,
    check_unauthorized: bool,
) -> Result<ApiResponse, CredentialError> {
    debug!(status = res.status, "auth response");
    let parsed = serde_json::from_str::<Value>(&res.body);

    if check_unauthorized {
        if let Ok(Value::Object(map)) = &parsed {
            if map.get("message").and_then(Value::as_str) == Some("Unauthorized") {
                return Err(CredentialError::Unauthorized);
            }
        }
    }

    if res.status >= 400 {
        return Err(CredentialError::Http {
            status: res.status,
            status_text: res.status_text,
        });
    }

    match parsed {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CredentialError::InvalidResponse(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(CredentialError::InvalidResponse(e.to_string())),
    }
}
