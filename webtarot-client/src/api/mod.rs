//! REST client for the webtarot backend
//!
//! Routes live under `<base>/api/v1`. Every request carries the current
//! identity: `Authorization: Bearer <token>` once signed up or logged in,
//! otherwise `x-user-uuid: <anonymous id>`.

mod readings;
mod user;

use crate::{ClientError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;
use webtarot_common::store::Identity;

const USER_AGENT: &str = concat!("webtarot/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Backend API client
///
/// Cheap to share behind an `Arc`; the identity can be swapped after login
/// without rebuilding the client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    identity: RwLock<Option<Identity>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidInput(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidInput(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            identity: RwLock::new(None),
        })
    }

    pub fn with_identity(self, identity: Identity) -> Self {
        self.set_identity(Some(identity));
        self
    }

    pub fn set_identity(&self, identity: Option<Identity>) {
        match self.identity.write() {
            Ok(mut guard) => *guard = identity,
            Err(poisoned) => *poisoned.into_inner() = identity,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/api/v1/<segments...>`, each segment percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        api_url(&self.base_url, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.identity() {
            Some(identity) => {
                let (name, value) = identity.header();
                builder.header(name, value)
            }
            None => builder,
        }
    }
}

/// Append the API prefix and `segments` to `base`
pub(crate) fn api_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidInput(format!("Base URL cannot carry a path: {}", base)))?
        .pop_if_empty()
        .extend(API_PREFIX)
        .extend(segments);
    Ok(url)
}

/// Pass successful responses through, turn anything else into `ClientError::Http`
async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let is_json = is_json(&response);
    let body = response.text().await.unwrap_or_default();
    Err(http_error(status, is_json, &body))
}

/// Decode a JSON body after checking the status
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = error_for_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

/// `HTTP <status>: <detail>` from the JSON `error` field, the JSON body, or the text body
fn http_error(status: StatusCode, is_json: bool, body: &str) -> ClientError {
    let code = status.as_u16();
    let detail = if is_json {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => match value.get("error").and_then(|e| e.as_str()) {
                Some(error) => Some(error.to_string()),
                None => Some(value.to_string()),
            },
            Err(_) => None,
        }
    } else if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    };

    let message = match detail {
        Some(detail) => format!("HTTP {}: {}", code, detail),
        None => format!("HTTP {}", code),
    };
    ClientError::Http {
        status: code,
        message,
    }
}
