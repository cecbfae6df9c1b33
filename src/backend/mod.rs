//! Minimal client for a PostgREST-compatible backend.
//!
//! Two operations are exposed: declarative table queries ([`Client::select`])
//! and named remote procedure calls ([`Client::rpc`]). Both live under
//! `<base>/rest/v1/` and authenticate with an `apikey` header plus an optional
//! `Authorization` header.

mod error;
pub mod query;

pub use self::error::Error;
pub use self::query::TableQuery;

use self::error::ErrorBody;
use reqwest::{Method, RequestBuilder, Response, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{Instrument, debug, info_span};
use url::Url;

const REST_PATH: &str = "rest/v1/";

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    rest_url: Url,
    api_key: Option<SecretString>,
    authorization: Option<SecretString>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("rest_url", &self.rest_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("authorization", &self.authorization.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client for the backend at `base_url`.
    ///
    /// The returned client sends no `Authorization` header; derive one with
    /// [`Client::with_service_role`] or [`Client::with_authorization`].
    ///
    /// # Errors
    /// Returns an error if `base_url` cannot be parsed or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Result<Self, Error> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            rest_url: base.join(REST_PATH)?,
            api_key,
            authorization: None,
        })
    }

    #[must_use]
    pub fn has_service_role(&self) -> bool {
        self.api_key.is_some()
    }

    /// A copy that authenticates as the service role, or `None` when no
    /// service credential is configured.
    #[must_use]
    pub fn with_service_role(&self) -> Option<Self> {
        let key = self.api_key.as_ref()?;
        let bearer = SecretString::from(format!("Bearer {}", key.expose_secret()));

        Some(Self {
            authorization: Some(bearer),
            ..self.clone()
        })
    }

    /// A copy that forwards the caller's `Authorization` header verbatim.
    #[must_use]
    pub fn with_authorization(&self, authorization: Option<&str>) -> Self {
        Self {
            authorization: authorization
                .filter(|value| !value.is_empty())
                .map(|value| SecretString::from(value.to_string())),
            ..self.clone()
        }
    }

    /// Run a table query and return the raw rows.
    ///
    /// # Errors
    /// Returns [`Error::Api`] when the backend rejects the query, or a
    /// transport/decoding error.
    pub async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, Error> {
        let url = self.rest_url.join(query.table())?;

        let span = info_span!("backend.select", http.method = "GET", table = query.table());
        let response = self
            .request(Method::GET, url)
            .query(&query.to_pairs())
            .send()
            .instrument(span)
            .await?;

        match decode(response).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    /// Invoke the remote procedure `function` with keyword arguments `args`.
    ///
    /// # Errors
    /// Returns [`Error::Api`] when the procedure reports an error, or a
    /// transport/decoding error.
    pub async fn rpc(&self, function: &str, args: &Value) -> Result<Value, Error> {
        let url = self.rest_url.join(&format!("rpc/{function}"))?;

        let span = info_span!("backend.rpc", http.method = "POST", function);
        let response = self
            .request(Method::POST, url)
            .json(args)
            .send()
            .instrument(span)
            .await?;

        decode(response).await
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.http.request(method, url);

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key.expose_secret());
        }

        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization.expose_secret());
        }

        request
    }
}

async fn decode(response: Response) -> Result<Value, Error> {
    let status = response.status();

    if !status.is_success() {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        debug!(
            "backend error {}: code={:?} details={:?} hint={:?}",
            status, body.code, body.details, body.hint
        );

        return Err(Error::Api {
            status,
            message: body.message,
        });
    }

    // Procedures returning `void` answer with an empty body.
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&bytes)?)
}
