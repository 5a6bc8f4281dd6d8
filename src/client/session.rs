//! Per-upstream connection context
//!
//! A [`Session`] binds one lazily built HTTP client to one base URL and
//! throttles every request it sends.

use std::num::NonZeroU32;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ConfigError, Result};

/// Per-request timeout applied by the HTTP client
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One live connection context for one upstream base URL.
///
/// `open` and `close` are idempotent. Requests issued while the session is
/// closed open it implicitly.
pub struct Session {
    base_url: Url,
    http: RwLock<Option<HttpClient>>,
    limiter: DirectLimiter,
}

impl Session {
    /// Create an unopened session for `base_url`, throttled to
    /// `requests_per_second`.
    pub fn new(base_url: &str, requests_per_second: u32) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!("'{}' cannot be used as a base URL", base_url)).into());
        }

        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            base_url,
            http: RwLock::new(None),
            limiter: RateLimiter::direct(quota),
        })
    }

    /// Build the HTTP client if none exists
    pub fn open(&self) -> Result<()> {
        let mut http = self.http.write().unwrap_or_else(PoisonError::into_inner);
        if http.is_none() {
            let client = HttpClient::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(ApiError::from)?;
            log::debug!("Opened session for {}", self.base_url);
            *http = Some(client);
        }
        Ok(())
    }

    /// Drop the HTTP client, releasing its connection pool
    pub fn close(&self) {
        let mut http = self.http.write().unwrap_or_else(PoisonError::into_inner);
        if http.take().is_some() {
            log::debug!("Closed session for {}", self.base_url);
        }
    }

    pub fn is_open(&self) -> bool {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Resolve path segments against the base URL, percent-encoding each one
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid(format!("'{}' cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn http(&self) -> Result<HttpClient> {
        self.open()?;
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ApiError::Network("session closed during request".to_string()).into())
    }

    /// GET `segments` with an optional query string and bearer token
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<T> {
        let url = self.url(segments)?;
        let mut request = self.http()?.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        self.send(request).await
    }

    /// POST a JSON body to `segments`
    pub async fn post_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.url(segments)?;
        let request = self.http()?.post(url).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.limiter.until_ready().await;

        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Ok(data)
    }
}
