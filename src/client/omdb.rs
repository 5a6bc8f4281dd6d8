//! OMDb movie metadata client

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::clock::{Clock, SystemClock};
use super::models::{MovieDetails, SearchResults, omdb_signals_absence, parse_rating};
use super::session::Session;
use super::MovieApi;
use crate::cache::{CacheCapacity, CacheTtl, TtlCache, cache_key};
use crate::error::{ApiError, ConfigError, Result};

/// Public OMDb endpoint
pub const OMDB_API_URL: &str = "http://www.omdbapi.com";

/// Request throttle for OMDb
const RATE_LIMIT_PER_SECOND: u32 = 5;

/// Unauthenticated client for the OMDb API
pub struct OmdbClient {
    session: Session,
    api_key: Option<String>,
    search_cache: TtlCache<SearchResults>,
}

impl OmdbClient {
    /// Create a client. Without an API key every lookup fails with
    /// [`ConfigError::MissingOmdbKey`].
    pub fn new(api_url: &str, api_key: Option<String>) -> Result<Self> {
        Self::with_clock(api_url, api_key, Arc::new(SystemClock))
    }

    pub fn with_clock(api_url: &str, api_key: Option<String>, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            session: Session::new(api_url, RATE_LIMIT_PER_SECOND)?,
            api_key,
            search_cache: TtlCache::new(
                "search_movie",
                CacheCapacity::MOVIE_SEARCH,
                CacheTtl::MOVIE_SEARCH,
                clock,
            ),
        })
    }

    pub fn open(&self) -> Result<()> {
        self.session.open()
    }

    pub fn close(&self) {
        self.session.close();
        log::debug!("Search cache: {:?}", self.search_cache.stats());
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingOmdbKey.into())
    }

    async fn fetch_search(&self, title: &str, page: u32, type_filter: &str) -> Result<SearchResults> {
        let page = page.to_string();
        let params = [
            ("apikey", self.api_key()?),
            ("s", title),
            ("type", type_filter),
            ("page", page.as_str()),
            ("r", "json"),
        ];

        let body: Value = self.session.get_json(&[], &params, None).await?;
        if omdb_signals_absence(&body) {
            log::warn!("No results found for: {}", title);
            return Ok(SearchResults::default());
        }

        let results: SearchResults = serde_json::from_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Unexpected search payload: {}", e)))?;
        log::info!("Found {} results for: {}", results.total(), title);
        Ok(results)
    }
}

#[async_trait]
impl MovieApi for OmdbClient {
    async fn search_movie(&self, title: &str, page: u32, type_filter: &str) -> Result<SearchResults> {
        let page_param = page.to_string();
        let key = cache_key(
            "search_movie",
            &[("title", title), ("page", &page_param), ("type", type_filter)],
        );

        self.search_cache
            .get_or_fetch(&key, || self.fetch_search(title, page, type_filter))
            .await
            .inspect_err(|e| log::error!("Error searching for movie {}: {}", title, e))
    }

    async fn get_movie_details(&self, imdb_id: &str) -> Result<MovieDetails> {
        let params = [("apikey", self.api_key()?), ("i", imdb_id)];

        let body: Value = self
            .session
            .get_json(&[], &params, None)
            .await
            .inspect_err(|e| log::error!("Error getting movie details for ID {}: {}", imdb_id, e))?;

        if omdb_signals_absence(&body) {
            log::warn!("Movie not found with ID: {}", imdb_id);
            return Ok(MovieDetails::new());
        }

        match body {
            Value::Object(details) => Ok(details),
            other => Err(ApiError::InvalidResponse(format!(
                "Expected a movie object, got: {}",
                other
            ))
            .into()),
        }
    }

    async fn get_movie_rating(&self, title: &str) -> Result<f64> {
        let results = self.search_movie(title, 1, "movie").await?;
        let Some(imdb_id) = results.first_imdb_id() else {
            return Ok(0.0);
        };

        let details = self.get_movie_details(imdb_id).await?;
        Ok(parse_rating(&details).unwrap_or_else(|| {
            log::warn!("Invalid rating for movie {}", title);
            0.0
        }))
    }
}
