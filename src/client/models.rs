//! Upstream payload models
//!
//! Job, task and client records are passed through as raw JSON. Only the
//! fields this layer reads get typed wrappers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Encoding job record, as returned by the encoding API
pub type Job = Value;

/// Most recent jobs, normally an array of [`Job`] records
pub type LatestJobs = Value;

/// Task list for one job
pub type JobTasks = Value;

/// Client list
pub type Clients = Value;

/// OMDb detail record. Empty when the title does not exist.
pub type MovieDetails = Map<String, Value>;

/// Body of `GET jobs/count/inprogress`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InProgressCount {
    pub count: u64,
}

/// OMDb search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching titles
    #[serde(rename = "Search", default)]
    pub search: Vec<Value>,

    /// Total match count across all pages (OMDb sends it as a string)
    #[serde(
        rename = "totalResults",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_results: Option<String>,
}

impl SearchResults {
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
    }

    /// Total match count, or 0 when absent or unparsable
    pub fn total(&self) -> u64 {
        self.total_results
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    /// IMDb id of the first match
    pub fn first_imdb_id(&self) -> Option<&str> {
        self.search.first()?.get("imdbID")?.as_str()
    }
}

/// True when an OMDb body signals "no results" (`{"Response": "False"}`)
pub fn omdb_signals_absence(body: &Value) -> bool {
    body.get("Response").and_then(Value::as_str) == Some("False")
}

/// Parse an OMDb `imdbRating` field, degrading anything unusable to 0.0
pub fn parse_rating(details: &MovieDetails) -> Option<f64> {
    let rating = match details.get("imdbRating")? {
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    rating.filter(|r| r.is_finite())
}
