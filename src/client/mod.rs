//! Upstream API clients
//!
//! [`EncodingClient`] talks to the authenticated encoding service and
//! [`OmdbClient`] to the OMDb movie database. The tool layer only sees the
//! [`EncodingApi`] and [`MovieApi`] traits.

use async_trait::async_trait;

use crate::error::Result;

pub mod clock;
pub mod encoding;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod omdb;
pub mod session;
pub mod token;

pub use encoding::EncodingClient;
#[cfg(test)]
pub use mock::{MockEncodingClient, MockMovieClient};
pub use models::{Clients, Job, JobTasks, LatestJobs, MovieDetails, SearchResults};
pub use omdb::{OMDB_API_URL, OmdbClient};
pub use token::{AuthContract, Credentials};

/// Encoding service operations
#[async_trait]
pub trait EncodingApi: Send + Sync {
    /// Get a job by its name
    async fn get_job_by_name(&self, name: &str) -> Result<Job>;

    /// Get the tasks of a job
    async fn get_job_tasks_by_id(&self, job_id: &str) -> Result<JobTasks>;

    /// List all clients (hourly snapshot)
    async fn get_clients(&self) -> Result<Clients>;

    /// Number of jobs currently in progress
    async fn get_inprogress_jobs_count(&self) -> Result<u64>;

    /// The `limit` most recent jobs, passed through as returned. Callers
    /// enforce the allowed range.
    async fn get_latest_jobs(&self, limit: u32) -> Result<LatestJobs>;
}

/// Movie metadata operations
#[async_trait]
pub trait MovieApi: Send + Sync {
    /// Search titles. An upstream "no results" answer is an empty set, not an
    /// error.
    async fn search_movie(&self, title: &str, page: u32, type_filter: &str) -> Result<SearchResults>;

    /// Detail record for an IMDb id; empty when the id is unknown
    async fn get_movie_details(&self, imdb_id: &str) -> Result<MovieDetails>;

    /// IMDb rating of the best match for `title`, 0.0 when unavailable
    async fn get_movie_rating(&self, title: &str) -> Result<f64>;
}
