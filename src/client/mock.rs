//! Mock API clients for testing
//!
//! Provide canned responses for the tool layer without making real API calls.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::models::{Clients, Job, JobTasks, LatestJobs, MovieDetails, SearchResults};
use super::{EncodingApi, MovieApi};
use crate::error::{ApiError, Result};

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub get_job_by_name: usize,
    pub get_job_tasks_by_id: usize,
    pub get_clients: usize,
    pub get_inprogress_jobs_count: usize,
    pub get_latest_jobs: usize,
    pub search_movie: usize,
    pub get_movie_details: usize,
    pub get_movie_rating: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.get_job_by_name
            + self.get_job_tasks_by_id
            + self.get_clients
            + self.get_inprogress_jobs_count
            + self.get_latest_jobs
            + self.search_movie
            + self.get_movie_details
            + self.get_movie_rating
    }
}

/// Mock encoding client.
///
/// # Example
/// ```ignore
/// let mock = MockEncodingClient::new().with_inprogress_count(3);
/// assert_eq!(mock.get_inprogress_jobs_count().await?, 3);
/// ```
#[derive(Default)]
pub struct MockEncodingClient {
    job: Value,
    tasks: Value,
    clients: Value,
    inprogress: u64,
    latest: LatestJobs,
    /// Error to return (if any) - consumed on first use
    error: Mutex<Option<ApiError>>,
    call_count: Arc<Mutex<CallCounts>>,
}

impl MockEncodingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(mut self, job: Value) -> Self {
        self.job = job;
        self
    }

    pub fn with_tasks(mut self, tasks: Value) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_clients(mut self, clients: Value) -> Self {
        self.clients = clients;
        self
    }

    pub fn with_inprogress_count(mut self, count: u64) -> Self {
        self.inprogress = count;
        self
    }

    pub fn with_latest(mut self, jobs: LatestJobs) -> Self {
        self.latest = jobs;
        self
    }

    pub fn with_error(mut self, error: ApiError) -> Self {
        self.error = Mutex::new(Some(error));
        self
    }

    pub async fn call_count(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    async fn take_error(&self) -> Result<()> {
        match self.error.lock().await.take() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EncodingApi for MockEncodingClient {
    async fn get_job_by_name(&self, _name: &str) -> Result<Job> {
        self.call_count.lock().await.get_job_by_name += 1;
        self.take_error().await?;
        Ok(self.job.clone())
    }

    async fn get_job_tasks_by_id(&self, _job_id: &str) -> Result<JobTasks> {
        self.call_count.lock().await.get_job_tasks_by_id += 1;
        self.take_error().await?;
        Ok(self.tasks.clone())
    }

    async fn get_clients(&self) -> Result<Clients> {
        self.call_count.lock().await.get_clients += 1;
        self.take_error().await?;
        Ok(self.clients.clone())
    }

    async fn get_inprogress_jobs_count(&self) -> Result<u64> {
        self.call_count.lock().await.get_inprogress_jobs_count += 1;
        self.take_error().await?;
        Ok(self.inprogress)
    }

    async fn get_latest_jobs(&self, limit: u32) -> Result<LatestJobs> {
        self.call_count.lock().await.get_latest_jobs += 1;
        self.take_error().await?;
        Ok(match &self.latest {
            Value::Array(jobs) => Value::Array(jobs.iter().take(limit as usize).cloned().collect()),
            other => other.clone(),
        })
    }
}

/// Mock movie client
#[derive(Default)]
pub struct MockMovieClient {
    search: SearchResults,
    details: MovieDetails,
    rating: f64,
    call_count: Arc<Mutex<CallCounts>>,
}

impl MockMovieClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: SearchResults) -> Self {
        self.search = search;
        self
    }

    pub fn with_details(mut self, details: MovieDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub async fn call_count(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }
}

#[async_trait]
impl MovieApi for MockMovieClient {
    async fn search_movie(&self, _title: &str, _page: u32, _type_filter: &str) -> Result<SearchResults> {
        self.call_count.lock().await.search_movie += 1;
        Ok(self.search.clone())
    }

    async fn get_movie_details(&self, _imdb_id: &str) -> Result<MovieDetails> {
        self.call_count.lock().await.get_movie_details += 1;
        Ok(self.details.clone())
    }

    async fn get_movie_rating(&self, _title: &str) -> Result<f64> {
        self.call_count.lock().await.get_movie_rating += 1;
        Ok(self.rating)
    }
}
