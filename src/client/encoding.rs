//! Encoding API client implementation

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::clock::{Clock, SystemClock};
use super::models::{Clients, InProgressCount, Job, JobTasks, LatestJobs};
use super::session::Session;
use super::token::{AuthContract, Credentials, TokenManager};
use super::EncodingApi;
use crate::cache::{CacheCapacity, CacheTtl, TtlCache, cache_key};
use crate::error::Result;

/// Request throttle for the encoding API
const RATE_LIMIT_PER_SECOND: u32 = 10;

/// Authenticated client for the encoding service
pub struct EncodingClient {
    session: Session,
    tokens: TokenManager,
    clients_cache: TtlCache<Clients>,
}

impl EncodingClient {
    /// Create a client for `api_url`. No network traffic happens until the
    /// first operation.
    pub fn new(api_url: &str, credentials: Credentials, contract: AuthContract) -> Result<Self> {
        Self::with_clock(api_url, credentials, contract, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api_url: &str,
        credentials: Credentials,
        contract: AuthContract,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            session: Session::new(api_url, RATE_LIMIT_PER_SECOND)?,
            tokens: TokenManager::new(credentials, contract, clock.clone()),
            clients_cache: TtlCache::new(
                "get_clients",
                CacheCapacity::CLIENTS,
                CacheTtl::CLIENTS,
                clock,
            ),
        })
    }

    pub fn open(&self) -> Result<()> {
        self.session.open()
    }

    pub fn close(&self) {
        self.session.close();
        log::debug!("Clients cache: {:?}", self.clients_cache.stats());
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Authenticated GET. Renews the token first when needed.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let token = self.tokens.ensure_valid(&self.session).await?;
        self.session.get_json(segments, &[], Some(&token)).await
    }
}

#[async_trait]
impl EncodingApi for EncodingClient {
    async fn get_job_by_name(&self, name: &str) -> Result<Job> {
        self.get(&["jobs", "name", name]).await
    }

    async fn get_job_tasks_by_id(&self, job_id: &str) -> Result<JobTasks> {
        self.get(&["jobs", job_id, "tasks"]).await
    }

    async fn get_clients(&self) -> Result<Clients> {
        let key = cache_key("get_clients", &[]);
        self.clients_cache
            .get_or_fetch(&key, || async {
                log::debug!("Fetching fresh clients data");
                self.get(&["clients"]).await
            })
            .await
    }

    async fn get_inprogress_jobs_count(&self) -> Result<u64> {
        let response: InProgressCount = self.get(&["jobs", "count", "inprogress"]).await?;
        Ok(response.count)
    }

    async fn get_latest_jobs(&self, limit: u32) -> Result<LatestJobs> {
        let limit = limit.to_string();
        self.get(&["jobs", "last", &limit]).await
    }
}
