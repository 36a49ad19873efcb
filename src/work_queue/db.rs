//! Database-backed work queue.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::{WorkQueue, WorkQueueError, NO_MATCHING_REQUEST};
use crate::matching::CapabilityFilter;
use crate::models::ClaimedRequest;
use crate::repository::DieselRequestRepository;

/// Candidates loaded per query while scanning for a match.
const CANDIDATE_BATCH: i64 = 100;

/// Optimistic claim attempts after the first one loses a race.
const CLAIM_RETRIES: usize = 1;

/// Work queue over the `requests` table.
///
/// Selection reads candidates in priority order and evaluates the
/// capability filter on each; the claim itself is a conditional update,
/// so concurrent pollers never share a live claim.
#[derive(Clone)]
pub struct DbWorkQueue {
    repo: DieselRequestRepository,
    lease: Duration,
}

impl DbWorkQueue {
    pub fn new(repo: DieselRequestRepository, lease: Duration) -> Self {
        Self { repo, lease }
    }

    /// First candidate the filter accepts, scanning in selection order.
    async fn select(
        &self,
        filter: &CapabilityFilter,
        now: DateTime<Utc>,
    ) -> Result<Option<ClaimedRequest>, WorkQueueError> {
        let groups = filter.browser_groups();
        if groups.is_empty() {
            return Ok(None);
        }

        let mut offset = 0;
        loop {
            let batch = self
                .repo
                .find_candidates(&groups, now, self.lease, offset, CANDIDATE_BATCH)
                .await?;
            let exhausted = (batch.len() as i64) < CANDIDATE_BATCH;

            if let Some(found) = batch
                .into_iter()
                .find(|c| filter.matches(&c.request, &c.group))
            {
                return Ok(Some(found));
            }
            if exhausted {
                return Ok(None);
            }
            offset += CANDIDATE_BATCH;
        }
    }
}

#[async_trait]
impl WorkQueue for DbWorkQueue {
    async fn find_and_claim(
        &self,
        filter: &CapabilityFilter,
        factory_id: i32,
        now: DateTime<Utc>,
    ) -> Result<ClaimedRequest, WorkQueueError> {
        for attempt in 0..=CLAIM_RETRIES {
            let Some(mut candidate) = self.select(filter, now).await? else {
                return Err(WorkQueueError::NotFound(NO_MATCHING_REQUEST.to_string()));
            };

            let request_id = candidate.request.id;
            let expected = candidate.request.claim;
            if self
                .repo
                .try_claim(request_id, factory_id, expected, now)
                .await?
            {
                if let Some(stale) = expected {
                    info!(
                        "Factory {} reclaimed request {} from stale claim by factory {}",
                        factory_id, request_id, stale.factory_id
                    );
                } else {
                    info!("Factory {} claimed request {}", factory_id, request_id);
                }
                candidate.request.claim = Some(crate::models::Claim {
                    factory_id,
                    locked_at: now,
                });
                return Ok(candidate);
            }

            debug!(
                "Factory {} lost claim race for request {} (attempt {})",
                factory_id,
                request_id,
                attempt + 1
            );
        }

        warn!(
            "Factory {} gave up after {} contended claim attempts",
            factory_id,
            CLAIM_RETRIES + 1
        );
        Err(WorkQueueError::NotFound(NO_MATCHING_REQUEST.to_string()))
    }

    async fn fulfill(
        &self,
        request_id: i32,
        factory_id: i32,
        now: DateTime<Utc>,
    ) -> Result<(), WorkQueueError> {
        if self
            .repo
            .fulfill(request_id, factory_id, now, self.lease)
            .await?
        {
            info!("Factory {} fulfilled request {}", factory_id, request_id);
            return Ok(());
        }

        match self.repo.get(request_id).await? {
            None => Err(WorkQueueError::NotFound(format!(
                "Request {} does not exist",
                request_id
            ))),
            Some(_) => {
                warn!(
                    "Factory {} tried to fulfill request {} without a live claim",
                    factory_id, request_id
                );
                Err(WorkQueueError::ClaimInvalid(request_id))
            }
        }
    }

    async fn release(&self, request_id: i32, factory_id: i32) -> Result<bool, WorkQueueError> {
        let released = self.repo.release_claim(request_id, factory_id).await?;
        if released {
            info!("Factory {} released request {}", factory_id, request_id);
        }
        Ok(released)
    }

    async fn release_stale_claims(&self, now: DateTime<Utc>) -> Result<usize, WorkQueueError> {
        let released = self.repo.release_stale_claims(now, self.lease).await?;
        if released > 0 {
            info!("Released {} stale claims", released);
        }
        Ok(released)
    }
}
