//! Bounded concurrent tile downloads
//!
//! Every tile becomes one task in a [`JoinSet`]; a [`Semaphore`] caps how
//! many of them talk to the server at once. Results land in a map keyed by
//! tile coordinate once all tasks have joined, so completion order never
//! leaks into the output.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use bytes::Bytes;
use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::client::{FetchAttemptError, TileClient};
use super::provider::TileSource;
use crate::config::FetchSettings;
use crate::coordinate::TileCoordinate;
use crate::errors::{MosaicError, MosaicResult};
use crate::utils::progress::ProgressTracker;

type TaskOutput = Result<(TileCoordinate, Option<Bytes>, u32), (TileCoordinate, FetchAttemptError)>;

/// Downloaded tiles; `None` marks a tile the server does not have
#[derive(Debug, Clone, Default)]
pub struct FetchedTiles {
    pub tiles: BTreeMap<TileCoordinate, Option<Bytes>>,
    /// Requests issued, retries included
    pub attempts: u64,
}

impl FetchedTiles {
    pub fn present(&self) -> usize {
        self.tiles.values().filter(|t| t.is_some()).count()
    }

    pub fn missing(&self) -> usize {
        self.tiles.values().filter(|t| t.is_none()).count()
    }
}

/// Downloads tiles through a shared [`TileClient`]
pub struct TileFetcher {
    client: Arc<dyn TileClient>,
    settings: FetchSettings,
    quiet: bool,
}

impl TileFetcher {
    pub fn new(client: Arc<dyn TileClient>, settings: FetchSettings) -> Self {
        TileFetcher { client, settings, quiet: true }
    }

    /// Show a progress bar while downloading
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Fetch every tile in `tiles` from `source`
    ///
    /// Returns only once all tiles are resolved. The first tile that fails
    /// for good aborts the remaining downloads.
    pub async fn fetch_all(&self, source: &TileSource, tiles: &[TileCoordinate]) -> MosaicResult<FetchedTiles> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let progress = ProgressTracker::new(tiles.len() as u64, "Downloading tiles", self.quiet);
        let mut set: JoinSet<TaskOutput> = JoinSet::new();

        info!("Fetching {} tiles from {} ({} concurrent)", tiles.len(), source.name, self.settings.concurrency.max(1));

        for &tile in tiles {
            let url = source.url_for(&tile);
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let max_attempts = self.settings.max_attempts.max(1);
            let timeout = self.settings.request_timeout;

            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| (tile, FetchAttemptError::PoolClosed))?;
                fetch_with_retries(client.as_ref(), &url, max_attempts, timeout)
                    .await
                    .map(|(body, attempts)| (tile, body, attempts))
                    .map_err(|e| (tile, e))
            });
        }

        let result = match self.settings.overall_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, collect(&mut set, &progress)).await {
                Ok(result) => result,
                Err(_) => {
                    set.abort_all();
                    Err(MosaicError::Deadline(deadline))
                }
            },
            None => collect(&mut set, &progress).await,
        };

        match &result {
            Ok(fetched) => {
                progress.finish();
                debug!("Fetched {} tiles, {} absent, {} requests", fetched.present(), fetched.missing(), fetched.attempts);
            }
            Err(e) => progress.abandon(&e.to_string()),
        }
        result
    }
}

/// Drain the join set into the result map, aborting on the first hard failure
async fn collect(set: &mut JoinSet<TaskOutput>, progress: &ProgressTracker) -> MosaicResult<FetchedTiles> {
    let mut fetched = FetchedTiles::default();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok((tile, body, attempts))) => {
                fetched.attempts += attempts as u64;
                if body.is_none() {
                    debug!("Tile {} is absent", tile);
                }
                fetched.tiles.insert(tile, body);
                progress.increment(1);
            }
            Ok(Err((tile, error))) => {
                set.abort_all();
                return Err(MosaicError::Fetch { tile, reason: error.to_string() });
            }
            Err(join_error) => {
                set.abort_all();
                return Err(MosaicError::Worker(join_error.to_string()));
            }
        }
    }

    Ok(fetched)
}

/// Request one URL, retrying immediately on failure
///
/// 404 or an empty 2xx body is an absent tile. Any other non-2xx status,
/// transport error or timeout counts as a failed attempt.
async fn fetch_with_retries(
    client: &dyn TileClient,
    url: &str,
    max_attempts: u32,
    timeout: Duration,
) -> Result<(Option<Bytes>, u32), FetchAttemptError> {
    let mut last_error = FetchAttemptError::Request("no attempt made".to_string());

    for attempt in 1..=max_attempts {
        let outcome = match tokio::time::timeout(timeout, client.get(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchAttemptError::Timeout(timeout)),
        };

        match outcome {
            Ok(response) if response.is_missing() => return Ok((None, attempt)),
            Ok(response) if response.is_success() => return Ok((Some(response.body), attempt)),
            Ok(response) => last_error = FetchAttemptError::Status(response.status),
            Err(e) => last_error = e,
        }

        warn!("Attempt {}/{} for {} failed: {}", attempt, max_attempts, url, last_error);
    }

    Err(last_error)
}
