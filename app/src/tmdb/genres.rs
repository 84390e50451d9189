use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use super::types::{Genre, MediaType};
use crate::error::TmdbError;

#[derive(Debug, Default)]
struct GenreSlot {
    genres: OnceCell<Vec<Genre>>,
    loading: Mutex<()>,
    failed_loads: AtomicU64,
}

/// Session-wide genre lists, one per media type. Populated on first use and never
/// invalidated.
///
/// One load runs at a time per media type. Callers that queued behind a load share
/// its outcome: the cached list on success, an empty slice on failure. Only a call
/// that starts after a failed load tries again.
#[derive(Debug, Default)]
pub struct GenreCache {
    movie: GenreSlot,
    tv: GenreSlot,
}

impl GenreCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, media_type: MediaType) -> &GenreSlot {
        match media_type {
            MediaType::Movie => &self.movie,
            MediaType::Tv => &self.tv,
        }
    }

    pub fn is_populated(&self, media_type: MediaType) -> bool {
        self.slot(media_type).genres.initialized()
    }

    pub fn cached(&self, media_type: MediaType) -> Option<&[Genre]> {
        self.slot(media_type).genres.get().map(Vec::as_slice)
    }

    pub async fn get_or_load<F, Fut>(&self, media_type: MediaType, load: F) -> &[Genre]
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Genre>, TmdbError>>,
    {
        let slot = self.slot(media_type);
        if let Some(genres) = slot.genres.get() {
            return genres.as_slice();
        }

        let failures_seen = slot.failed_loads.load(Ordering::Acquire);
        let _loading = slot.loading.lock().await;

        if let Some(genres) = slot.genres.get() {
            return genres.as_slice();
        }
        if slot.failed_loads.load(Ordering::Acquire) != failures_seen {
            debug!("Sharing failed {} genre load with waiting caller", media_type);
            return &[];
        }

        match load().await {
            Ok(genres) => slot
                .genres
                .get_or_init(|| async move { genres })
                .await
                .as_slice(),
            Err(err) if err.is_cancelled() => {
                debug!("Genre load for {} cancelled", media_type);
                &[]
            }
            Err(err) => {
                slot.failed_loads.fetch_add(1, Ordering::Release);
                warn!("Error fetching {} genres: {}", media_type, err);
                &[]
            }
        }
    }
}

/// Names for `ids`, in the order given, skipping ids missing from `genres`.
pub fn genre_names(genres: &[Genre], ids: &[i64]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| genres.iter().find(|g| g.id == *id))
        .map(|g| g.name.clone())
        .collect()
}
