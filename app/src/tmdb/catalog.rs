use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::client::{QueryParams, TmdbClient};
use super::genres::{genre_names, GenreCache};
use super::normalize::{resolve_logo_urls, resolve_profile_urls, MediaRecord};
use super::types::{
    CastMember, Credits, Genre, MediaDetails, MediaItem, MediaType, RawMedia, RawPage,
    RegionProviders, ResultsPage, TimeWindow, TrendingScope, Video, WatchProviders,
};
use crate::config::Config;
use crate::error::TmdbError;

const DEFAULT_SORT: &str = "popularity.desc";

/// Filters accepted by the discovery endpoint. Unset fields fall back to the
/// defaults in [`Catalog::discover`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverFilter {
    pub with_genres: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub include_adult: Option<bool>,
    pub language: Option<String>,
    pub year: Option<i32>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_rating: Option<f64>,
}

/// Typed fetchers over the TMDB API.
///
/// Every fetcher swallows provider failures: it logs them and hands back an empty
/// page, `None` or an empty list, so a caller cannot tell "nothing there" from
/// "fetch failed". Callers that need the difference go through [`TmdbClient`]
/// directly.
#[derive(Debug)]
pub struct Catalog {
    client: Arc<TmdbClient>,
    genres: GenreCache,
    language: String,
    region: String,
}

impl Catalog {
    pub fn new(client: Arc<TmdbClient>, language: &str, region: &str) -> Self {
        Self {
            client,
            genres: GenreCache::new(),
            language: language.to_string(),
            region: region.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TmdbError> {
        let client = TmdbClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), &config.language, &config.region))
    }

    pub fn client(&self) -> &TmdbClient {
        &self.client
    }

    pub fn genre_cache(&self) -> &GenreCache {
        &self.genres
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn base_params(&self) -> QueryParams {
        QueryParams::new().set("language", &self.language)
    }

    fn language_code(&self) -> &str {
        self.language.split('-').next().unwrap_or(&self.language)
    }

    pub async fn genres(&self, media_type: MediaType, cancel: &CancellationToken) -> &[Genre] {
        self.genres
            .get_or_load(media_type, || {
                self.client.genre_list(media_type, &self.language, cancel)
            })
            .await
    }

    pub async fn genre_names(
        &self,
        ids: &[i64],
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        genre_names(self.genres(media_type, cancel).await, ids)
    }

    pub async fn genre_by_id(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Option<Genre> {
        self.genres(media_type, cancel)
            .await
            .iter()
            .find(|g| g.id == id)
            .cloned()
    }

    pub async fn trending(
        &self,
        scope: TrendingScope,
        window: TimeWindow,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let path = format!("/trending/{}/{}", scope.as_str(), window.as_str());
        let hint = match scope {
            TrendingScope::All => None,
            TrendingScope::Movie => Some(MediaType::Movie),
            TrendingScope::Tv => Some(MediaType::Tv),
        };
        let params = self.base_params().set("page", page.max(1));
        self.fetch_page("trending", &path, &params, hint, cancel).await
    }

    pub async fn popular(
        &self,
        media_type: MediaType,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let path = format!("/{}/popular", media_type);
        let params = self.base_params().set("page", page.max(1));
        self.fetch_page("popular", &path, &params, Some(media_type), cancel)
            .await
    }

    pub async fn top_rated(
        &self,
        media_type: MediaType,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let path = format!("/{}/top_rated", media_type);
        let params = self.base_params().set("page", page.max(1));
        self.fetch_page("top_rated", &path, &params, Some(media_type), cancel)
            .await
    }

    /// Filtered listing. Defaults: first page, adult content excluded, most popular
    /// first, catalog language. Anything set on `filter` wins.
    pub async fn discover(
        &self,
        media_type: MediaType,
        filter: &DiscoverFilter,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let (year_key, from_key, to_key) = match media_type {
            MediaType::Movie => (
                "primary_release_year",
                "primary_release_date.gte",
                "primary_release_date.lte",
            ),
            MediaType::Tv => (
                "first_air_date_year",
                "first_air_date.gte",
                "first_air_date.lte",
            ),
        };

        let params = QueryParams::new()
            .set("page", 1)
            .set("include_adult", false)
            .set("language", &self.language)
            .set("sort_by", DEFAULT_SORT)
            .set_opt("page", filter.page.map(|p| p.max(1)))
            .set_opt("include_adult", filter.include_adult)
            .set_opt("language", filter.language.as_deref())
            .set_opt("sort_by", filter.sort_by.as_deref())
            .set_opt("with_genres", filter.with_genres.as_deref())
            .set_opt(year_key, filter.year)
            .set_opt(from_key, filter.date_from.as_deref())
            .set_opt(to_key, filter.date_to.as_deref())
            .set_opt("vote_average.gte", filter.min_rating);

        let path = format!("/discover/{}", media_type);
        self.fetch_page("discover", &path, &params, Some(media_type), cancel)
            .await
    }

    pub async fn discover_by_genre(
        &self,
        media_type: MediaType,
        genre_id: i64,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        if genre_id <= 0 {
            return ResultsPage::empty();
        }

        let filter = DiscoverFilter {
            with_genres: Some(genre_id.to_string()),
            page: Some(page),
            ..DiscoverFilter::default()
        };
        self.discover(media_type, &filter, cancel).await
    }

    pub async fn discover_by_year(
        &self,
        media_type: MediaType,
        year: i32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        if year <= 0 {
            return ResultsPage::empty();
        }

        let filter = DiscoverFilter {
            year: Some(year),
            ..DiscoverFilter::default()
        };
        self.discover(media_type, &filter, cancel).await
    }

    pub async fn discover_by_year_range(
        &self,
        media_type: MediaType,
        from: i32,
        to: i32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        if from <= 0 || from > to {
            return ResultsPage::empty();
        }

        let filter = DiscoverFilter {
            date_from: Some(format!("{from}-01-01")),
            date_to: Some(format!("{to}-12-31")),
            ..DiscoverFilter::default()
        };
        self.discover(media_type, &filter, cancel).await
    }

    /// Movies and TV shows matching `query`. People in the results are dropped.
    pub async fn search_multi(
        &self,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let query = query.trim();
        if query.is_empty() {
            return ResultsPage::empty();
        }

        debug!("Searching TMDB for: {}", query);
        let params = self
            .base_params()
            .set("query", query)
            .set("page", page.max(1))
            .set("include_adult", false);
        self.fetch_page("search", "/search/multi", &params, None, cancel)
            .await
    }

    pub async fn search(
        &self,
        query: &str,
        media_type: MediaType,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let query = query.trim();
        if query.is_empty() {
            return ResultsPage::empty();
        }

        debug!("Searching TMDB {} for: {}", media_type, query);
        let params = self
            .base_params()
            .set("query", query)
            .set("page", page.max(1))
            .set("include_adult", false);
        let path = format!("/search/{}", media_type);
        self.fetch_page("search", &path, &params, Some(media_type), cancel)
            .await
    }

    pub async fn recommendations(
        &self,
        id: i64,
        media_type: MediaType,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let path = format!("/{}/{}/recommendations", media_type, id);
        let params = self.base_params().set("page", page.max(1));
        self.fetch_page("recommendations", &path, &params, Some(media_type), cancel)
            .await
    }

    pub async fn similar(
        &self,
        id: i64,
        media_type: MediaType,
        page: u32,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let path = format!("/{}/{}/similar", media_type, id);
        let params = self.base_params().set("page", page.max(1));
        self.fetch_page("similar", &path, &params, Some(media_type), cancel)
            .await
    }

    /// Full record with credits and videos appended. `None` when the id is unknown
    /// or the provider is unavailable.
    pub async fn details(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Option<MediaDetails> {
        let details = match self
            .client
            .details(id, media_type, &self.language, cancel)
            .await
        {
            Ok(details) => details,
            Err(err) => {
                log_failure("details", &format!("{} {}", media_type, id), &err);
                return None;
            }
        };

        let mut media = details.media;
        media.media_type = Some(media_type.as_str().to_string());
        let genres = media.genres.clone().unwrap_or_default();
        let item = MediaRecord::classify(media)?.normalize(&genres);

        let mut credits = details.credits.unwrap_or_default();
        resolve_profile_urls(&mut credits);

        let mut videos = details.videos.map(|v| v.results).unwrap_or_default();
        rank_videos(&mut videos, self.language_code());

        Some(MediaDetails {
            item,
            tagline: details.tagline.filter(|t| !t.is_empty()),
            status: details.status,
            genres,
            episode_run_time: details.episode_run_time,
            number_of_episodes: details.number_of_episodes,
            created_by: details.created_by,
            production_companies: details.production_companies,
            credits,
            videos,
        })
    }

    pub async fn credits(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Credits {
        match self
            .client
            .credits(id, media_type, &self.language, cancel)
            .await
        {
            Ok(mut credits) => {
                resolve_profile_urls(&mut credits);
                credits
            }
            Err(err) => {
                log_failure("credits", &format!("{} {}", media_type, id), &err);
                Credits::default()
            }
        }
    }

    /// Top-billed cast, at most `limit` members.
    pub async fn cast(
        &self,
        id: i64,
        media_type: MediaType,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Vec<CastMember> {
        let mut cast = self.credits(id, media_type, cancel).await.cast;
        cast.truncate(limit);
        cast
    }

    /// Videos ordered trailers first, then those in the catalog language, then
    /// newest first.
    pub async fn videos(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Vec<Video> {
        match self
            .client
            .videos(id, media_type, &self.language, cancel)
            .await
        {
            Ok(mut videos) => {
                rank_videos(&mut videos, self.language_code());
                videos
            }
            Err(err) => {
                log_failure("videos", &format!("{} {}", media_type, id), &err);
                Vec::new()
            }
        }
    }

    pub async fn trailer(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Option<Video> {
        self.videos(id, media_type, cancel)
            .await
            .into_iter()
            .find(Video::is_trailer)
    }

    pub async fn watch_providers(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Option<WatchProviders> {
        match self.client.watch_providers(id, media_type, cancel).await {
            Ok(mut providers) => {
                providers.results.values_mut().for_each(resolve_logo_urls);
                Some(providers)
            }
            Err(err) => {
                log_failure("watch providers", &format!("{} {}", media_type, id), &err);
                None
            }
        }
    }

    /// Providers for `region`, or the catalog's own region when `None`.
    pub async fn region_providers(
        &self,
        id: i64,
        media_type: MediaType,
        region: Option<&str>,
        cancel: &CancellationToken,
    ) -> Option<RegionProviders> {
        let providers = self.watch_providers(id, media_type, cancel).await?;
        providers
            .for_region(region.unwrap_or(&self.region))
            .cloned()
    }

    /// Suggestions from the most recent favorite, else the most recent preferred
    /// genre, else the weekly trending list.
    pub async fn personalized(
        &self,
        media_type: MediaType,
        favorites: &[i64],
        preferred_genres: &[i64],
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        if let Some(&favorite) = favorites.last() {
            let page = self.recommendations(favorite, media_type, 1, cancel).await;
            if !page.is_empty() {
                return page;
            }
        }

        if let Some(&genre) = preferred_genres.last() {
            let page = self.discover_by_genre(media_type, genre, 1, cancel).await;
            if !page.is_empty() {
                return page;
            }
        }

        self.trending(media_type.into(), TimeWindow::Week, 1, cancel)
            .await
    }

    async fn fetch_page(
        &self,
        resource: &str,
        path: &str,
        params: &QueryParams,
        hint: Option<MediaType>,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        match self.client.page(path, params, cancel).await {
            Ok(raw) => self.normalize_page(raw, hint, cancel).await,
            Err(err) => {
                log_failure(resource, path, &err);
                ResultsPage::empty()
            }
        }
    }

    async fn normalize_page(
        &self,
        raw: RawPage<RawMedia>,
        hint: Option<MediaType>,
        cancel: &CancellationToken,
    ) -> ResultsPage<MediaItem> {
        let records: Vec<MediaRecord> = raw
            .results
            .into_iter()
            .filter_map(|media| match hint {
                Some(hint) => MediaRecord::classify_as(media, hint),
                None => MediaRecord::classify(media),
            })
            .collect();

        let wants = |media_type: MediaType| records.iter().any(|r| r.media_type() == media_type);
        let (movie_genres, tv_genres) = tokio::join!(
            self.genres_if(wants(MediaType::Movie), MediaType::Movie, cancel),
            self.genres_if(wants(MediaType::Tv), MediaType::Tv, cancel),
        );

        let items = records
            .iter()
            .map(|record| match record.media_type() {
                MediaType::Movie => record.normalize(movie_genres),
                MediaType::Tv => record.normalize(tv_genres),
            })
            .collect();

        ResultsPage {
            page: raw.page,
            items,
            total_pages: raw.total_pages,
            total_results: raw.total_results,
        }
    }

    async fn genres_if(
        &self,
        wanted: bool,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> &[Genre] {
        if wanted {
            self.genres(media_type, cancel).await
        } else {
            &[]
        }
    }
}

fn log_failure(resource: &str, target: &str, err: &TmdbError) {
    if err.is_cancelled() {
        debug!("TMDB {} request for {} cancelled", resource, target);
    } else {
        error!("Error fetching {} for {}: {}", resource, target, err);
    }
}

fn rank_videos(videos: &mut [Video], language: &str) {
    fn published(video: &Video) -> Option<DateTime<FixedOffset>> {
        video
            .published_at
            .as_deref()
            .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
    }

    videos.sort_by(|a, b| {
        b.is_trailer()
            .cmp(&a.is_trailer())
            .then_with(|| {
                let a_local = a.iso_639_1.as_deref() == Some(language);
                let b_local = b.iso_639_1.as_deref() == Some(language);
                b_local.cmp(&a_local)
            })
            .then_with(|| match (published(a), published(b)) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}
