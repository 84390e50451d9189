use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingScope {
    All,
    Movie,
    Tv,
}

impl TrendingScope {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendingScope::All => "all",
            TrendingScope::Movie => "movie",
            TrendingScope::Tv => "tv",
        }
    }
}

impl From<MediaType> for TrendingScope {
    fn from(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Movie => TrendingScope::Movie,
            MediaType::Tv => TrendingScope::Tv,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

/// One page of results as TMDB returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

/// A movie or TV record in any of the shapes TMDB uses for list entries and
/// detail payloads. Which of the two it is gets decided by
/// [`MediaRecord::classify`](super::normalize::MediaRecord::classify).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMedia {
    pub id: i64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub genres: Option<Vec<Genre>>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDetails {
    #[serde(flatten)]
    pub media: RawMedia,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub created_by: Vec<Creator>,
    #[serde(default)]
    pub production_companies: Vec<Company>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(default)]
    pub videos: Option<VideoList>,
}

/// Normalized movie or TV show, the single shape the presentation layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaItem {
    pub id: i64,
    pub title: String,
    pub media_type: MediaType,
    pub poster_url: String,
    pub backdrop_url: Option<String>,
    pub rating: f64,
    pub year: i32,
    pub overview: String,
    pub genre_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage<T> {
    pub page: u32,
    pub items: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl<T> ResultsPage<T> {
    pub fn empty() -> Self {
        Self {
            page: 1,
            items: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ResultsPage<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaDetails {
    #[serde(flatten)]
    pub item: MediaItem,
    pub tagline: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<Genre>,
    pub episode_run_time: Vec<u32>,
    pub number_of_episodes: Option<u32>,
    pub created_by: Vec<Creator>,
    pub production_companies: Vec<Company>,
    pub credits: Credits,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Creator {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Video {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub iso_639_1: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub official: bool,
}

impl Video {
    pub fn is_trailer(&self) -> bool {
        self.kind == "Trailer"
    }
}

/// Streaming, rental and purchase sources keyed by ISO 3166-1 region code.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchProviders {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub results: BTreeMap<String, RegionProviders>,
}

impl WatchProviders {
    pub fn for_region(&self, region: &str) -> Option<&RegionProviders> {
        self.results.get(&region.to_uppercase())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RegionProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<Provider>,
    #[serde(default)]
    pub rent: Vec<Provider>,
    #[serde(default)]
    pub buy: Vec<Provider>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Provider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub display_priority: Option<i64>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn media_type_round_trips_as_lowercase() {
        assert_eq!(serde_json::to_value(MediaType::Tv).unwrap(), json!("tv"));
        let parsed: MediaType = serde_json::from_value(json!("movie")).unwrap();
        assert_eq!(parsed, MediaType::Movie);
        assert!(serde_json::from_value::<MediaType>(json!("person")).is_err());
    }

    #[test]
    fn details_payload_flattens_into_raw_media() {
        let details: RawDetails = serde_json::from_value(json!({
            "id": 1399,
            "name": "Game of Thrones",
            "first_air_date": "2011-04-17",
            "number_of_seasons": 8,
            "genres": [{"id": 18, "name": "Drame"}],
            "episode_run_time": [60],
            "credits": {"cast": [{"id": 22970, "name": "Peter Dinklage", "character": "Tyrion Lannister"}]},
            "videos": {"results": []}
        }))
        .unwrap();

        assert_eq!(details.media.id, 1399);
        assert_eq!(details.media.number_of_seasons, Some(8));
        assert_eq!(details.media.genres.as_ref().map(Vec::len), Some(1));
        assert_eq!(details.credits.unwrap().cast[0].character, "Tyrion Lannister");
    }

    #[test]
    fn watch_providers_lookup_is_case_insensitive_on_region() {
        let providers: WatchProviders = serde_json::from_value(json!({
            "id": 550,
            "results": {
                "FR": {
                    "link": "https://www.themoviedb.org/movie/550/watch?locale=FR",
                    "flatrate": [{"provider_id": 8, "provider_name": "Netflix", "logo_path": "/t2yyOv40HZeVlLjYsCsPHnWLk4W.jpg"}]
                }
            }
        }))
        .unwrap();

        let fr = providers.for_region("fr").unwrap();
        assert_eq!(fr.flatrate[0].provider_name, "Netflix");
        assert!(fr.rent.is_empty());
        assert!(providers.for_region("US").is_none());
    }

    #[test]
    fn empty_page_matches_the_degraded_shape() {
        let page: ResultsPage<MediaItem> = ResultsPage::empty();
        assert_eq!(page.page, 1);
        assert!(page.is_empty());
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total_results, 0);
    }
}
