mod catalog;
mod client;
mod genres;
mod normalize;
mod types;

pub use catalog::{Catalog, DiscoverFilter};
pub use client::{build_url, QueryParams, TmdbClient};
pub use genres::{genre_names, GenreCache};
pub use normalize::{
    backdrop_url, extract_year, image_url, poster_url, ImageKind, ImageSize, MediaRecord,
    PLACEHOLDER_POSTER_URL, TMDB_IMAGE_BASE,
};
pub use types::{
    CastMember, Company, Creator, Credits, CrewMember, Genre, MediaDetails, MediaItem,
    MediaType, Provider, RawDetails, RawMedia, RawPage, RegionProviders, ResultsPage,
    TimeWindow, TrendingScope, Video, WatchProviders,
};
