use chrono::{Datelike, NaiveDate};

use super::genres::genre_names;
use super::types::{Credits, Genre, MediaItem, MediaType, RawMedia, RegionProviders};

pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const PLACEHOLDER_POSTER_URL: &str =
    "https://images.unsplash.com/photo-1605810230434-7631ac76ec81";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Poster,
    Backdrop,
    Profile,
    Logo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    Medium,
    Large,
    Original,
}

impl ImageKind {
    /// CDN size token for this kind of image.
    pub fn size_token(self, size: ImageSize) -> &'static str {
        match (self, size) {
            (_, ImageSize::Original) => "original",
            (ImageKind::Poster, ImageSize::Small) => "w185",
            (ImageKind::Poster, ImageSize::Medium) => "w342",
            (ImageKind::Poster, ImageSize::Large) => "w500",
            (ImageKind::Backdrop, ImageSize::Small) => "w300",
            (ImageKind::Backdrop, ImageSize::Medium) => "w780",
            (ImageKind::Backdrop, ImageSize::Large) => "w1280",
            (ImageKind::Profile, ImageSize::Small) => "w45",
            (ImageKind::Profile, ImageSize::Medium) => "w185",
            (ImageKind::Profile, ImageSize::Large) => "h632",
            (ImageKind::Logo, ImageSize::Small) => "w45",
            (ImageKind::Logo, ImageSize::Medium) => "w92",
            (ImageKind::Logo, ImageSize::Large) => "w154",
        }
    }
}

pub fn image_url(path: Option<&str>, kind: ImageKind, size: ImageSize) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}/{}{}", TMDB_IMAGE_BASE, kind.size_token(size), p))
}

pub fn poster_url(path: Option<&str>) -> String {
    image_url(path, ImageKind::Poster, ImageSize::Medium)
        .unwrap_or_else(|| PLACEHOLDER_POSTER_URL.to_string())
}

pub fn backdrop_url(path: Option<&str>) -> Option<String> {
    image_url(path, ImageKind::Backdrop, ImageSize::Large)
}

/// Year of a `YYYY-MM-DD` (or bare `YYYY`) date, `0` when missing or unparseable.
pub fn extract_year(date: Option<&str>) -> i32 {
    let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) else {
        return 0;
    };

    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return parsed.year();
    }

    if date.len() == 4 && date.bytes().all(|b| b.is_ascii_digit()) {
        return date.parse().unwrap_or(0);
    }

    0
}

/// A provider record after movie/TV disambiguation.
#[derive(Debug, Clone)]
pub enum MediaRecord {
    Movie(RawMedia),
    Tv(RawMedia),
}

impl MediaRecord {
    /// A record is TV when tagged `tv` or when it carries a first air date; any
    /// other record except a `person` is a movie.
    pub fn classify(raw: RawMedia) -> Option<Self> {
        match raw.media_type.as_deref() {
            Some("person") => None,
            Some("tv") => Some(MediaRecord::Tv(raw)),
            _ if raw.first_air_date.is_some() => Some(MediaRecord::Tv(raw)),
            _ => Some(MediaRecord::Movie(raw)),
        }
    }

    /// Classifies a record fetched from an endpoint that only serves `hint`, tagging
    /// it first when the provider left the tag out.
    pub fn classify_as(mut raw: RawMedia, hint: MediaType) -> Option<Self> {
        if raw.media_type.is_none() {
            raw.media_type = Some(hint.as_str().to_string());
        }
        Self::classify(raw)
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            MediaRecord::Movie(_) => MediaType::Movie,
            MediaRecord::Tv(_) => MediaType::Tv,
        }
    }

    pub fn raw(&self) -> &RawMedia {
        match self {
            MediaRecord::Movie(raw) | MediaRecord::Tv(raw) => raw,
        }
    }

    /// Builds the uniform item. `genres` is the cached set for this record's media
    /// type; ids it does not know are dropped.
    pub fn normalize(&self, genres: &[Genre]) -> MediaItem {
        let raw = self.raw();

        let (title, date) = match self {
            MediaRecord::Movie(raw) => (
                raw.title.as_ref().or(raw.name.as_ref()),
                raw.release_date.as_deref().or(raw.first_air_date.as_deref()),
            ),
            MediaRecord::Tv(raw) => (
                raw.name.as_ref().or(raw.title.as_ref()),
                raw.first_air_date.as_deref().or(raw.release_date.as_deref()),
            ),
        };

        let genre_names = match &raw.genres {
            Some(embedded) if !embedded.is_empty() => {
                embedded.iter().map(|g| g.name.clone()).collect()
            }
            _ => genre_names(genres, &raw.genre_ids),
        };

        MediaItem {
            id: raw.id,
            title: title.cloned().unwrap_or_default(),
            media_type: self.media_type(),
            poster_url: poster_url(raw.poster_path.as_deref()),
            backdrop_url: backdrop_url(raw.backdrop_path.as_deref()),
            rating: raw.vote_average.clamp(0.0, 10.0),
            year: extract_year(date),
            overview: raw.overview.clone().unwrap_or_default(),
            genre_names,
            runtime_minutes: raw.runtime.filter(|r| *r > 0),
            season_count: raw.number_of_seasons,
        }
    }
}

pub(crate) fn resolve_profile_urls(credits: &mut Credits) {
    for member in &mut credits.cast {
        member.profile_url = image_url(
            member.profile_path.as_deref(),
            ImageKind::Profile,
            ImageSize::Medium,
        );
    }
    for member in &mut credits.crew {
        member.profile_url = image_url(
            member.profile_path.as_deref(),
            ImageKind::Profile,
            ImageSize::Medium,
        );
    }
}

pub(crate) fn resolve_logo_urls(region: &mut RegionProviders) {
    for provider in region
        .flatrate
        .iter_mut()
        .chain(region.rent.iter_mut())
        .chain(region.buy.iter_mut())
    {
        provider.logo_url = image_url(
            provider.logo_path.as_deref(),
            ImageKind::Logo,
            ImageSize::Medium,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawMedia {
        serde_json::from_value(value).unwrap()
    }

    fn genres() -> Vec<Genre> {
        vec![
            Genre { id: 28, name: "Action".to_string() },
            Genre { id: 878, name: "Science-Fiction".to_string() },
        ]
    }

    #[test]
    fn missing_poster_uses_placeholder() {
        let record = MediaRecord::classify(raw(json!({"id": 1, "title": "Sans affiche"}))).unwrap();
        let item = record.normalize(&[]);
        assert_eq!(item.poster_url, PLACEHOLDER_POSTER_URL);
        assert_eq!(item.backdrop_url, None);

        let record = MediaRecord::classify(raw(json!({"id": 1, "poster_path": ""}))).unwrap();
        assert_eq!(record.normalize(&[]).poster_url, PLACEHOLDER_POSTER_URL);
    }

    #[test]
    fn image_urls_join_base_size_and_path() {
        let record = MediaRecord::classify(raw(json!({
            "id": 27205,
            "title": "Inception",
            "poster_path": "/9gk7adHYeDvHkCSEqAvQNLV5Uge.jpg",
            "backdrop_path": "/s3TBrRGB1iav7gFOCNx3H31MoES.jpg"
        })))
        .unwrap();
        let item = record.normalize(&[]);
        assert_eq!(
            item.poster_url,
            "https://image.tmdb.org/t/p/w342/9gk7adHYeDvHkCSEqAvQNLV5Uge.jpg"
        );
        assert_eq!(
            item.backdrop_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w1280/s3TBrRGB1iav7gFOCNx3H31MoES.jpg")
        );
    }

    #[test]
    fn year_is_zero_without_dates() {
        let record = MediaRecord::classify(raw(json!({"id": 2, "title": "Inédit"}))).unwrap();
        assert_eq!(record.normalize(&[]).year, 0);

        assert_eq!(extract_year(Some("")), 0);
        assert_eq!(extract_year(Some("bientôt")), 0);
        assert_eq!(extract_year(Some("2010-07-16")), 2010);
        assert_eq!(extract_year(Some("1999")), 1999);
    }

    #[test]
    fn tv_tag_wins_over_date_fields() {
        let record = MediaRecord::classify(raw(json!({
            "id": 3,
            "media_type": "tv",
            "name": "Dark",
            "release_date": "2017-12-01"
        })))
        .unwrap();
        let item = record.normalize(&[]);
        assert_eq!(item.media_type, MediaType::Tv);
        assert_eq!(item.title, "Dark");
        assert_eq!(item.year, 2017);
    }

    #[test]
    fn first_air_date_marks_a_record_as_tv() {
        let record = MediaRecord::classify(raw(json!({
            "id": 4,
            "name": "Le Bureau des légendes",
            "first_air_date": "2015-04-27"
        })))
        .unwrap();
        assert_eq!(record.media_type(), MediaType::Tv);

        let record = MediaRecord::classify(raw(json!({"id": 5, "title": "Amélie"}))).unwrap();
        assert_eq!(record.media_type(), MediaType::Movie);
    }

    #[test]
    fn people_are_not_media() {
        assert!(MediaRecord::classify(raw(json!({"id": 6, "media_type": "person", "name": "Omar Sy"}))).is_none());
    }

    #[test]
    fn hint_only_applies_to_untagged_records() {
        let record = MediaRecord::classify_as(raw(json!({"id": 7, "name": "Lupin"})), MediaType::Tv).unwrap();
        assert_eq!(record.media_type(), MediaType::Tv);

        let record = MediaRecord::classify_as(
            raw(json!({"id": 8, "media_type": "movie", "title": "Intouchables"})),
            MediaType::Tv,
        )
        .unwrap();
        assert_eq!(record.media_type(), MediaType::Movie);
    }

    #[test]
    fn unknown_genre_ids_are_dropped() {
        let record = MediaRecord::classify(raw(json!({
            "id": 9,
            "title": "Inception",
            "genre_ids": [28, 9999, 878]
        })))
        .unwrap();
        assert_eq!(record.normalize(&genres()).genre_names, vec!["Action", "Science-Fiction"]);
        assert!(record.normalize(&[]).genre_names.is_empty());
    }

    #[test]
    fn embedded_genres_take_precedence() {
        let record = MediaRecord::classify(raw(json!({
            "id": 10,
            "title": "Inception",
            "genre_ids": [28],
            "genres": [{"id": 12, "name": "Aventure"}],
            "runtime": 148
        })))
        .unwrap();
        let item = record.normalize(&genres());
        assert_eq!(item.genre_names, vec!["Aventure"]);
        assert_eq!(item.runtime_minutes, Some(148));
    }

    #[test]
    fn rating_is_clamped() {
        let record = MediaRecord::classify(raw(json!({"id": 11, "vote_average": 12.5}))).unwrap();
        assert_eq!(record.normalize(&[]).rating, 10.0);
    }
}
