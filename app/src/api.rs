use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{
    error::AppError,
    prefs::{PreferencesSnapshot, Rating, UserReview},
    tmdb::{
        CastMember, Credits, DiscoverFilter, Genre, MediaDetails, MediaItem, MediaType,
        RegionProviders, ResultsPage, TimeWindow, TrendingScope, Video,
    },
    AppState,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/trending/:scope/:window", get(get_trending))
        .route("/discover/:media_type", get(discover))
        .route("/search", get(search))
        .route("/genres/:media_type", get(get_genres))
        .route("/recommendations/:media_type", get(get_personalized))
        .route("/favorites", get(get_favorites))
        .route("/favorites/:id", get(is_favorite).put(add_favorite).delete(remove_favorite))
        .route("/ratings", get(get_ratings))
        .route("/ratings/:id", get(get_rating).put(rate).delete(remove_rating))
        .route("/reviews", get(get_reviews))
        .route("/reviews/:id", get(get_review).put(put_review).delete(delete_review))
        .route("/preferred-genres", get(get_preferred_genres).put(put_preferred_genres))
        .route("/preferences", get(get_preferences).delete(reset_preferences))
        .route("/media/:media_type/popular", get(get_popular))
        .route("/media/:media_type/top-rated", get(get_top_rated))
        .route("/media/:media_type/:id", get(get_details))
        .route("/media/:media_type/:id/credits", get(get_credits))
        .route("/media/:media_type/:id/cast", get(get_cast))
        .route("/media/:media_type/:id/videos", get(get_videos))
        .route("/media/:media_type/:id/trailer", get(get_trailer))
        .route("/media/:media_type/:id/providers", get(get_providers))
        .route("/media/:media_type/:id/recommendations", get(get_recommendations))
        .route("/media/:media_type/:id/similar", get(get_similar))
        .with_state(state)
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    media_type: Option<MediaType>,
    #[serde(default = "default_page")]
    page: u32,
}

#[derive(Deserialize)]
struct CastQuery {
    #[serde(default = "default_cast_limit")]
    limit: usize,
}

fn default_cast_limit() -> usize {
    10
}

#[derive(Deserialize)]
struct ProvidersQuery {
    #[serde(default)]
    region: Option<String>,
}

#[derive(Deserialize)]
struct RateRequest {
    rating: f64,
}

#[derive(Deserialize)]
struct ReviewRequest {
    rating: f64,
    content: String,
}

async fn get_trending(
    State(state): State<AppState>,
    Path((scope, window)): Path<(TrendingScope, TimeWindow)>,
    Query(params): Query<PageQuery>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    Json(state.catalog.trending(scope, window, params.page, &cancel).await)
}

async fn get_popular(
    State(state): State<AppState>,
    Path(media_type): Path<MediaType>,
    Query(params): Query<PageQuery>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    Json(state.catalog.popular(media_type, params.page, &cancel).await)
}

async fn get_top_rated(
    State(state): State<AppState>,
    Path(media_type): Path<MediaType>,
    Query(params): Query<PageQuery>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    Json(state.catalog.top_rated(media_type, params.page, &cancel).await)
}

async fn discover(
    State(state): State<AppState>,
    Path(media_type): Path<MediaType>,
    Query(filter): Query<DiscoverFilter>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    Json(state.catalog.discover(media_type, &filter, &cancel).await)
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    let results = match params.media_type {
        Some(media_type) => {
            state
                .catalog
                .search(&params.q, media_type, params.page, &cancel)
                .await
        }
        None => state.catalog.search_multi(&params.q, params.page, &cancel).await,
    };
    Json(results)
}

async fn get_genres(
    State(state): State<AppState>,
    Path(media_type): Path<MediaType>,
) -> Json<Vec<Genre>> {
    let cancel = state.request_token();
    Json(state.catalog.genres(media_type, &cancel).await.to_vec())
}

async fn get_details(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
) -> Result<Json<MediaDetails>, AppError> {
    let cancel = state.request_token();
    state
        .catalog
        .details(id, media_type, &cancel)
        .await
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn get_credits(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
) -> Json<Credits> {
    let cancel = state.request_token();
    Json(state.catalog.credits(id, media_type, &cancel).await)
}

async fn get_cast(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
    Query(params): Query<CastQuery>,
) -> Json<Vec<CastMember>> {
    let cancel = state.request_token();
    Json(state.catalog.cast(id, media_type, params.limit, &cancel).await)
}

async fn get_videos(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
) -> Json<Vec<Video>> {
    let cancel = state.request_token();
    Json(state.catalog.videos(id, media_type, &cancel).await)
}

async fn get_trailer(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
) -> Json<Option<Video>> {
    let cancel = state.request_token();
    Json(state.catalog.trailer(id, media_type, &cancel).await)
}

async fn get_providers(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
    Query(params): Query<ProvidersQuery>,
) -> Json<Option<RegionProviders>> {
    let cancel = state.request_token();
    Json(
        state
            .catalog
            .region_providers(id, media_type, params.region.as_deref(), &cancel)
            .await,
    )
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
    Query(params): Query<PageQuery>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    Json(
        state
            .catalog
            .recommendations(id, media_type, params.page, &cancel)
            .await,
    )
}

async fn get_similar(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(MediaType, i64)>,
    Query(params): Query<PageQuery>,
) -> Json<ResultsPage<MediaItem>> {
    let cancel = state.request_token();
    Json(state.catalog.similar(id, media_type, params.page, &cancel).await)
}

async fn get_personalized(
    State(state): State<AppState>,
    Path(media_type): Path<MediaType>,
) -> Result<Json<ResultsPage<MediaItem>>, AppError> {
    let favorites = state.prefs.favorites().await?;
    let preferred_genres = state.prefs.preferred_genres().await?;
    let cancel = state.request_token();
    let page = state
        .catalog
        .personalized(media_type, &favorites, &preferred_genres, &cancel)
        .await;
    Ok(Json(page))
}

async fn get_favorites(State(state): State<AppState>) -> Result<Json<Vec<i64>>, AppError> {
    Ok(Json(state.prefs.favorites().await?))
}

async fn is_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<bool>, AppError> {
    Ok(Json(state.prefs.is_favorite(id).await?))
}

async fn add_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<i64>>, AppError> {
    state.prefs.add_favorite(id).await?;
    Ok(Json(state.prefs.favorites().await?))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<i64>>, AppError> {
    state.prefs.remove_favorite(id).await?;
    Ok(Json(state.prefs.favorites().await?))
}

async fn get_ratings(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<i64, Rating>>, AppError> {
    Ok(Json(state.prefs.ratings().await?))
}

async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Rating>, AppError> {
    state
        .prefs
        .get_movie_rating(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn rate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RateRequest>,
) -> Result<Json<Rating>, AppError> {
    let rating = Rating::from_score(body.rating)?;
    state.prefs.rate_movie(id, rating).await?;
    Ok(Json(rating))
}

async fn remove_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<()>, AppError> {
    state.prefs.remove_rating(id).await?;
    Ok(Json(()))
}

async fn get_reviews(State(state): State<AppState>) -> Result<Json<Vec<UserReview>>, AppError> {
    Ok(Json(state.prefs.reviews().await?))
}

async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserReview>, AppError> {
    state
        .prefs
        .get_user_review(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn put_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<UserReview>, AppError> {
    let rating = Rating::from_score(body.rating)?;
    let review = state.prefs.add_review(id, rating, &body.content).await?;
    Ok(Json(review))
}

async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<()>, AppError> {
    state.prefs.delete_review(id).await?;
    Ok(Json(()))
}

async fn get_preferred_genres(State(state): State<AppState>) -> Result<Json<Vec<i64>>, AppError> {
    Ok(Json(state.prefs.preferred_genres().await?))
}

async fn put_preferred_genres(
    State(state): State<AppState>,
    Json(genre_ids): Json<Vec<i64>>,
) -> Result<Json<Vec<i64>>, AppError> {
    state.prefs.set_preferred_genres(&genre_ids).await?;
    Ok(Json(state.prefs.preferred_genres().await?))
}

async fn get_preferences(
    State(state): State<AppState>,
) -> Result<Json<PreferencesSnapshot>, AppError> {
    Ok(Json(state.prefs.snapshot().await?))
}

async fn reset_preferences(State(state): State<AppState>) -> Result<Json<()>, AppError> {
    state.prefs.reset().await?;
    Ok(Json(()))
}
