use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod prefs;
pub mod tmdb;

use crate::prefs::UserPreferences;
use crate::tmdb::Catalog;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub prefs: Arc<UserPreferences>,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(catalog: Catalog, prefs: UserPreferences) -> Self {
        Self {
            catalog: Arc::new(catalog),
            prefs: Arc::new(prefs),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token for one request's provider calls; cancelled with the whole process.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
