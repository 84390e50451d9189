mod preferences;
mod store;

pub use preferences::{
    PreferencesSnapshot, Rating, UserPreferences, UserReview, FAVORITES_KEY,
    PREFERRED_GENRES_KEY, RATINGS_KEY, REVIEWS_KEY,
};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
