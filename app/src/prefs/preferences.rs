use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::store::KeyValueStore;
use crate::error::{PreferenceError, StoreError};

pub const FAVORITES_KEY: &str = "cinema-favorites";
pub const RATINGS_KEY: &str = "cinema-ratings";
pub const REVIEWS_KEY: &str = "cinema-user-reviews";
pub const PREFERRED_GENRES_KEY: &str = "cinema-preferred-genres";

/// A user score, always within `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, PreferenceError> {
        if (1..=10).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PreferenceError::InvalidRating(value.into()))
        }
    }

    /// Validates a score submitted as any JSON number: whole values in `1..=10` only.
    pub fn from_score(score: f64) -> Result<Self, PreferenceError> {
        if score.fract() == 0.0 && (1.0..=10.0).contains(&score) {
            Ok(Self(score as u8))
        } else {
            Err(PreferenceError::InvalidRating(score))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = PreferenceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReview {
    pub media_id: i64,
    pub rating: Rating,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesSnapshot {
    pub favorites: Vec<i64>,
    pub ratings: BTreeMap<i64, Rating>,
    pub reviews: Vec<UserReview>,
    pub preferred_genres: Vec<i64>,
}

/// Favorites, ratings, reviews and preferred genres, each persisted as one JSON
/// value under its own key. Every call is a full read-modify-write; concurrent
/// writers to the same key overwrite each other.
#[derive(Clone)]
pub struct UserPreferences {
    store: Arc<dyn KeyValueStore>,
}

impl UserPreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!("Ignoring unreadable preference value under {}: {}", key, err);
                Ok(T::default())
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw).await
    }

    pub async fn favorites(&self) -> Result<Vec<i64>, PreferenceError> {
        Ok(self.load(FAVORITES_KEY).await?)
    }

    pub async fn is_favorite(&self, media_id: i64) -> Result<bool, PreferenceError> {
        Ok(self.favorites().await?.contains(&media_id))
    }

    pub async fn add_favorite(&self, media_id: i64) -> Result<(), PreferenceError> {
        let mut favorites = self.favorites().await?;
        if !favorites.contains(&media_id) {
            favorites.push(media_id);
            self.save(FAVORITES_KEY, &favorites).await?;
        }
        Ok(())
    }

    pub async fn remove_favorite(&self, media_id: i64) -> Result<(), PreferenceError> {
        let mut favorites = self.favorites().await?;
        if favorites.contains(&media_id) {
            favorites.retain(|id| *id != media_id);
            self.save(FAVORITES_KEY, &favorites).await?;
        }
        Ok(())
    }

    /// Flips the favorite flag and returns the new state.
    pub async fn toggle_favorite(&self, media_id: i64) -> Result<bool, PreferenceError> {
        if self.is_favorite(media_id).await? {
            self.remove_favorite(media_id).await?;
            Ok(false)
        } else {
            self.add_favorite(media_id).await?;
            Ok(true)
        }
    }

    pub async fn ratings(&self) -> Result<BTreeMap<i64, Rating>, PreferenceError> {
        Ok(self.load(RATINGS_KEY).await?)
    }

    pub async fn get_movie_rating(&self, media_id: i64) -> Result<Option<Rating>, PreferenceError> {
        Ok(self.ratings().await?.get(&media_id).copied())
    }

    pub async fn rate_movie(&self, media_id: i64, rating: Rating) -> Result<(), PreferenceError> {
        let mut ratings = self.ratings().await?;
        ratings.insert(media_id, rating);
        self.save(RATINGS_KEY, &ratings).await?;
        Ok(())
    }

    pub async fn remove_rating(&self, media_id: i64) -> Result<(), PreferenceError> {
        let mut ratings = self.ratings().await?;
        if ratings.remove(&media_id).is_some() {
            self.save(RATINGS_KEY, &ratings).await?;
        }
        Ok(())
    }

    /// All reviews, most recent first.
    pub async fn reviews(&self) -> Result<Vec<UserReview>, PreferenceError> {
        let reviews: BTreeMap<i64, UserReview> = self.load(REVIEWS_KEY).await?;
        let mut reviews: Vec<UserReview> = reviews.into_values().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    pub async fn get_user_review(&self, media_id: i64) -> Result<Option<UserReview>, PreferenceError> {
        let mut reviews: BTreeMap<i64, UserReview> = self.load(REVIEWS_KEY).await?;
        Ok(reviews.remove(&media_id))
    }

    /// Stores the review for `media_id`, replacing any earlier one.
    pub async fn add_review(
        &self,
        media_id: i64,
        rating: Rating,
        content: &str,
    ) -> Result<UserReview, PreferenceError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PreferenceError::EmptyReview);
        }

        let review = UserReview {
            media_id,
            rating,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let mut reviews: BTreeMap<i64, UserReview> = self.load(REVIEWS_KEY).await?;
        reviews.insert(media_id, review.clone());
        self.save(REVIEWS_KEY, &reviews).await?;
        Ok(review)
    }

    pub async fn delete_review(&self, media_id: i64) -> Result<(), PreferenceError> {
        let mut reviews: BTreeMap<i64, UserReview> = self.load(REVIEWS_KEY).await?;
        if reviews.remove(&media_id).is_some() {
            self.save(REVIEWS_KEY, &reviews).await?;
        }
        Ok(())
    }

    pub async fn preferred_genres(&self) -> Result<Vec<i64>, PreferenceError> {
        Ok(self.load(PREFERRED_GENRES_KEY).await?)
    }

    /// Replaces the preferred genres, dropping duplicates but keeping first-seen order.
    pub async fn set_preferred_genres(&self, genre_ids: &[i64]) -> Result<(), PreferenceError> {
        let mut unique: Vec<i64> = Vec::with_capacity(genre_ids.len());
        for id in genre_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        self.save(PREFERRED_GENRES_KEY, &unique).await?;
        Ok(())
    }

    pub async fn add_preferred_genre(&self, genre_id: i64) -> Result<(), PreferenceError> {
        let mut genres = self.preferred_genres().await?;
        if !genres.contains(&genre_id) {
            genres.push(genre_id);
            self.save(PREFERRED_GENRES_KEY, &genres).await?;
        }
        Ok(())
    }

    pub async fn remove_preferred_genre(&self, genre_id: i64) -> Result<(), PreferenceError> {
        let mut genres = self.preferred_genres().await?;
        if genres.contains(&genre_id) {
            genres.retain(|id| *id != genre_id);
            self.save(PREFERRED_GENRES_KEY, &genres).await?;
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<PreferencesSnapshot, PreferenceError> {
        Ok(PreferencesSnapshot {
            favorites: self.favorites().await?,
            ratings: self.ratings().await?,
            reviews: self.reviews().await?,
            preferred_genres: self.preferred_genres().await?,
        })
    }

    /// Forgets everything the user stored.
    pub async fn reset(&self) -> Result<(), PreferenceError> {
        for key in [FAVORITES_KEY, RATINGS_KEY, REVIEWS_KEY, PREFERRED_GENRES_KEY] {
            self.store.delete(key).await?;
        }
        info!("User preferences cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryStore;

    fn prefs() -> (UserPreferences, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (UserPreferences::new(store.clone()), store)
    }

    fn rating(value: u8) -> Rating {
        Rating::new(value).unwrap()
    }

    #[tokio::test]
    async fn adding_a_favorite_twice_keeps_one_entry() {
        let (prefs, store) = prefs();
        prefs.add_favorite(550).await.unwrap();
        prefs.add_favorite(550).await.unwrap();

        assert_eq!(prefs.favorites().await.unwrap(), vec![550]);
        assert_eq!(
            store.get(FAVORITES_KEY).await.unwrap().as_deref(),
            Some("[550]")
        );
    }

    #[tokio::test]
    async fn removing_an_absent_favorite_is_a_no_op() {
        let (prefs, store) = prefs();
        prefs.remove_favorite(42).await.unwrap();
        assert!(store.is_empty());

        prefs.add_favorite(1).await.unwrap();
        prefs.add_favorite(2).await.unwrap();
        prefs.remove_favorite(1).await.unwrap();
        assert_eq!(prefs.favorites().await.unwrap(), vec![2]);
        assert!(!prefs.is_favorite(1).await.unwrap());
    }

    #[tokio::test]
    async fn toggle_flips_membership() {
        let (prefs, _) = prefs();
        assert!(prefs.toggle_favorite(1399).await.unwrap());
        assert!(prefs.is_favorite(1399).await.unwrap());
        assert!(!prefs.toggle_favorite(1399).await.unwrap());
        assert!(prefs.favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn re_rating_replaces_the_previous_value() {
        let (prefs, _) = prefs();
        prefs.rate_movie(550, rating(7)).await.unwrap();
        prefs.rate_movie(550, rating(3)).await.unwrap();

        assert_eq!(prefs.get_movie_rating(550).await.unwrap(), Some(rating(3)));
        assert_eq!(prefs.ratings().await.unwrap().len(), 1);
        assert_eq!(prefs.get_movie_rating(551).await.unwrap(), None);

        prefs.remove_rating(550).await.unwrap();
        assert_eq!(prefs.get_movie_rating(550).await.unwrap(), None);
    }

    #[test]
    fn ratings_outside_one_to_ten_are_rejected() {
        assert!(matches!(Rating::new(0), Err(PreferenceError::InvalidRating(v)) if v == 0.0));
        assert!(matches!(Rating::new(11), Err(PreferenceError::InvalidRating(v)) if v == 11.0));
        assert_eq!(Rating::new(10).unwrap().value(), 10);
        assert!(serde_json::from_str::<Rating>("12").is_err());
    }

    #[test]
    fn submitted_scores_must_be_whole_and_in_range() {
        assert_eq!(Rating::from_score(7.0).unwrap().value(), 7);
        assert_eq!(Rating::from_score(1.0).unwrap().value(), 1);
        for score in [256.0, -1.0, 7.5, 0.0, f64::NAN] {
            assert!(matches!(
                Rating::from_score(score),
                Err(PreferenceError::InvalidRating(_))
            ));
        }
    }

    #[tokio::test]
    async fn deleting_a_review_makes_it_absent() {
        let (prefs, _) = prefs();
        prefs
            .add_review(27205, rating(9), "Un rêve dans un rêve.")
            .await
            .unwrap();
        assert!(prefs.get_user_review(27205).await.unwrap().is_some());

        prefs.delete_review(27205).await.unwrap();
        assert_eq!(prefs.get_user_review(27205).await.unwrap(), None);

        prefs.delete_review(27205).await.unwrap();
    }

    #[tokio::test]
    async fn resubmitting_a_review_replaces_it() {
        let (prefs, _) = prefs();
        prefs.add_review(1, rating(4), "Bof").await.unwrap();
        let updated = prefs.add_review(1, rating(8), "  Meilleur au second visionnage  ").await.unwrap();

        let reviews = prefs.reviews().await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0], updated);
        assert_eq!(reviews[0].content, "Meilleur au second visionnage");
        assert_eq!(reviews[0].rating, rating(8));
    }

    #[tokio::test]
    async fn empty_reviews_are_rejected() {
        let (prefs, store) = prefs();
        let err = prefs.add_review(1, rating(5), "   ").await.unwrap_err();
        assert!(matches!(err, PreferenceError::EmptyReview));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn preferred_genres_stay_unique() {
        let (prefs, _) = prefs();
        prefs.set_preferred_genres(&[28, 35, 28]).await.unwrap();
        prefs.add_preferred_genre(35).await.unwrap();
        prefs.add_preferred_genre(18).await.unwrap();
        assert_eq!(prefs.preferred_genres().await.unwrap(), vec![28, 35, 18]);

        prefs.remove_preferred_genre(28).await.unwrap();
        assert_eq!(prefs.preferred_genres().await.unwrap(), vec![35, 18]);
    }

    #[tokio::test]
    async fn unreadable_values_read_as_empty() {
        let (prefs, store) = prefs();
        store.set(FAVORITES_KEY, "not json").await.unwrap();
        assert!(prefs.favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_clears_every_collection() {
        let (prefs, store) = prefs();
        prefs.add_favorite(1).await.unwrap();
        prefs.rate_movie(1, rating(6)).await.unwrap();
        prefs.add_review(1, rating(6), "Correct").await.unwrap();
        prefs.add_preferred_genre(28).await.unwrap();

        let snapshot = prefs.snapshot().await.unwrap();
        assert_eq!(snapshot.favorites, vec![1]);
        assert_eq!(snapshot.reviews.len(), 1);

        prefs.reset().await.unwrap();
        assert!(store.is_empty());
        let snapshot = prefs.snapshot().await.unwrap();
        assert!(snapshot.favorites.is_empty());
        assert!(snapshot.ratings.is_empty());
        assert!(snapshot.reviews.is_empty());
        assert!(snapshot.preferred_genres.is_empty());
    }
}
