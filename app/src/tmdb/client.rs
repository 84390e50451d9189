use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::types::{
    Credits, Genre, GenreList, MediaType, RawDetails, RawMedia, RawPage, Video, VideoList,
    WatchProviders,
};
use crate::config::{Config, DEFAULT_TMDB_BASE_URL};
use crate::error::TmdbError;

/// Ordered query parameters. Setting a key twice replaces the earlier value in
/// place; empty values are kept here and dropped by [`build_url`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value.to_string());
        self
    }

    /// Like [`set`](Self::set) but leaves the current value alone when `value` is `None`.
    pub fn set_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(key, value.to_string());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: &str, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }
}

/// `base` + `path` with every non-empty parameter appended as an encoded query pair.
pub fn build_url(base: &str, path: &str, params: &QueryParams) -> Result<Url, TmdbError> {
    let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;

    let pairs: Vec<(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url)
}

#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    status_message: String,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: &str) -> Result<Self, TmdbError> {
        Self::with_base_url(api_key, DEFAULT_TMDB_BASE_URL, Duration::from_secs(30))
    }

    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, TmdbError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TmdbError> {
        Self::with_base_url(
            &config.tmdb_api_key,
            &config.tmdb_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn auth_header(&self) -> String {
        if self.api_key.starts_with("Bearer ") {
            self.api_key.clone()
        } else {
            format!("Bearer {}", self.api_key)
        }
    }

    /// One authenticated GET, decoded as `T`. No retries; the request is dropped
    /// as soon as `cancel` fires.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<T, TmdbError> {
        let url = build_url(&self.base_url, path, params)?;
        debug!("TMDB request: {}", path);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TmdbError::Cancelled),
            body = self.execute(url) => body?,
        };

        Ok(serde_json::from_str(&body)?)
    }

    async fn execute(&self, url: Url) -> Result<String, TmdbError> {
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TmdbErrorBody>(&error_text)
                .map(|body| body.status_message)
                .unwrap_or(error_text);
            error!("TMDB API error {}: {}", status, message);
            return Err(TmdbError::Request {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }

    pub async fn page(
        &self,
        path: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<RawPage<RawMedia>, TmdbError> {
        self.get_json(path, params, cancel).await
    }

    pub async fn genre_list(
        &self,
        media_type: MediaType,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Genre>, TmdbError> {
        let path = format!("/genre/{}/list", media_type);
        let params = QueryParams::new().set("language", language);
        let list: GenreList = self.get_json(&path, &params, cancel).await?;
        Ok(list.genres)
    }

    pub async fn details(
        &self,
        id: i64,
        media_type: MediaType,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<RawDetails, TmdbError> {
        let path = format!("/{}/{}", media_type, id);
        let params = QueryParams::new()
            .set("language", language)
            .set("append_to_response", "credits,videos");
        self.get_json(&path, &params, cancel).await
    }

    pub async fn credits(
        &self,
        id: i64,
        media_type: MediaType,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<Credits, TmdbError> {
        let path = format!("/{}/{}/credits", media_type, id);
        let params = QueryParams::new().set("language", language);
        self.get_json(&path, &params, cancel).await
    }

    pub async fn videos(
        &self,
        id: i64,
        media_type: MediaType,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Video>, TmdbError> {
        let path = format!("/{}/{}/videos", media_type, id);
        let params = QueryParams::new().set("language", language);
        let list: VideoList = self.get_json(&path, &params, cancel).await?;
        Ok(list.results)
    }

    pub async fn watch_providers(
        &self,
        id: i64,
        media_type: MediaType,
        cancel: &CancellationToken,
    ) -> Result<WatchProviders, TmdbError> {
        let path = format!("/{}/{}/watch/providers", media_type, id);
        self.get_json(&path, &QueryParams::new(), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: &str) -> TmdbClient {
        TmdbClient::with_base_url(api_key, &format!("{}/3", server.uri()), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn build_url_skips_empty_values_and_keeps_order() {
        let params = QueryParams::new()
            .set("query", "le fabuleux destin")
            .set("with_genres", "")
            .set("page", 2)
            .set_opt("year", None::<i32>)
            .set("include_adult", false);

        let url = build_url("https://api.themoviedb.org/3/", "/search/movie", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.themoviedb.org/3/search/movie?query=le+fabuleux+destin&page=2&include_adult=false"
        );
    }

    #[test]
    fn build_url_without_params_has_no_query() {
        let url = build_url("https://api.themoviedb.org/3", "/genre/tv/list", &QueryParams::new())
            .unwrap();
        assert_eq!(url.as_str(), "https://api.themoviedb.org/3/genre/tv/list");
    }

    #[test]
    fn later_values_replace_earlier_ones_in_place() {
        let params = QueryParams::new()
            .set("page", 1)
            .set("sort_by", "popularity.desc")
            .set_opt("page", Some(4))
            .set_opt("sort_by", None::<&str>);
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("page", "4"), ("sort_by", "popularity.desc")]);
        assert_eq!(params.get("page"), Some("4"));
    }

    #[tokio::test]
    async fn sends_bearer_auth_and_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/genre/movie/list"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("language", "fr-FR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "genres": [{"id": 28, "name": "Action"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "test-token");
        let genres = client
            .genre_list(MediaType::Movie, "fr-FR", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(genres, vec![Genre { id: 28, name: "Action".to_string() }]);
    }

    #[tokio::test]
    async fn prefixed_key_is_sent_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer already-prefixed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"genres": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "Bearer already-prefixed");
        let genres = client
            .genre_list(MediaType::Tv, "fr-FR", &CancellationToken::new())
            .await
            .unwrap();
        assert!(genres.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/999999999"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "status_code": 34,
                "status_message": "The resource you requested could not be found."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "test-token");
        let err = client
            .details(999_999_999, MediaType::Movie, "fr-FR", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            TmdbError::Request { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "The resource you requested could not be found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let client = TmdbClient::with_base_url(
            "test-token",
            "http://127.0.0.1:9/3",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client
            .genre_list(MediaType::Movie, "fr-FR", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TmdbError::Network(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, "test-token");
        let err = client
            .credits(550, MediaType::Movie, "fr-FR", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TmdbError::Decode(_)));
    }

    #[tokio::test]
    async fn cancelled_token_abandons_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, "test-token");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client
            .videos(550, MediaType::Movie, "fr-FR", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
