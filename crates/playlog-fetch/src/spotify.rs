use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playlog_core::clock::cutoff_unix_secs;
use playlog_core::config::SpotifyConfig;
use playlog_core::types::{RawItem, RecentlyPlayedPage};
use tracing::{debug, info, warn};

use crate::source::{FetchError, RecentlyPlayedSource};

const RECENTLY_PLAYED_PATH: &str = "/v1/me/player/recently-played";

/// Client for the Spotify Web API recently-played endpoint.
pub struct SpotifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    limit: u32,
    cutoff_offset_secs: i64,
    user_id: Option<String>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Result<Self, FetchError> {
        let token = config
            .bearer_token()
            .map_err(|e| FetchError::Config(e.to_string()))?
            .to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.page_limit(),
            cutoff_offset_secs: config.cutoff_offset_secs,
            user_id: config.user_id.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, RECENTLY_PLAYED_PATH)
    }
}

#[async_trait]
impl RecentlyPlayedSource for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn fetch(&self, reference: DateTime<Utc>) -> Result<Vec<RawItem>, FetchError> {
        let after = cutoff_unix_secs(reference, self.cutoff_offset_secs);
        let user = self.user_id.as_deref().unwrap_or("me");
        debug!(user, after, limit = self.limit, "requesting recently played tracks");

        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("limit", self.limit as i64), ("after", after)])
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "recently-played request rejected");
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let page: RecentlyPlayedPage =
            serde_json::from_str(&text).map_err(|e| FetchError::Parse(e.to_string()))?;
        let items = page.items.unwrap_or_default();

        info!(user, count = items.len(), "fetched recently played tracks");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        query: Arc<Mutex<HashMap<String, String>>>,
        auth: Arc<Mutex<Option<String>>>,
        accept: Arc<Mutex<Option<String>>>,
        content_type: Arc<Mutex<Option<String>>>,
    }

    fn header(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    async fn recently_played(
        State(seen): State<Seen>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        let auth = header(&headers, "authorization");
        *seen.query.lock().unwrap() = query;
        *seen.auth.lock().unwrap() = auth.clone();
        *seen.accept.lock().unwrap() = header(&headers, "accept");
        *seen.content_type.lock().unwrap() = header(&headers, "content-type");

        if auth.as_deref() != Some("Bearer secret") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"status": 401, "message": "The access token expired"}})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "items": [
                    {
                        "track": {"name": "Roygbiv", "album": {"artists": [{"name": "Boards of Canada"}]}},
                        "played_at": "2024-03-14T22:01:00.000Z"
                    },
                    {
                        "track": {"name": "Xtal", "album": {"artists": [{"name": "Aphex Twin"}]}},
                        "played_at": "2024-03-14T21:55:00.000Z"
                    }
                ],
                "limit": 50
            })),
        )
    }

    async fn spawn_api(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String, token: &str) -> SpotifyClient {
        SpotifyClient::new(&SpotifyConfig {
            token: Some(token.to_string()),
            base_url,
            ..SpotifyConfig::default()
        })
        .unwrap()
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 6, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn fetch_sends_cutoff_limit_bearer_and_json_headers() {
        let seen = Seen::default();
        let router = Router::new()
            .route(RECENTLY_PLAYED_PATH, get(recently_played))
            .with_state(seen.clone());
        let base = spawn_api(router).await;

        let items = client_for(base, "secret").fetch(reference()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].track_name(), Some("Roygbiv"));
        assert_eq!(items[1].first_artist_name(), Some("Aphex Twin"));

        let query = seen.query.lock().unwrap().clone();
        assert_eq!(query.get("limit").map(String::as_str), Some("50"));
        assert_eq!(query.get("after").map(String::as_str), Some("1710397000"));
        assert_eq!(seen.auth.lock().unwrap().as_deref(), Some("Bearer secret"));
        assert_eq!(
            seen.accept.lock().unwrap().as_deref(),
            Some("application/json")
        );
        assert_eq!(
            seen.content_type.lock().unwrap().as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error_with_body() {
        let router = Router::new()
            .route(RECENTLY_PLAYED_PATH, get(recently_played))
            .with_state(Seen::default());
        let base = spawn_api(router).await;

        let err = client_for(base, "stale").fetch(reference()).await.unwrap_err();
        match err {
            FetchError::Upstream { status, ref body } => {
                assert_eq!(status, 401);
                assert!(body.contains("access token expired"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn missing_items_yield_empty_batch() {
        let router = Router::new().route(
            RECENTLY_PLAYED_PATH,
            get(|| async { Json(json!({"next": null, "limit": 50})) }),
        );
        let base = spawn_api(router).await;

        let items = client_for(base, "secret").fetch(reference()).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn empty_items_yield_empty_batch() {
        let router = Router::new().route(
            RECENTLY_PLAYED_PATH,
            get(|| async { Json(json!({"items": [], "next": null})) }),
        );
        let base = spawn_api(router).await;

        let items = client_for(base, "secret").fetch(reference()).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn undecodable_body_is_parse_error() {
        let router = Router::new().route(RECENTLY_PLAYED_PATH, get(|| async { "<html>" }));
        let base = spawn_api(router).await;

        let err = client_for(base, "secret").fetch(reference()).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn missing_token_fails_construction() {
        let err = SpotifyClient::new(&SpotifyConfig::default()).err().unwrap();
        assert!(matches!(err, FetchError::Config(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let client = client_for("http://localhost:9/".to_string(), "t");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1/me/player/recently-played"
        );
    }
}
