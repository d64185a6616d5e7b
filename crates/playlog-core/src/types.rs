//! Shapes shared between the fetch, transform and store stages.

use serde::{Deserialize, Serialize};

/// Body of `GET /v1/me/player/recently-played`.
///
/// Only the fields the job reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentlyPlayedPage {
    /// `None` when the API omits the array or sends `null`.
    #[serde(default)]
    pub items: Option<Vec<RawItem>>,
}

/// One play-history entry exactly as the API returned it.
///
/// Every nested field is optional so an absent value reaches the transformer
/// as a missing field instead of failing JSON decoding for the whole page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub track: Option<RawTrack>,
    #[serde(default)]
    pub played_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub artists: Option<Vec<RawArtist>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub name: Option<String>,
}

impl RawItem {
    /// Convenience constructor for a fully populated item.
    pub fn new(track_name: &str, artist_name: &str, played_at: &str) -> Self {
        Self {
            track: Some(RawTrack {
                name: Some(track_name.to_string()),
                album: Some(RawAlbum {
                    artists: Some(vec![RawArtist {
                        name: Some(artist_name.to_string()),
                    }]),
                }),
            }),
            played_at: Some(played_at.to_string()),
        }
    }

    pub fn track_name(&self) -> Option<&str> {
        self.track.as_ref()?.name.as_deref()
    }

    /// Name of the album's first credited artist.
    pub fn first_artist_name(&self) -> Option<&str> {
        self.track
            .as_ref()?
            .album
            .as_ref()?
            .artists
            .as_ref()?
            .first()?
            .name
            .as_deref()
    }

    pub fn played_at(&self) -> Option<&str> {
        self.played_at.as_deref()
    }
}

/// One played-track event, validated and ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub track_name: String,
    /// First artist only.
    pub author_name: String,
    /// Full ISO-8601 timestamp; unique key in storage (`datetime_played`).
    pub played_at: String,
    /// `YYYY-MM-DD` prefix of `played_at`.
    pub date_played: String,
}

/// The `YYYY-MM-DD` prefix of an ISO-8601 timestamp, if it has one.
pub fn date_prefix(played_at: &str) -> Option<&str> {
    played_at.get(..10)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "items": [
            {
                "track": {
                    "name": "Windowlicker",
                    "album": {"artists": [{"name": "Aphex Twin"}, {"name": "Other"}]},
                    "duration_ms": 367000
                },
                "played_at": "2024-03-14T21:10:03.105Z",
                "context": null
            },
            {
                "track": {"name": "No Album"},
                "played_at": "2024-03-14T20:00:00.000Z"
            }
        ],
        "next": null,
        "limit": 50
    }"#;

    #[test]
    fn page_decodes_nested_fields() {
        let page: RecentlyPlayedPage = serde_json::from_str(PAGE).unwrap();
        let items = page.items.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].track_name(), Some("Windowlicker"));
        assert_eq!(items[0].first_artist_name(), Some("Aphex Twin"));
        assert_eq!(items[0].played_at(), Some("2024-03-14T21:10:03.105Z"));
        assert_eq!(items[1].first_artist_name(), None);
    }

    #[test]
    fn null_items_decode_as_none() {
        let page: RecentlyPlayedPage = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(page.items.is_none());
        let page: RecentlyPlayedPage = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_none());
    }

    #[test]
    fn empty_artist_list_has_no_first_artist() {
        let mut item = RawItem::new("t", "a", "2024-03-14T00:00:00Z");
        item.track.as_mut().unwrap().album = Some(RawAlbum {
            artists: Some(vec![]),
        });
        assert_eq!(item.first_artist_name(), None);
    }

    #[test]
    fn date_prefix_requires_ten_chars() {
        assert_eq!(date_prefix("2024-03-14T21:10:03Z"), Some("2024-03-14"));
        assert_eq!(date_prefix("2024-03"), None);
    }
}
