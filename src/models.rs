use serde::Serialize;

/// One pinned repository, flattened for the projects grid.
///
/// `description` is always populated: the per-repository override file wins,
/// then the upstream description, then a fixed placeholder. `homepage`
/// serializes as `null` when the repository has none, matching what the
/// grid's cards expect.
#[derive(Debug, Clone, Serialize)]
pub struct PinnedRepo {
    pub name: String,
    pub description: String,
    pub html_url: String,
    pub homepage: Option<String>,
    pub topics: Vec<String>,
    pub languages: Vec<String>,
}

/// Playback status for the music widget.
///
/// The offline payload is exactly `{"isPlaying": false}`; track fields only
/// appear once a track resolved, so the widget can branch on field presence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub is_playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_art: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
}

impl NowPlaying {
    pub fn offline() -> Self {
        Self {
            is_playing: false,
            title: None,
            artist: None,
            album: None,
            album_art: None,
            song_url: None,
        }
    }
}

/// Aggregated coding-activity snapshot for the status widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingActivity {
    pub is_coding: bool,
    pub today_total: String,
    pub week_total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_language_today: Option<UsageSlice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_project_today: Option<UsageSlice>,
    pub weekly_average: String,
}

/// A single language or project share of today's coding time.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSlice {
    pub name: String,
    pub time: String,
    pub percent: f64,
}

impl CodingActivity {
    /// The zeroed shape served with a 500 when the time tracker is
    /// unreachable or unconfigured.
    pub fn offline() -> Self {
        Self {
            is_coding: false,
            today_total: "0 mins".to_string(),
            week_total: "0 mins".to_string(),
            current_project: None,
            current_language: None,
            top_language_today: None,
            top_project_today: None,
            weekly_average: "0 mins".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offline_now_playing_is_exactly_is_playing_false() {
        let value = serde_json::to_value(NowPlaying::offline()).unwrap();
        assert_eq!(value, json!({ "isPlaying": false }));
    }

    #[test]
    fn test_now_playing_serializes_camel_case() {
        let playing = NowPlaying {
            is_playing: true,
            title: Some("Song".to_string()),
            artist: Some("A, B".to_string()),
            album: Some("Album".to_string()),
            album_art: Some("https://img.example/cover".to_string()),
            song_url: Some("https://open.example/track".to_string()),
        };
        let value = serde_json::to_value(playing).unwrap();
        assert_eq!(
            value,
            json!({
                "isPlaying": true,
                "title": "Song",
                "artist": "A, B",
                "album": "Album",
                "albumArt": "https://img.example/cover",
                "songUrl": "https://open.example/track",
            })
        );
    }

    #[test]
    fn test_offline_activity_omits_optionals() {
        let value = serde_json::to_value(CodingActivity::offline()).unwrap();
        assert_eq!(
            value,
            json!({
                "isCoding": false,
                "todayTotal": "0 mins",
                "weekTotal": "0 mins",
                "weeklyAverage": "0 mins",
            })
        );
    }

    #[test]
    fn test_pinned_repo_wire_names() {
        let repo = PinnedRepo {
            name: "tool".to_string(),
            description: "A tool".to_string(),
            html_url: "https://github.com/me/tool".to_string(),
            homepage: None,
            topics: vec!["cli".to_string()],
            languages: vec!["Rust".to_string()],
        };
        let value = serde_json::to_value(repo).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "tool",
                "description": "A tool",
                "html_url": "https://github.com/me/tool",
                "homepage": null,
                "topics": ["cli"],
                "languages": ["Rust"],
            })
        );
    }

    #[test]
    fn test_usage_slice_fields() {
        let slice = UsageSlice {
            name: "Rust".to_string(),
            time: "2 hrs 10 mins".to_string(),
            percent: 81.5,
        };
        let value = serde_json::to_value(slice).unwrap();
        assert_eq!(value["name"], "Rust");
        assert_eq!(value["time"], "2 hrs 10 mins");
        assert_eq!(value["percent"], 81.5);
    }
}
