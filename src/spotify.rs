use axum::{extract::State, Json};
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{config::Config, models::NowPlaying};

// ---------------------------------------------------------------------------
// Upstream wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PlaybackState {
    #[serde(default)]
    is_playing: bool,
    item: Option<Track>,
    context: Option<PlayContext>,
}

#[derive(Deserialize)]
struct PlayContext {
    #[serde(rename = "type")]
    context_type: String,
    uri: Option<String>,
}

#[derive(Deserialize)]
struct Track {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    album: Option<Album>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize)]
struct Artist {
    name: String,
}

#[derive(Deserialize)]
struct Album {
    name: String,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct Image {
    url: String,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct RecentlyPlayed {
    #[serde(default)]
    items: Vec<HistoryItem>,
}

#[derive(Deserialize)]
struct HistoryItem {
    track: Track,
    context: Option<PlayContext>,
}

#[derive(Deserialize)]
struct Playlist {
    name: Option<String>,
}

// ---------------------------------------------------------------------------
// SpotifyService
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct SpotifyCredentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

#[derive(Clone)]
pub struct SpotifyService {
    http: Client,
    credentials: Option<SpotifyCredentials>,
    token_url: String,
    api_base: String,
    album_art_index: usize,
}

impl SpotifyService {
    pub fn new(config: &Config) -> Self {
        // All three secrets are needed before any call is worth making.
        let credentials = match (
            &config.spotify_client_id,
            &config.spotify_client_secret,
            &config.spotify_refresh_token,
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(SpotifyCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                })
            }
            _ => None,
        };

        Self {
            http: Client::new(),
            credentials,
            token_url: config.spotify_token_url.clone(),
            api_base: config.spotify_api_base.clone(),
            album_art_index: config.spotify_album_art_index,
        }
    }

    /// Resolve the music widget's payload.
    ///
    /// Every failure mode collapses into the offline payload; the widget
    /// never sees an error body from this chain.
    pub async fn now_playing(&self) -> NowPlaying {
        let Some(credentials) = &self.credentials else {
            return NowPlaying::offline();
        };

        match self.resolve(credentials).await {
            Ok(playing) => playing,
            Err(e) => {
                debug!("now-playing lookup failed: {e:#}");
                NowPlaying::offline()
            }
        }
    }

    async fn resolve(&self, credentials: &SpotifyCredentials) -> anyhow::Result<NowPlaying> {
        let access_token = self.exchange_refresh_token(credentials).await?;

        // Fallback chain: live playback first, then the most recent play.
        let playback = match self.currently_playing(&access_token).await? {
            Some(playback) => Some(playback),
            None => self.recently_played(&access_token).await?,
        };

        let Some(playback) = playback else {
            return Ok(NowPlaying::offline());
        };
        let Some(track) = playback.item else {
            return Ok(NowPlaying::offline());
        };

        if self
            .from_suppressed_playlist(&access_token, playback.context.as_ref())
            .await
        {
            return Ok(NowPlaying::offline());
        }

        Ok(self.shape(track, playback.is_playing))
    }

    /// Trade the long-lived refresh token for a short-lived access token.
    /// Runs on every request; nothing is cached between requests.
    async fn exchange_refresh_token(
        &self,
        credentials: &SpotifyCredentials,
    ) -> anyhow::Result<String> {
        let basic = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ));

        let response = self
            .http
            .post(&self.token_url)
            .header("Authorization", format!("Basic {basic}"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &credentials.refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("token endpoint responded with status {}", response.status());
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// A 204 and any error status both mean "nothing playing right now".
    async fn currently_playing(&self, access_token: &str) -> anyhow::Result<Option<PlaybackState>> {
        let url = format!("{}/me/player/currently-playing", self.api_base);
        let response = self.get(&url, access_token).await?;

        if response.status() == StatusCode::NO_CONTENT || response.status().as_u16() >= 400 {
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }

    async fn recently_played(&self, access_token: &str) -> anyhow::Result<Option<PlaybackState>> {
        let url = format!("{}/me/player/recently-played?limit=1", self.api_base);
        let response = self.get(&url, access_token).await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let history: RecentlyPlayed = response.json().await?;

        // A history item is never "playing"; its context still matters for
        // the playlist check.
        Ok(history.items.into_iter().next().map(|item| PlaybackState {
            is_playing: false,
            item: Some(item.track),
            context: item.context,
        }))
    }

    async fn from_suppressed_playlist(
        &self,
        access_token: &str,
        context: Option<&PlayContext>,
    ) -> bool {
        let Some(context) = context else { return false };
        if context.context_type != "playlist" {
            return false;
        }

        // Context URIs look like "spotify:playlist:<id>".
        let Some(playlist_id) = context.uri.as_deref().and_then(|uri| uri.split(':').nth(2))
        else {
            return false;
        };

        match self.playlist_name(access_token, playlist_id).await {
            Some(name) => is_suppressed_playlist(&name),
            None => false,
        }
    }

    /// Best effort: a failed lookup never suppresses anything.
    async fn playlist_name(&self, access_token: &str, playlist_id: &str) -> Option<String> {
        let url = format!("{}/playlists/{playlist_id}", self.api_base);
        let response = self.get(&url, access_token).await.ok()?;

        if !response.status().is_success() {
            return None;
        }

        let playlist: Playlist = response.json().await.ok()?;
        playlist.name
    }

    async fn get(&self, url: &str, access_token: &str) -> reqwest::Result<reqwest::Response> {
        self.http
            .get(url)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
    }

    fn shape(&self, track: Track, is_playing: bool) -> NowPlaying {
        let artist = track
            .artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let album_art = track.album.as_ref().and_then(|album| {
            album
                .images
                .get(self.album_art_index)
                .or_else(|| album.images.first())
                .map(|image| image.url.clone())
        });

        NowPlaying {
            is_playing,
            title: Some(track.name),
            artist: Some(artist),
            album: track.album.map(|album| album.name),
            album_art,
            song_url: track.external_urls.and_then(|urls| urls.spotify),
        }
    }
}

/// The curation rule: playlists whose names read as "guilty pleasures"
/// stay private.
fn is_suppressed_playlist(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("guilty") && lower.contains("pleasure")
}

// ---------------------------------------------------------------------------
// Route handler
// ---------------------------------------------------------------------------

pub async fn now_playing(State(state): State<crate::AppState>) -> Json<NowPlaying> {
    Json(state.spotify.now_playing().await)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
