use anyhow::Context as _;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    config::Config,
    models::{CodingActivity, UsageSlice},
};

/// A heartbeat older than this no longer counts as "coding now".
const FRESHNESS_WINDOW_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Upstream wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SummariesResponse {
    #[serde(default)]
    data: Vec<DailySummary>,
}

#[derive(Deserialize)]
struct DailySummary {
    grand_total: GrandTotal,
    #[serde(default)]
    languages: Vec<UsageEntry>,
    #[serde(default)]
    projects: Vec<UsageEntry>,
}

#[derive(Deserialize)]
struct GrandTotal {
    total_seconds: f64,
    text: String,
}

#[derive(Deserialize)]
struct UsageEntry {
    name: String,
    text: String,
    #[serde(default)]
    percent: f64,
}

#[derive(Deserialize)]
struct HeartbeatsResponse {
    #[serde(default)]
    data: Vec<Heartbeat>,
}

#[derive(Deserialize)]
struct Heartbeat {
    /// Unix timestamp in seconds, fractional.
    time: f64,
    project: Option<String>,
    language: Option<String>,
}

// ---------------------------------------------------------------------------
// WakaTimeService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct WakaTimeService {
    http: Client,
    api_key: Option<String>,
    api_base: String,
}

impl WakaTimeService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            api_key: config.wakatime_api_key.clone(),
            api_base: config.wakatime_api_base.clone(),
        }
    }

    /// Build the activity snapshot from three concurrent upstream calls:
    /// today's summary, the trailing week's summaries, and today's
    /// heartbeats. Either summary call failing fails the whole snapshot;
    /// the heartbeat lookup degrades to "not coding".
    pub async fn activity(&self) -> anyhow::Result<CodingActivity> {
        let api_key = self
            .api_key
            .as_deref()
            .context("WakaTime API key not configured")?;

        let now = Utc::now();
        let today = now.format("%Y-%m-%d").to_string();
        let week_start = (now - Duration::days(7)).format("%Y-%m-%d").to_string();

        let (today_summary, week_summary, heartbeat) = tokio::join!(
            self.summaries(api_key, &today, &today),
            self.summaries(api_key, &week_start, &today),
            self.latest_heartbeat(api_key, &today),
        );

        Ok(build_activity(today_summary?, week_summary?, heartbeat, now))
    }

    async fn summaries(
        &self,
        api_key: &str,
        start: &str,
        end: &str,
    ) -> anyhow::Result<Vec<DailySummary>> {
        let url = format!(
            "{}/users/current/summaries?start={start}&end={end}",
            self.api_base
        );
        let response = self.get(&url, api_key).await?;

        if !response.status().is_success() {
            anyhow::bail!(
                "summaries {start}..{end} responded with status {}",
                response.status()
            );
        }

        let body: SummariesResponse = response.json().await?;
        Ok(body.data)
    }

    /// Best effort: a missing or failing heartbeat reads as "not coding".
    async fn latest_heartbeat(&self, api_key: &str, date: &str) -> Option<Heartbeat> {
        let url = format!("{}/users/current/heartbeats?date={date}", self.api_base);

        let response = match self.get(&url, api_key).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("heartbeats responded with status {}", response.status());
                return None;
            }
            Err(e) => {
                debug!("heartbeats request failed: {e}");
                return None;
            }
        };

        let body: HeartbeatsResponse = response.json().await.ok()?;

        // Heartbeats come back oldest-first; the last one is the most recent.
        let mut data = body.data;
        data.pop()
    }

    async fn get(&self, url: &str, api_key: &str) -> reqwest::Result<reqwest::Response> {
        let basic = base64::engine::general_purpose::STANDARD.encode(api_key);
        self.http
            .get(url)
            .header("Authorization", format!("Basic {basic}"))
            .send()
            .await
    }
}

fn build_activity(
    today: Vec<DailySummary>,
    week: Vec<DailySummary>,
    heartbeat: Option<Heartbeat>,
    now: DateTime<Utc>,
) -> CodingActivity {
    let week_seconds: f64 = week.iter().map(|day| day.grand_total.total_seconds).sum();
    let week_total = format_duration(week_seconds);

    let today_summary = today.into_iter().next();

    let today_total = today_summary
        .as_ref()
        .map(|summary| summary.grand_total.text.clone())
        .unwrap_or_else(|| "0 mins".to_string());

    let top_language_today = today_summary
        .as_ref()
        .and_then(|summary| summary.languages.first())
        .map(usage_slice);
    let top_project_today = today_summary
        .as_ref()
        .and_then(|summary| summary.projects.first())
        .map(usage_slice);

    // The current project and language are gated on freshness, not on the
    // heartbeat merely existing.
    let (is_coding, current_project, current_language) = match heartbeat {
        Some(heartbeat) if heartbeat_is_fresh(heartbeat.time, now) => {
            (true, heartbeat.project, heartbeat.language)
        }
        _ => (false, None, None),
    };

    CodingActivity {
        is_coding,
        today_total,
        week_total: week_total.clone(),
        current_project,
        current_language,
        top_language_today,
        top_project_today,
        weekly_average: week_total,
    }
}

fn usage_slice(entry: &UsageEntry) -> UsageSlice {
    UsageSlice {
        name: entry.name.clone(),
        time: entry.text.clone(),
        percent: entry.percent,
    }
}

fn heartbeat_is_fresh(heartbeat_secs: f64, now: DateTime<Utc>) -> bool {
    now.timestamp() as f64 - heartbeat_secs < (FRESHNESS_WINDOW_MINS * 60) as f64
}

fn format_duration(total_seconds: f64) -> String {
    let hours = (total_seconds / 3600.0).floor() as i64;
    let minutes = ((total_seconds % 3600.0) / 60.0).floor() as i64;
    if hours > 0 {
        format!("{hours} hrs {minutes} mins")
    } else {
        format!("{minutes} mins")
    }
}

// ---------------------------------------------------------------------------
// Route handler
// ---------------------------------------------------------------------------

/// Unlike the other handlers, a total failure here answers 500 while still
/// carrying the zeroed contract shape so the widget has something to render.
pub async fn coding_activity(State(state): State<crate::AppState>) -> Response {
    match state.wakatime.activity().await {
        Ok(activity) => Json(activity).into_response(),
        Err(e) => {
            warn!("coding activity fetch failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CodingActivity::offline()),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
