use crate::config::Config;
use crate::github::GithubService;
use crate::spotify::SpotifyService;
use crate::wakatime::WakaTimeService;

/// Shared, read-only state handed to every handler. Each service owns its
/// own HTTP client and credentials; nothing here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub github: GithubService,
    pub spotify: SpotifyService,
    pub wakatime: WakaTimeService,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            github: GithubService::new(config),
            spotify: SpotifyService::new(config),
            wakatime: WakaTimeService::new(config),
        }
    }
}
