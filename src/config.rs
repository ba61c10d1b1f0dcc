use std::env;

/// Process-wide configuration, loaded once at startup and handed to each
/// service by reference. Secrets are optional: a handler whose credentials
/// are absent answers with its safe-default payload instead of failing the
/// whole process at boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub github_token: Option<String>,
    pub github_graphql_url: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub spotify_token_url: String,
    pub spotify_api_base: String,
    /// Which slot of the upstream image array is the preferred album-art
    /// size. Falls back to the first image when the slot is absent.
    pub spotify_album_art_index: usize,
    pub wakatime_api_key: Option<String>,
    pub wakatime_api_base: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            github_token: env::var("GITHUB_TOKEN").ok(),
            github_graphql_url: env::var("GITHUB_GRAPHQL_URL")
                .unwrap_or_else(|_| "https://api.github.com/graphql".to_string()),
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID").ok(),
            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET").ok(),
            spotify_refresh_token: env::var("SPOTIFY_REFRESH_TOKEN").ok(),
            spotify_token_url: env::var("SPOTIFY_TOKEN_URL")
                .unwrap_or_else(|_| "https://accounts.spotify.com/api/token".to_string()),
            spotify_api_base: env::var("SPOTIFY_API_BASE")
                .unwrap_or_else(|_| "https://api.spotify.com/v1".to_string()),
            spotify_album_art_index: match env::var("SPOTIFY_ALBUM_ART_INDEX") {
                Ok(raw) => raw.parse().map_err(|_| {
                    anyhow::anyhow!("SPOTIFY_ALBUM_ART_INDEX must be a non-negative integer")
                })?,
                Err(_) => 2,
            },
            wakatime_api_key: env::var("WAKATIME_API_KEY").ok(),
            wakatime_api_base: env::var("WAKATIME_API_BASE")
                .unwrap_or_else(|_| "https://wakatime.com/api/v1".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // These tests mutate process-global environment variables, so they
    // must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_KEYS: &[&str] = &[
        "BIND_ADDR",
        "GITHUB_TOKEN",
        "GITHUB_GRAPHQL_URL",
        "SPOTIFY_CLIENT_ID",
        "SPOTIFY_CLIENT_SECRET",
        "SPOTIFY_REFRESH_TOKEN",
        "SPOTIFY_TOKEN_URL",
        "SPOTIFY_API_BASE",
        "SPOTIFY_ALBUM_ART_INDEX",
        "WAKATIME_API_KEY",
        "WAKATIME_API_BASE",
    ];

    // Helper to backup and restore environment variables. Every key the
    // Config reads is cleared first so ambient values cannot leak in.
    fn with_env_vars<F>(vars: Vec<(&str, Option<&str>)>, test_fn: F)
    where
        F: FnOnce(),
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let mut backup = Vec::new();
        for key in ALL_KEYS {
            backup.push((key.to_string(), env::var(key).ok()));
            env::remove_var(key);
        }

        for (key, value) in &vars {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }

        test_fn();

        for (key, original_value) in backup {
            match original_value {
                Some(val) => env::set_var(&key, val),
                None => env::remove_var(&key),
            }
        }
    }

    #[test]
    fn test_config_from_env_with_all_vars_set() {
        with_env_vars(
            vec![
                ("BIND_ADDR", Some("127.0.0.1:8080")),
                ("GITHUB_TOKEN", Some("ghp_test")),
                ("GITHUB_GRAPHQL_URL", Some("http://localhost:9999/graphql")),
                ("SPOTIFY_CLIENT_ID", Some("cid")),
                ("SPOTIFY_CLIENT_SECRET", Some("csecret")),
                ("SPOTIFY_REFRESH_TOKEN", Some("rtok")),
                ("SPOTIFY_TOKEN_URL", Some("http://localhost:9999/token")),
                ("SPOTIFY_API_BASE", Some("http://localhost:9999")),
                ("SPOTIFY_ALBUM_ART_INDEX", Some("0")),
                ("WAKATIME_API_KEY", Some("waka_test")),
                ("WAKATIME_API_BASE", Some("http://localhost:9999/api/v1")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.bind_addr, "127.0.0.1:8080");
                assert_eq!(config.github_token, Some("ghp_test".to_string()));
                assert_eq!(config.github_graphql_url, "http://localhost:9999/graphql");
                assert_eq!(config.spotify_client_id, Some("cid".to_string()));
                assert_eq!(config.spotify_client_secret, Some("csecret".to_string()));
                assert_eq!(config.spotify_refresh_token, Some("rtok".to_string()));
                assert_eq!(config.spotify_token_url, "http://localhost:9999/token");
                assert_eq!(config.spotify_api_base, "http://localhost:9999");
                assert_eq!(config.spotify_album_art_index, 0);
                assert_eq!(config.wakatime_api_key, Some("waka_test".to_string()));
                assert_eq!(config.wakatime_api_base, "http://localhost:9999/api/v1");
            },
        );
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        with_env_vars(vec![], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:3000");
            assert_eq!(config.github_graphql_url, "https://api.github.com/graphql");
            assert_eq!(
                config.spotify_token_url,
                "https://accounts.spotify.com/api/token"
            );
            assert_eq!(config.spotify_api_base, "https://api.spotify.com/v1");
            assert_eq!(config.spotify_album_art_index, 2);
            assert_eq!(config.wakatime_api_base, "https://wakatime.com/api/v1");
        });
    }

    #[test]
    fn test_config_missing_secrets_are_none_not_errors() {
        with_env_vars(vec![], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.github_token, None);
            assert_eq!(config.spotify_client_id, None);
            assert_eq!(config.spotify_client_secret, None);
            assert_eq!(config.spotify_refresh_token, None);
            assert_eq!(config.wakatime_api_key, None);
        });
    }

    #[test]
    fn test_config_invalid_album_art_index() {
        with_env_vars(vec![("SPOTIFY_ALBUM_ART_INDEX", Some("smallest"))], || {
            let result = Config::from_env();
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("SPOTIFY_ALBUM_ART_INDEX"));
        });
    }

    #[test]
    fn test_config_clone() {
        with_env_vars(vec![("GITHUB_TOKEN", Some("ghp_test"))], || {
            let config = Config::from_env().unwrap();
            let cloned = config.clone();
            assert_eq!(config.bind_addr, cloned.bind_addr);
            assert_eq!(config.github_token, cloned.github_token);
            assert_eq!(config.spotify_album_art_index, cloned.spotify_album_art_index);
        });
    }
}
