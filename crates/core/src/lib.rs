pub mod bus;
pub mod catalog;
pub mod chart;
pub mod domain;
pub mod portfolio;
pub mod profile;
pub mod save;
pub mod session;

pub mod config {
    use crate::portfolio::DuplicatePolicy;
    use crate::save::persistence::SaveMode;
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    const DEFAULT_SAVE_URL: &str = "/api/portfolio";
    const DEFAULT_SAVE_DELAY_MS: u64 = 1000;
    const DEFAULT_SAVE_DISPLAY_MS: u64 = 2000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub save_url: String,
        pub save_delay: Duration,
        pub save_display: Duration,
        pub save_mode: SaveMode,
        pub catalog_tickers: Option<Vec<String>>,
        pub duplicate_policy: DuplicatePolicy,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sentry_dsn: None,
                save_url: DEFAULT_SAVE_URL.to_string(),
                save_delay: Duration::from_millis(DEFAULT_SAVE_DELAY_MS),
                save_display: Duration::from_millis(DEFAULT_SAVE_DISPLAY_MS),
                save_mode: SaveMode::ClockParity,
                catalog_tickers: None,
                duplicate_policy: DuplicatePolicy::Reject,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            let catalog_tickers = std::env::var("CATALOG_TICKERS")
                .ok()
                .map(|s| parse_ticker_list(&s))
                .filter(|list| !list.is_empty());

            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok().filter(|s| !s.trim().is_empty()),
                save_url: std::env::var("SAVE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(defaults.save_url),
                save_delay: env_millis("SAVE_DELAY_MS")?.unwrap_or(defaults.save_delay),
                save_display: env_millis("SAVE_DISPLAY_MS")?.unwrap_or(defaults.save_display),
                save_mode: env_parsed("SAVE_MODE")?.unwrap_or(defaults.save_mode),
                catalog_tickers,
                duplicate_policy: env_parsed("DUPLICATE_POLICY")?
                    .unwrap_or(defaults.duplicate_policy),
            })
        }
    }

    fn env_millis(key: &str) -> anyhow::Result<Option<Duration>> {
        let Ok(raw) = std::env::var(key) else {
            return Ok(None);
        };
        let ms = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of milliseconds (got {raw:?})"))?;
        Ok(Some(Duration::from_millis(ms)))
    }

    fn env_parsed<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr<Err = anyhow::Error>,
    {
        let Ok(raw) = std::env::var(key) else {
            return Ok(None);
        };
        let value = raw
            .parse::<T>()
            .with_context(|| format!("invalid {key}"))?;
        Ok(Some(value))
    }

    /// Splits a comma separated ticker list, normalizing each symbol.
    pub fn parse_ticker_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|part| part.trim().to_uppercase())
            .filter(|part| !part.is_empty())
            .collect()
    }

}
