pub mod backend;
pub mod domain;
pub mod error;
pub mod job;
pub mod protocol;
pub mod upload;

pub use error::ClientError;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
    pub const DEFAULT_UPLOAD_PATH: &str = "/upload/pdf";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
    const DEFAULT_POLL_DEADLINE_SECS: u64 = 120;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub api_base_url: Option<String>,
        pub upload_path: Option<String>,
        pub http_timeout_secs: Option<u64>,
        pub poll_interval_secs: Option<u64>,
        pub poll_deadline_secs: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                api_base_url: non_empty_var("AICC_API_BASE_URL"),
                upload_path: non_empty_var("AICC_UPLOAD_PATH"),
                http_timeout_secs: parse_var("AICC_HTTP_TIMEOUT_SECS")?,
                poll_interval_secs: parse_var("AICC_POLL_INTERVAL_SECS")?,
                poll_deadline_secs: parse_var("AICC_POLL_DEADLINE_SECS")?,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn api_base_url(&self) -> &str {
            self.api_base_url
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL)
        }

        pub fn upload_path(&self) -> &str {
            self.upload_path.as_deref().unwrap_or(DEFAULT_UPLOAD_PATH)
        }

        pub fn http_timeout(&self) -> Duration {
            Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
        }

        pub fn poll_interval(&self) -> Duration {
            Duration::from_secs(
                self.poll_interval_secs
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            )
        }

        pub fn poll_deadline(&self) -> Duration {
            Duration::from_secs(
                self.poll_deadline_secs
                    .unwrap_or(DEFAULT_POLL_DEADLINE_SECS),
            )
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parse_var(key: &str) -> anyhow::Result<Option<u64>> {
        match non_empty_var(key) {
            Some(s) => {
                let value = s
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a whole number of seconds (got {s})"))?;
                anyhow::ensure!(value >= 1, "{key} must be >= 1");
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_match_backend_contract() {
            let settings = Settings::default();
            assert_eq!(settings.api_base_url(), "http://localhost:3000");
            assert_eq!(settings.upload_path(), "/upload/pdf");
            assert_eq!(settings.poll_interval(), Duration::from_secs(3));
            assert_eq!(settings.poll_deadline(), Duration::from_secs(120));
            assert_eq!(settings.http_timeout(), Duration::from_secs(30));
        }
    }
}
