use crate::common::types::ConfigError;
use std::env;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

/// Settings for one sync run, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub graphql_api_url: String,
    pub auth_token: String,
    pub influx: InfluxConfig,
    pub dry_run: bool,
    /// Abort instead of reprocessing everything when the existing-id query fails.
    pub abort_on_reconcile_error: bool,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let flag = |key: &'static str| -> Result<bool, ConfigError> {
            match lookup(key) {
                Some(value) => parse_bool(key, &value),
                None => Ok(false),
            }
        };

        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    key: "HTTP_TIMEOUT_SECS",
                    value: value.clone(),
                    reason: "expected a whole number of seconds",
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            graphql_api_url: url("GRAPHQL_API_URL", required("GRAPHQL_API_URL")?)?,
            auth_token: required("AUTH_TOKEN")?,
            influx: InfluxConfig {
                url: url("INFLUXDB_URL", required("INFLUXDB_URL")?)?,
                token: required("INFLUXDB_TOKEN")?,
                org: required("INFLUXDB_ORG")?,
                bucket: required("INFLUXDB_BUCKET")?,
            },
            dry_run: flag("DRY_RUN")?,
            abort_on_reconcile_error: flag("ABORT_ON_RECONCILE_ERROR")?,
            http_timeout,
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false",
        }),
    }
}

fn url(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected an http(s) URL",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GRAPHQL_API_URL", "https://ryot.example.com/backend/graphql"),
            ("AUTH_TOKEN", "ryot-token"),
            ("INFLUXDB_URL", "http://localhost:8086/"),
            ("INFLUXDB_TOKEN", "influx-token"),
            ("INFLUXDB_ORG", "home"),
            ("INFLUXDB_BUCKET", "fitness"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_loads_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.influx.url, "http://localhost:8086");
        assert_eq!(config.influx.bucket, "fitness");
        assert!(!config.dry_run);
        assert!(!config.abort_on_reconcile_error);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_dry_run_flag_is_case_insensitive() {
        let mut env = base_env();
        env.insert("DRY_RUN", "TRUE");
        assert!(load(&env).unwrap().dry_run);

        env.insert("DRY_RUN", "nope");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { key: "DRY_RUN", .. })
        ));
    }

    #[test]
    fn test_missing_token_is_reported() {
        let mut env = base_env();
        env.insert("AUTH_TOKEN", "  ");
        assert!(matches!(load(&env), Err(ConfigError::Missing("AUTH_TOKEN"))));

        env.remove("INFLUXDB_BUCKET");
        env.insert("AUTH_TOKEN", "ok");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Missing("INFLUXDB_BUCKET"))
        ));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut env = base_env();
        env.insert("INFLUXDB_URL", "localhost:8086");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { key: "INFLUXDB_URL", .. })
        ));
    }
}
