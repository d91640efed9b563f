use crate::model::Role;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Process-level defaults. `session.connect` may override every field.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base: String,
    pub api_token: Option<String>,
    /// No timeout unless configured.
    pub timeout: Option<Duration>,
    pub max_pages: usize,
    pub role: Option<Role>,
    pub user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            timeout: None,
            max_pages: DEFAULT_MAX_PAGES,
            role: None,
            user: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|k| std::env::var(k).ok())
    }

    /// Invalid values are logged and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Config::default();

        if let Some(base) = get("SCHOOLD_API_BASE") {
            cfg.api_base = base;
        }
        cfg.api_token = get("SCHOOLD_API_TOKEN");

        if let Some(raw) = get("SCHOOLD_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(0) => {}
                Ok(secs) => cfg.timeout = Some(Duration::from_secs(secs)),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid SCHOOLD_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = get("SCHOOLD_MAX_PAGES") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => cfg.max_pages = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid SCHOOLD_MAX_PAGES"),
            }
        }
        if let Some(raw) = get("SCHOOLD_ROLE") {
            cfg.role = Role::parse(&raw);
            if cfg.role.is_none() {
                tracing::warn!(value = %raw, "ignoring unknown SCHOOLD_ROLE");
            }
        }
        cfg.user = get("SCHOOLD_USER");
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
        assert_eq!(Config::default().api_base, "http://localhost:8000/api");
        assert!(Config::default().timeout.is_none());
    }

    #[test]
    fn reads_every_field() {
        let cfg = Config::from_lookup(lookup(&[
            ("SCHOOLD_API_BASE", "https://school.example/api"),
            ("SCHOOLD_API_TOKEN", "abc"),
            ("SCHOOLD_TIMEOUT_SECS", "15"),
            ("SCHOOLD_MAX_PAGES", "3"),
            ("SCHOOLD_ROLE", "Admin"),
            ("SCHOOLD_USER", "principal"),
        ]));
        assert_eq!(cfg.api_base, "https://school.example/api");
        assert_eq!(cfg.api_token.as_deref(), Some("abc"));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(15)));
        assert_eq!(cfg.max_pages, 3);
        assert_eq!(cfg.role, Some(Role::Admin));
        assert_eq!(cfg.user.as_deref(), Some("principal"));
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("SCHOOLD_TIMEOUT_SECS", "soon"),
            ("SCHOOLD_MAX_PAGES", "0"),
            ("SCHOOLD_ROLE", "janitor"),
            ("SCHOOLD_API_TOKEN", "  "),
        ]));
        assert_eq!(cfg, Config::default());
    }
}
