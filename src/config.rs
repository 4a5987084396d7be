//! Runtime configuration read from the environment.

use std::{path::PathBuf, time::Duration};

pub const API_URL: &str = "SYLLABUS_API_URL";
pub const TOKEN_FILE: &str = "SYLLABUS_TOKEN_FILE";
pub const LOGIN_PATH: &str = "SYLLABUS_LOGIN_PATH";
pub const REFRESH_TIMEOUT_SECS: &str = "SYLLABUS_REFRESH_TIMEOUT_SECS";
pub const PROACTIVE_REFRESH: &str = "SYLLABUS_PROACTIVE_REFRESH";
pub const ACCESS_TOKEN: &str = "SYLLABUS_ACCESS_TOKEN";
pub const REFRESH_TOKEN: &str = "SYLLABUS_REFRESH_TOKEN";

#[derive(Debug, thiserror::Error)]
#[error("env var {key} has invalid value {value:?}: {reason}")]
pub struct Error {
    pub key: &'static str,
    pub value: String,
    pub reason: &'static str,
}

#[derive(Clone)]
pub struct Config {
    pub api_url: String,
    /// In-memory credentials when unset.
    pub token_file: Option<PathBuf>,
    pub login_path: String,
    /// `None` lets a refresh run as long as the transport allows.
    pub refresh_timeout: Option<Duration>,
    pub proactive_refresh: bool,
    /// Initial pair to log in with, when both are provided.
    pub initial_tokens: Option<(String, String)>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("token_file", &self.token_file)
            .field("login_path", &self.login_path)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("proactive_refresh", &self.proactive_refresh)
            .field("initial_tokens", &self.initial_tokens.is_some())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_owned(),
            token_file: None,
            login_path: "/login".to_owned(),
            refresh_timeout: Some(Duration::from_secs(30)),
            proactive_refresh: false,
            initial_tokens: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let refresh_timeout = match lookup(REFRESH_TIMEOUT_SECS) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(Error {
                        key: REFRESH_TIMEOUT_SECS,
                        value,
                        reason: "expected a whole number of seconds",
                    })
                }
            },
            None => defaults.refresh_timeout,
        };

        let proactive_refresh = match lookup(PROACTIVE_REFRESH) {
            Some(value) => parse_bool(&value).ok_or(Error {
                key: PROACTIVE_REFRESH,
                value,
                reason: "expected true or false",
            })?,
            None => defaults.proactive_refresh,
        };

        let initial_tokens = match (lookup(ACCESS_TOKEN), lookup(REFRESH_TOKEN)) {
            (Some(access), Some(refresh)) => Some((access, refresh)),
            _ => None,
        };

        Ok(Self {
            api_url: lookup(API_URL).unwrap_or(defaults.api_url),
            token_file: lookup(TOKEN_FILE).map(PathBuf::from),
            login_path: lookup(LOGIN_PATH).unwrap_or(defaults.login_path),
            refresh_timeout,
            proactive_refresh,
            initial_tokens,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
