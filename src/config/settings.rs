// src/config/settings.rs
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::path::PathBuf;
use std::str::FromStr;

use crate::ingest::window::MAX_LOOKBACK_HOURS;

pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;
pub const DEFAULT_FEED_ITEM_LIMIT: usize = 50;
pub const DEFAULT_SEEN_FILE: &str = "seen_links.txt";
pub const DEFAULT_MAX_SEEN: usize = 2000;
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
pub const DEFAULT_TZ_LABEL: &str = "JST";
pub const DEFAULT_WATCHLIST_PATH: &str = "config/watchlist.toml";

pub const ENV_LOOKBACK_HOURS: &str = "LOOKBACK_HOURS";
pub const ENV_FEED_ITEM_LIMIT: &str = "FEED_ITEM_LIMIT";
pub const ENV_SEEN_FILE: &str = "SEEN_FILE";
pub const ENV_MAX_SEEN: &str = "MAX_SEEN";
pub const ENV_UTC_OFFSET_HOURS: &str = "DIGEST_UTC_OFFSET_HOURS";
pub const ENV_TZ_LABEL: &str = "DIGEST_TZ_LABEL";
pub const ENV_WATCHLIST_PATH: &str = "WATCHLIST_CONFIG_PATH";

/// Fixed zone all timestamps are normalized to, with the label printed in the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetZone {
    pub offset: FixedOffset,
    pub label: String,
}

impl TargetZone {
    /// Falls back to UTC if `hours` is outside ±23.
    pub fn from_hours(hours: i32, label: impl Into<String>) -> Self {
        let offset = FixedOffset::east_opt(hours.saturating_mul(3600))
            .unwrap_or_else(|| Utc.fix());
        Self {
            offset,
            label: label.into(),
        }
    }

    pub fn jst() -> Self {
        Self::from_hours(DEFAULT_UTC_OFFSET_HOURS, DEFAULT_TZ_LABEL)
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

impl Default for TargetZone {
    fn default() -> Self {
        Self::jst()
    }
}

/// Credentials and addresses for the notification sinks. Each part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    pub sendgrid_api_key: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub user: String,
    pub pass: String,
}

/// Run settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub lookback_hours: i64,
    pub feed_item_limit: usize,
    pub seen_file: PathBuf,
    pub max_seen: usize,
    pub zone: TargetZone,
    pub watchlist_path: PathBuf,
    pub mail: MailSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
            feed_item_limit: DEFAULT_FEED_ITEM_LIMIT,
            seen_file: PathBuf::from(DEFAULT_SEEN_FILE),
            max_seen: DEFAULT_MAX_SEEN,
            zone: TargetZone::default(),
            watchlist_path: PathBuf::from(DEFAULT_WATCHLIST_PATH),
            mail: MailSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mut s = Self::default();

        s.lookback_hours = env_parse(ENV_LOOKBACK_HOURS, DEFAULT_LOOKBACK_HOURS, |v: &i64| {
            (1..=MAX_LOOKBACK_HOURS).contains(v)
        });
        s.feed_item_limit =
            env_parse(ENV_FEED_ITEM_LIMIT, DEFAULT_FEED_ITEM_LIMIT, |v: &usize| *v > 0);
        s.max_seen = env_parse(ENV_MAX_SEEN, DEFAULT_MAX_SEEN, |v: &usize| *v > 0);
        let offset_hours =
            env_parse(ENV_UTC_OFFSET_HOURS, DEFAULT_UTC_OFFSET_HOURS, |v: &i32| {
                (-23..=23).contains(v)
            });
        let label = env_nonempty(ENV_TZ_LABEL).unwrap_or_else(|| DEFAULT_TZ_LABEL.to_string());
        s.zone = TargetZone::from_hours(offset_hours, label);

        if let Some(p) = env_nonempty(ENV_SEEN_FILE) {
            s.seen_file = PathBuf::from(p);
        }
        if let Some(p) = env_nonempty(ENV_WATCHLIST_PATH) {
            s.watchlist_path = PathBuf::from(p);
        }

        s.mail = MailSettings {
            sendgrid_api_key: env_nonempty("SENDGRID_API_KEY"),
            from: env_nonempty("MAIL_FROM"),
            to: env_nonempty("MAIL_TO")
                .map(|v| parse_recipients(&v))
                .unwrap_or_default(),
            smtp: match (
                env_nonempty("SMTP_HOST"),
                env_nonempty("SMTP_USER"),
                env_nonempty("SMTP_PASS"),
            ) {
                (Some(host), Some(user), Some(pass)) => Some(SmtpSettings { host, user, pass }),
                _ => None,
            },
        };

        s
    }
}

/// Split a comma-separated address list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T, F>(name: &str, default: T, valid: F) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&T) -> bool,
{
    let Some(raw) = env_nonempty(name) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            tracing::warn!(var = name, value = %raw, %default, "invalid value, using default");
            default
        }
    }
}
