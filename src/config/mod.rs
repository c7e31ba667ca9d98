// src/config/mod.rs
pub mod settings;
pub mod watchlist;

pub use settings::{MailSettings, Settings, SmtpSettings, TargetZone};
pub use watchlist::{FeedLocale, KeywordSets, TrackedEntity, Watchlist};
