// src/ingest/query.rs
use anyhow::{bail, Context, Result};
use reqwest::Url;

use crate::config::{FeedLocale, TrackedEntity};

pub const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";

/// `("alias1" OR "alias2") AND (kw1 OR kw2)`.
///
/// An entity without aliases cannot be searched and is a configuration error.
pub fn build_query(entity: &TrackedEntity, keywords: &[String]) -> Result<String> {
    if entity.aliases.is_empty() {
        bail!("entity `{}` has no aliases", entity.display_name);
    }

    let names = entity
        .aliases
        .iter()
        .map(|a| format!("\"{}\"", a.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ");

    let terms: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if terms.is_empty() {
        return Ok(format!("({names})"));
    }
    Ok(format!("({names}) AND ({})", terms.join(" OR ")))
}

/// Full search URL with the query and locale parameters encoded.
pub fn build_search_url(
    entity: &TrackedEntity,
    keywords: &[String],
    locale: &FeedLocale,
) -> Result<String> {
    let q = build_query(entity, keywords)?;
    let url = Url::parse_with_params(
        GOOGLE_NEWS_SEARCH,
        &[
            ("q", q.as_str()),
            ("hl", locale.hl.as_str()),
            ("gl", locale.gl.as_str()),
            ("ceid", locale.ceid.as_str()),
        ],
    )
    .context("building feed search url")?;
    Ok(url.to_string())
}
