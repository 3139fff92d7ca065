//! Apify-backed reel scraping.
//!
//! Calls the Apify Instagram scraper actor synchronously and normalizes its
//! inconsistent result schema into `Reel` records.

use super::{dedup_reels, FetchSource, Reel, Target};
use crate::config::ScrapeSettings;
use crate::error::{ReelsmithError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const APIFY_API_BASE: &str = "https://api.apify.com/v2";

/// Reel scraper backed by an Apify actor run.
pub struct ApifyFetcher {
    http: reqwest::Client,
    token: String,
    actor: String,
    over_fetch_factor: usize,
}

impl ApifyFetcher {
    /// Create a fetcher from scrape settings. Reads the API token from the
    /// `APIFY_API_TOKEN` environment variable.
    pub fn new(settings: &ScrapeSettings) -> Result<Self> {
        let token = std::env::var("APIFY_API_TOKEN").map_err(|_| {
            ReelsmithError::Config("APIFY_API_TOKEN environment variable is not set".to_string())
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| ReelsmithError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token,
            actor: settings.actor.clone(),
            over_fetch_factor: settings.over_fetch_factor.max(1),
        })
    }

    /// Run the actor for one target and return its raw dataset items.
    async fn run_actor(&self, input: Value) -> Result<Vec<Value>> {
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            APIFY_API_BASE, self.actor
        );

        let response = self
            .http
            .post(&url)
            .query(&[("token", self.token.as_str())])
            .json(&input)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ReelsmithError::RateLimited(
                "Apify returned 429 Too Many Requests".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelsmithError::Fetch(format!(
                "Apify actor run failed with status {}: {}",
                status, body
            )));
        }

        let items: Vec<Value> = response.json().await?;
        debug!("Actor returned {} dataset items", items.len());
        Ok(items)
    }

    /// Scrape one target and return ranked, qualifying reels.
    async fn scrape_target(&self, target: &Target, limit: usize) -> Result<Vec<Reel>> {
        // Over-fetch so filtering still leaves enough candidates.
        let results_limit = limit * self.over_fetch_factor;

        let input = match target {
            Target::Hashtag(tag) => json!({
                "hashtags": [tag],
                "resultsLimit": results_limit,
                "scrapeType": "posts",
                "isUserReelFeedURL": false,
                "addParentData": false,
            }),
            Target::Profile { url, .. } => json!({
                "directUrls": [url],
                "resultsType": "posts",
                "resultsLimit": results_limit,
                "addParentData": false,
            }),
        };

        let items = self.run_actor(input).await?;

        let mut reels: Vec<Reel> = items.iter().filter_map(parse_item).collect();

        // Rank by view count descending; unknown counts sort last.
        reels.sort_by_key(|r| std::cmp::Reverse(r.views.unwrap_or(0)));
        reels.truncate(limit);

        info!("Found {} reels for {}", reels.len(), target);
        Ok(reels)
    }
}

#[async_trait]
impl FetchSource for ApifyFetcher {
    #[instrument(skip(self), fields(targets = targets.len()))]
    async fn fetch(&self, targets: &[Target], limit_per_target: usize) -> Result<Vec<Reel>> {
        let mut all_reels = Vec::new();

        for target in targets {
            match self.scrape_target(target, limit_per_target).await {
                Ok(batch) => all_reels.extend(batch),
                Err(e) => warn!("Error scraping '{}': {}", target, e),
            }
        }

        Ok(dedup_reels(all_reels))
    }
}

/// Convert a raw Apify dataset item into a `Reel`.
///
/// The actor returns slightly different fields depending on run type; both
/// post-level and reel-level variants are handled. Non-video posts are
/// skipped.
fn parse_item(item: &Value) -> Option<Reel> {
    let video_url = str_field(item, &["videoUrl", "video_url"])?;

    let shortcode = str_field(item, &["shortCode", "id"])?;
    let url = str_field(item, &["url"])
        .unwrap_or_else(|| format!("https://www.instagram.com/reel/{}/", shortcode));

    let views = u64_field(item, &["videoViewCount", "videoPlayCount"]);

    Some(Reel {
        shortcode,
        url,
        video_url: Some(video_url),
        caption: str_field(item, &["caption", "text"]).unwrap_or_default(),
        views,
        likes: u64_field(item, &["likesCount", "likes"]).unwrap_or(0),
        comments: u64_field(item, &["commentsCount", "comments"]).unwrap_or(0),
        owner_username: str_field(item, &["ownerUsername", "username"]).unwrap_or_default(),
        timestamp: str_field(item, &["timestamp", "taken_at"]).unwrap_or_default(),
        hashtags: item
            .get("hashtags")
            .and_then(|v| v.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        views_unverified: false,
    })
}

fn str_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn u64_field(item: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().filter_map(|k| item.get(*k)).find_map(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_reel_fields() {
        let item = json!({
            "shortCode": "Cxyz123",
            "url": "https://www.instagram.com/reel/Cxyz123/",
            "videoUrl": "https://cdn.example.com/v.mp4",
            "caption": "go harder",
            "videoViewCount": 2_500_000u64,
            "likesCount": 80_000u64,
            "commentsCount": 900u64,
            "ownerUsername": "creator",
            "timestamp": "2024-01-01T00:00:00Z",
            "hashtags": ["fitness", "gym"],
        });

        let reel = parse_item(&item).unwrap();
        assert_eq!(reel.shortcode, "Cxyz123");
        assert_eq!(reel.views, Some(2_500_000));
        assert_eq!(reel.hashtags, vec!["fitness", "gym"]);
    }

    #[test]
    fn test_parse_item_alternate_field_names() {
        let item = json!({
            "id": "abc",
            "video_url": "https://cdn.example.com/v.mp4",
            "text": "caption text",
            "videoPlayCount": 100u64,
            "likes": 5u64,
            "username": "other",
        });

        let reel = parse_item(&item).unwrap();
        assert_eq!(reel.shortcode, "abc");
        assert_eq!(reel.caption, "caption text");
        assert_eq!(reel.views, Some(100));
        assert_eq!(reel.likes, 5);
        assert_eq!(reel.owner_username, "other");
        assert_eq!(reel.url, "https://www.instagram.com/reel/abc/");
    }

    #[test]
    fn test_parse_item_skips_non_video_posts() {
        let item = json!({
            "shortCode": "photo1",
            "caption": "just a photo",
        });
        assert!(parse_item(&item).is_none());
    }

    #[test]
    fn test_parse_item_missing_views_is_none() {
        let item = json!({
            "shortCode": "abc",
            "videoUrl": "https://cdn.example.com/v.mp4",
        });
        let reel = parse_item(&item).unwrap();
        assert_eq!(reel.views, None);
    }
}
