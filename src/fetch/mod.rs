//! Reel scraping abstraction for Reelsmith.
//!
//! Provides a trait-based interface for scraping backends, plus the target
//! parsing and candidate filtering shared by all of them.

mod apify;

pub use apify::ApifyFetcher;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A scrape target: a hashtag or a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A hashtag, stored without the leading '#'.
    Hashtag(String),
    /// A profile, stored as (username, profile URL).
    Profile { username: String, url: String },
}

impl Target {
    /// Parse a raw target string.
    ///
    /// Accepts bare hashtags ("fitness", "#fitness"), handles ("@garyvee"),
    /// and full profile URLs. Returns None for empty input.
    pub fn parse(input: &str) -> Option<Target> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            let username = input
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(input)
                .to_string();
            return Some(Target::Profile {
                username,
                url: input.to_string(),
            });
        }

        if let Some(handle) = input.strip_prefix('@') {
            return Some(Target::Profile {
                username: handle.to_string(),
                url: format!("https://www.instagram.com/{}/", handle),
            });
        }

        Some(Target::Hashtag(input.trim_start_matches('#').to_string()))
    }

    /// Parse a comma-separated target list, skipping empty entries.
    pub fn parse_list(input: &[String]) -> Vec<Target> {
        input
            .iter()
            .flat_map(|chunk| chunk.split(','))
            .filter_map(Target::parse)
            .collect()
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Hashtag(tag) => write!(f, "#{}", tag),
            Target::Profile { username, .. } => write!(f, "@{}", username),
        }
    }
}

/// Metadata for a single scraped reel.
///
/// `views` is optional: the source reports view counts inconsistently, and
/// an absent count must not disqualify a reel. Filtering keeps such reels
/// and marks them `views_unverified` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reel {
    /// Stable identifier derived from the source platform.
    pub shortcode: String,
    /// Canonical post URL.
    pub url: String,
    /// Direct video URL used for audio extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub caption: String,
    pub views: Option<u64>,
    pub likes: u64,
    pub comments: u64,
    pub owner_username: String,
    /// Publication timestamp as reported by the source.
    pub timestamp: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Set during filtering when no view count was available.
    #[serde(default)]
    pub views_unverified: bool,
}

impl Reel {
    /// URL to download audio from: the direct video URL when the scraper
    /// provided one, otherwise the post URL.
    pub fn download_url(&self) -> &str {
        self.video_url.as_deref().unwrap_or(&self.url)
    }
}

/// Trait for scraping backends.
#[async_trait]
pub trait FetchSource: Send + Sync {
    /// Fetch candidate reels for the given targets.
    ///
    /// Returns a deduplicated list, ordered most-relevant-first (per-target
    /// view count descending). Individual target failures are logged and
    /// skipped; the call itself fails only when the backend is unusable.
    async fn fetch(&self, targets: &[Target], limit_per_target: usize) -> Result<Vec<Reel>>;
}

/// Remove duplicate reels, keeping the first occurrence of each shortcode.
pub fn dedup_reels(reels: Vec<Reel>) -> Vec<Reel> {
    let mut seen = std::collections::HashSet::new();
    reels
        .into_iter()
        .filter(|r| seen.insert(r.shortcode.clone()))
        .collect()
}

/// Apply the view-count filter and truncate to `max_reels`.
///
/// Reels with a known view count below `min_views` are dropped. Reels with
/// no view count are kept and flagged rather than dropped. Input order is
/// preserved (the fetch backend already ranks candidates).
pub fn filter_reels(reels: Vec<Reel>, min_views: u64, max_reels: usize) -> Vec<Reel> {
    reels
        .into_iter()
        .filter_map(|mut reel| match reel.views {
            Some(views) if views < min_views => None,
            Some(_) => Some(reel),
            None => {
                reel.views_unverified = true;
                Some(reel)
            }
        })
        .take(max_reels)
        .collect()
}

#[cfg(test)]
pub(crate) fn test_reel(shortcode: &str, views: Option<u64>) -> Reel {
    Reel {
        shortcode: shortcode.to_string(),
        url: format!("https://www.instagram.com/reel/{}/", shortcode),
        video_url: Some(format!("https://cdn.example.com/{}.mp4", shortcode)),
        caption: String::new(),
        views,
        likes: 0,
        comments: 0,
        owner_username: "creator".to_string(),
        timestamp: String::new(),
        hashtags: Vec::new(),
        views_unverified: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!(
            Target::parse("fitness"),
            Some(Target::Hashtag("fitness".to_string()))
        );
        assert_eq!(
            Target::parse("#fitness"),
            Some(Target::Hashtag("fitness".to_string()))
        );
        assert_eq!(
            Target::parse("@garyvee"),
            Some(Target::Profile {
                username: "garyvee".to_string(),
                url: "https://www.instagram.com/garyvee/".to_string(),
            })
        );
        assert_eq!(
            Target::parse("https://www.instagram.com/garyvee/"),
            Some(Target::Profile {
                username: "garyvee".to_string(),
                url: "https://www.instagram.com/garyvee/".to_string(),
            })
        );
        assert_eq!(Target::parse("  "), None);
    }

    #[test]
    fn test_parse_list_splits_commas() {
        let targets = Target::parse_list(&["fitness,@garyvee".to_string(), "".to_string()]);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], Target::Hashtag("fitness".to_string()));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let reels = vec![
            test_reel("a", Some(100)),
            test_reel("b", Some(200)),
            test_reel("a", Some(999)),
        ];
        let deduped = dedup_reels(reels);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].views, Some(100));
    }

    #[test]
    fn test_filter_drops_below_threshold() {
        let reels = vec![
            test_reel("a", Some(2_000_000)),
            test_reel("b", Some(500_000)),
            test_reel("c", Some(1_500_000)),
        ];
        let filtered = filter_reels(reels, 1_000_000, 10);
        let ids: Vec<&str> = filtered.iter().map(|r| r.shortcode.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_filter_keeps_and_flags_missing_views() {
        let reels = vec![test_reel("a", None), test_reel("b", Some(5_000_000))];
        let filtered = filter_reels(reels, 1_000_000, 10);
        assert_eq!(filtered.len(), 2);
        assert!(filtered[0].views_unverified);
        assert!(!filtered[1].views_unverified);
    }

    #[test]
    fn test_filter_truncates_preserving_order() {
        let reels = vec![
            test_reel("a", Some(9_000_000)),
            test_reel("b", Some(8_000_000)),
            test_reel("c", Some(7_000_000)),
        ];
        let filtered = filter_reels(reels, 1_000_000, 2);
        let ids: Vec<&str> = filtered.iter().map(|r| r.shortcode.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_filter_is_monotonic_in_min_views() {
        let reels: Vec<Reel> = (0..8)
            .map(|i| test_reel(&format!("r{}", i), Some(i * 400_000)))
            .collect();

        let mut last_count = usize::MAX;
        for min_views in [0u64, 500_000, 1_000_000, 2_000_000, 5_000_000] {
            let count = filter_reels(reels.clone(), min_views, 100).len();
            assert!(count <= last_count, "raising min_views increased the count");
            last_count = count;
        }
    }
}
