use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{CollabContext, CollabError, CollabResult, Member};

const YOUTUBE_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

/// A video that could serve as backing track for a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Video search is not configured")]
    NotConfigured,
    #[error("Video search timed out")]
    TimedOut,
    #[error("Video search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Video search answered with status {0}")]
    Status(u16),
    #[error("Invalid search endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("Could not read search fixtures: {0}")]
    Fixtures(String),
}

impl From<SearchError> for CollabError {
    fn from(value: SearchError) -> Self {
        Self::Unavailable(value.to_string())
    }
}

/// Something that finds videos for a free text query
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoCandidate>, SearchError>;
}

pub type ArcedVideoSearch = Arc<dyn VideoSearch>;

/// The query used to look for a karaoke version of a song
pub fn karaoke_query(title: &str, artist: &str) -> String {
    [title.trim(), artist.trim(), "karaoke"]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Searches with the YouTube Data API
pub struct YoutubeSearch {
    client: Client,
    api_key: String,
    endpoint: Url,
}

#[derive(Deserialize)]
struct YoutubeResponse {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Deserialize)]
struct YoutubeItem {
    id: YoutubeItemId,
    snippet: YoutubeSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeItemId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeSnippet {
    title: String,
    channel_title: String,
    thumbnails: YoutubeThumbnails,
}

#[derive(Deserialize)]
struct YoutubeThumbnails {
    medium: Option<YoutubeThumbnail>,
    default: Option<YoutubeThumbnail>,
}

#[derive(Deserialize)]
struct YoutubeThumbnail {
    url: String,
}

impl YoutubeSearch {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: Url::parse(YOUTUBE_SEARCH_ENDPOINT)?,
        })
    }

    fn request_url(&self, query: &str, limit: usize) -> Url {
        let mut url = self.endpoint.clone();

        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("q", query)
            .append_pair("maxResults", &limit.to_string())
            .append_pair("key", &self.api_key);

        url
    }
}

#[async_trait]
impl VideoSearch for YoutubeSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoCandidate>, SearchError> {
        let response = self
            .client
            .get(self.request_url(query, limit))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body: YoutubeResponse = response.json().await?;

        let candidates = body
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let thumbnail = item
                    .snippet
                    .thumbnails
                    .medium
                    .or(item.snippet.thumbnails.default)
                    .map(|t| t.url)
                    .unwrap_or_default();

                Some(VideoCandidate {
                    url: format!("https://www.youtube.com/watch?v={}", video_id),
                    video_id,
                    title: item.snippet.title,
                    channel: item.snippet.channel_title,
                    thumbnail,
                })
            })
            .take(limit)
            .collect();

        Ok(candidates)
    }
}

/// Answers every query with the same fixed set of videos, for offline use
pub struct FixtureSearch {
    candidates: Vec<VideoCandidate>,
}

impl FixtureSearch {
    pub fn new(candidates: Vec<VideoCandidate>) -> Self {
        Self { candidates }
    }

    /// Reads a JSON array of candidates
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SearchError::Fixtures(e.to_string()))?;

        let candidates =
            serde_json::from_str(&text).map_err(|e| SearchError::Fixtures(e.to_string()))?;

        Ok(Self::new(candidates))
    }
}

#[async_trait]
impl VideoSearch for FixtureSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<VideoCandidate>, SearchError> {
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }
}

/// Used when no search backend is configured
pub struct DisabledSearch;

#[async_trait]
impl VideoSearch for DisabledSearch {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<VideoCandidate>, SearchError> {
        Err(SearchError::NotConfigured)
    }
}

/// Video lookups on behalf of a venue
pub struct Search {
    context: CollabContext,
}

impl Search {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Finds karaoke videos for a song
    pub async fn videos(
        &self,
        member: &Member,
        title: &str,
        artist: &str,
    ) -> CollabResult<Vec<VideoCandidate>> {
        member.ensure_admin()?;

        let query = karaoke_query(title, artist);
        let limit = self.context.config.search_results;

        Ok(self.run(&query, limit).await?)
    }

    /// The best video for a song, if the search finds any. Failures are only logged.
    pub(crate) async fn first_video(&self, title: &str, artist: &str) -> Option<String> {
        let query = karaoke_query(title, artist);

        match self.run(&query, 1).await {
            Ok(candidates) => {
                let url = candidates.into_iter().next().map(|c| c.url);
                info!("Searched video for '{}': {:?}", query, url);
                url
            }
            Err(e) => {
                warn!("Automatic video search for '{}' failed: {}", query, e);
                None
            }
        }
    }

    async fn run(&self, query: &str, limit: usize) -> Result<Vec<VideoCandidate>, SearchError> {
        let timeout = self.context.config.downstream_timeout;

        tokio::time::timeout(timeout, self.context.search.search(query, limit))
            .await
            .map_err(|_| SearchError::TimedOut)?
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{karaoke_query, FixtureSearch, VideoCandidate, VideoSearch, YoutubeSearch};

    #[test]
    fn queries_skip_empty_parts() {
        assert_eq!(karaoke_query("Imagine", "John Lennon"), "Imagine John Lennon karaoke");
        assert_eq!(karaoke_query(" Imagine ", ""), "Imagine karaoke");
    }

    #[test]
    fn youtube_requests_carry_query_and_key() {
        let search = YoutubeSearch::new("secret".to_string(), Duration::from_secs(1)).unwrap();
        let url = search.request_url("Imagine karaoke", 5);
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("q".to_string(), "Imagine karaoke".to_string())));
        assert!(pairs.contains(&("maxResults".to_string(), "5".to_string())));
        assert!(pairs.contains(&("key".to_string(), "secret".to_string())));
    }

    #[tokio::test]
    async fn fixtures_are_capped_by_limit() {
        let candidate = |id: &str| VideoCandidate {
            video_id: id.to_string(),
            title: format!("Song {}", id),
            channel: "Karaoke Channel".to_string(),
            thumbnail: String::new(),
            url: format!("https://www.youtube.com/watch?v={}", id),
        };

        let search = FixtureSearch::new(vec![candidate("a"), candidate("b"), candidate("c")]);
        let found = search.search("anything", 2).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].video_id, "a");
    }
}
