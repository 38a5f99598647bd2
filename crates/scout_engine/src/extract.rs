use scout_core::Record;
use serde::Deserialize;

use crate::ExtractionError;

/// Maps one platform-native result item into a [`Record`].
///
/// Implementations are pure; a malformed item yields an error and is skipped
/// by the caller.
pub trait RecordExtractor<I>: Send + Sync {
    fn extract(&self, item: &I) -> Result<Record, ExtractionError>;
}

/// Declared shape of a post as returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct PostItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<PostAuthor>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub media: Vec<MediaAttachment>,
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostAuthor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaAttachment {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub streams: Vec<MediaStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedGif,
    Other(String),
}

impl From<String> for MediaKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "photo" => MediaKind::Photo,
            "video" => MediaKind::Video,
            "animated_gif" => MediaKind::AnimatedGif,
            _ => MediaKind::Other(value),
        }
    }
}

impl MediaKind {
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::AnimatedGif => "animated_gif",
            MediaKind::Other(kind) => kind,
        }
    }
}

/// One encoded variant of a video; variants are ordered lowest to highest quality.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaStream {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub expanded_url: Option<String>,
}

/// Extractor for [`PostItem`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostExtractor;

impl RecordExtractor<PostItem> for PostExtractor {
    fn extract(&self, item: &PostItem) -> Result<Record, ExtractionError> {
        let id = item
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ExtractionError::MissingId)?
            .to_string();
        let author = item
            .user
            .as_ref()
            .ok_or_else(|| ExtractionError::MissingAuthor { id: id.clone() })?;

        let mut media_urls = Vec::new();
        let mut media_types = Vec::with_capacity(item.media.len());
        for media in &item.media {
            media_types.push(media.kind.as_str().to_string());
            if let Some(url) = media_url(media) {
                media_urls.push(url);
            }
        }

        let urls = item
            .urls
            .iter()
            .filter_map(|entity| entity.expanded_url.as_deref())
            .filter(|url| !url.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        Ok(Record::new(id, author.id.clone())
            .with_text(item.text.clone())
            .with_created_at(item.created_at.clone())
            .with_author_username(author.name.clone())
            .with_counts(item.retweet_count, item.favorite_count, item.reply_count)
            .with_media(media_urls, media_types)
            .with_urls(urls))
    }
}

fn media_url(media: &MediaAttachment) -> Option<String> {
    match media.kind {
        MediaKind::Photo => media
            .media_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| format!("{url}?format=jpg&name=large")),
        MediaKind::Video | MediaKind::AnimatedGif => {
            media.streams.last().map(|stream| stream.url.clone())
        }
        MediaKind::Other(_) => None,
    }
}
