use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Stable identity of a post.
///
/// Older servers send numeric ids, newer ones strings; both decode into the
/// same decimal string so that `1` and `"1"` refer to the same post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for PostId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Int(i64),
            UInt(u64),
            Float(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => Ok(Self(s)),
            Raw::Int(n) => Ok(Self(n.to_string())),
            Raw::UInt(n) => Ok(Self(n.to_string())),
            Raw::Float(f) if f.fract() == 0.0 => Ok(Self(format!("{:.0}", f))),
            Raw::Float(f) => Err(serde::de::Error::custom(format!(
                "non-integral post id: {}",
                f
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

const VIDEO_SUFFIXES: [&str; 4] = [".mp4", ".mov", ".webm", ".m4v"];

impl MediaKind {
    /// Classify an attachment URL by its filename suffix.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if VIDEO_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(
        rename = "content",
        alias = "body",
        default,
        deserialize_with = "lenient_string"
    )]
    pub body: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(
        default,
        alias = "media_url",
        deserialize_with = "lenient_string_list"
    )]
    pub media_urls: Vec<String>,
    #[serde(
        rename = "url",
        alias = "source_url",
        default,
        deserialize_with = "lenient_string"
    )]
    pub source_url: String,
    #[serde(
        default,
        alias = "ai_overview",
        skip_serializing_if = "Option::is_none"
    )]
    pub annotation: Option<String>,
}

impl Post {
    pub fn new(id: impl Into<PostId>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            timestamp: String::new(),
            media_urls: Vec::new(),
            source_url: String::new(),
            annotation: None,
        }
    }

    /// Parse the display timestamp, if it is RFC 3339.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    pub fn display_timestamp(&self) -> String {
        self.published_at()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown date".to_string())
    }

    pub fn media(&self) -> impl Iterator<Item = (MediaKind, &str)> {
        self.media_urls
            .iter()
            .map(|url| (MediaKind::from_url(url), url.as_str()))
    }

    /// Apply the present, non-empty fields of `patch`.
    ///
    /// Returns true if any field changed.
    pub fn merge(&mut self, patch: PostPatch) -> bool {
        let before = self.clone();

        if let Some(body) = patch.body.filter(|s| !s.is_empty()) {
            self.body = body;
        }
        if let Some(timestamp) = patch.timestamp.filter(|s| !s.is_empty()) {
            self.timestamp = timestamp;
        }
        if let Some(media_urls) = patch.media_urls.filter(|v| !v.is_empty()) {
            self.media_urls = media_urls;
        }
        if let Some(source_url) = patch.source_url.filter(|s| !s.is_empty()) {
            self.source_url = source_url;
        }
        if let Some(annotation) = patch.annotation.filter(|s| !s.is_empty()) {
            self.annotation = Some(annotation);
        }

        *self != before
    }
}

/// Partial post carried by update deltas.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostPatch {
    pub id: Option<PostId>,
    #[serde(rename = "content", alias = "body", default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "media_url")]
    pub media_urls: Option<Vec<String>>,
    #[serde(rename = "url", alias = "source_url", default)]
    pub source_url: Option<String>,
    #[serde(default, alias = "ai_overview")]
    pub annotation: Option<String>,
}

impl PostPatch {
    pub fn annotation(id: impl Into<PostId>, annotation: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            annotation: Some(annotation.into()),
            ..Default::default()
        }
    }
}

impl From<Post> for PostPatch {
    fn from(post: Post) -> Self {
        Self {
            id: Some(post.id),
            body: Some(post.body),
            timestamp: Some(post.timestamp),
            media_urls: Some(post.media_urls),
            source_url: Some(post.source_url),
            annotation: post.annotation,
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(values) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        serde_json::Value::String(s) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_and_string_ids_match() {
        let a: Post = serde_json::from_value(json!({"id": 42, "content": "x"})).unwrap();
        let b: Post = serde_json::from_value(json!({"id": "42", "content": "y"})).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.as_str(), "42");
    }

    #[test]
    fn test_large_numeric_ids_stay_exact() {
        let a: Post = serde_json::from_str(r#"{"id": 18446744073709551615}"#).unwrap();
        let b: Post = serde_json::from_str(r#"{"id": 18446744073709551614}"#).unwrap();
        assert_eq!(a.id.as_str(), "18446744073709551615");
        assert_eq!(b.id.as_str(), "18446744073709551614");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_older_shape_decodes() {
        let post: Post = serde_json::from_value(json!({
            "id": 7,
            "content": "<p>hi</p>",
            "media_url": ["https://cdn.example.com/a.jpg"],
            "timestamp": "2025-01-02T03:04:05Z",
            "url": "https://truthsocial.com/@x/7"
        }))
        .unwrap();

        assert_eq!(post.body, "<p>hi</p>");
        assert_eq!(post.media_urls, vec!["https://cdn.example.com/a.jpg"]);
        assert_eq!(post.source_url, "https://truthsocial.com/@x/7");
        assert_eq!(post.annotation, None);
    }

    #[test]
    fn test_null_body_is_empty() {
        let post: Post = serde_json::from_value(json!({"id": "1", "content": null})).unwrap();
        assert_eq!(post.body, "");

        let post: Post = serde_json::from_value(json!({"id": "1", "content": 12})).unwrap();
        assert_eq!(post.body, "");
    }

    #[test]
    fn test_merge_annotation_keeps_other_fields() {
        let mut post = Post::new("1", "b");
        let changed = post.merge(PostPatch::annotation("1", "x"));

        assert!(changed);
        assert_eq!(post.body, "b");
        assert_eq!(post.annotation, Some("x".into()));
    }

    #[test]
    fn test_merge_ignores_empty_fields() {
        let mut post = Post::new("1", "b");
        post.annotation = Some("kept".into());

        let patch = PostPatch {
            id: Some("1".into()),
            body: Some(String::new()),
            annotation: Some(String::new()),
            media_urls: Some(Vec::new()),
            ..Default::default()
        };
        assert!(!post.merge(patch));
        assert_eq!(post.body, "b");
        assert_eq!(post.annotation, Some("kept".into()));
    }

    #[test]
    fn test_media_kind_by_suffix() {
        assert_eq!(
            MediaKind::from_url("https://cdn.example.com/v/clip.MP4?x=1"),
            MediaKind::Video
        );
        assert_eq!(
            MediaKind::from_url("https://cdn.example.com/i/photo.png"),
            MediaKind::Image
        );
    }

    #[test]
    fn test_display_timestamp() {
        let mut post = Post::new("1", "");
        assert_eq!(post.display_timestamp(), "Unknown date");
        post.timestamp = "2025-01-02T03:04:05Z".into();
        assert_eq!(post.display_timestamp(), "2025-01-02 03:04:05");
    }
}
