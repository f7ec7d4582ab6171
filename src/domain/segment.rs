use serde::Serialize;

/// One unit of normalized post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProcessedSegment {
    Text(String),
    Link { text: String, href: String },
}

impl ProcessedSegment {
    pub fn text(s: impl Into<String>) -> Self {
        ProcessedSegment::Text(s.into())
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        ProcessedSegment::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    /// The human-readable text of this segment.
    pub fn as_text(&self) -> &str {
        match self {
            ProcessedSegment::Text(s) => s,
            ProcessedSegment::Link { text, .. } => text,
        }
    }
}
