//! Rich-text normalization for post bodies.
//!
//! Post bodies arrive as HTML fragments: paragraph wrappers, inline links whose
//! text is split into `invisible`/`ellipsis` spans, and quote markers. The
//! [`ContentProcessor`] turns one body into [`ProcessedSegment`]s that any
//! renderer can draw. It never fails: on internal errors it returns the input
//! unchanged as a single text segment.

use std::sync::OnceLock;

use html_escape::decode_html_entities;
use regex::Regex;
use thiserror::Error;

use crate::domain::ProcessedSegment;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid content pattern: {0}")]
    Pattern(#[from] regex::Error),
}

struct Patterns {
    paragraph: Regex,
    quote: Regex,
    link: Regex,
    span: Regex,
    tag: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            paragraph: Regex::new(r"</?p>")?,
            quote: Regex::new(r#"<span class="quote-inline"><br/>RT: ([^<]*)</span>"#)?,
            link: Regex::new(r#"<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)?,
            span: Regex::new(r"<span[^>]*>(.*?)</span>")?,
            tag: Regex::new(r"<[^>]*>")?,
        })
    }
}

fn patterns() -> Result<&'static Patterns, ContentError> {
    static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();
    PATTERNS
        .get_or_init(Patterns::compile)
        .as_ref()
        .map_err(|e| ContentError::Pattern(e.clone()))
}

/// Switches for the individual normalization passes. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Emit link segments; when off, all markup is stripped into one text segment
    pub preserve_links: bool,
    pub strip_paragraphs: bool,
    /// Rebuild truncated link text from its `invisible`/`ellipsis` spans
    pub process_ellipsis: bool,
    /// Rewrite quote-inline spans to `RT: ...`
    pub process_quotes: bool,
    /// Decode HTML entities in text, link text and hrefs; quoted `RT:` text is left as sent
    pub decode_entities: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            preserve_links: true,
            strip_paragraphs: true,
            process_ellipsis: true,
            process_quotes: true,
            decode_entities: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentProcessor {
    options: ProcessOptions,
}

impl ContentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ProcessOptions) -> Self {
        Self { options }
    }

    /// Split `html` into an ordered, non-empty list of segments.
    pub fn process(&self, html: &str) -> Vec<ProcessedSegment> {
        if html.is_empty() {
            return vec![ProcessedSegment::text("")];
        }

        match self.try_process(html) {
            Ok(segments) => segments,
            Err(e) => {
                tracing::warn!("Error processing HTML content: {}", e);
                vec![ProcessedSegment::text(html)]
            }
        }
    }

    /// Plain-text rendering: link segments contribute only their text.
    pub fn to_text(&self, html: &str) -> String {
        processed_to_text(&self.process(html))
    }

    fn try_process(&self, html: &str) -> Result<Vec<ProcessedSegment>, ContentError> {
        let patterns = patterns()?;
        let mut content = html.to_string();

        if self.options.strip_paragraphs {
            content = patterns.paragraph.replace_all(&content, "").into_owned();
        }

        if self.options.process_quotes {
            // quoted text stays verbatim through the later entity decode
            let escape = self.options.decode_entities;
            content = patterns
                .quote
                .replace_all(&content, |caps: &regex::Captures| {
                    let quoted = &caps[1];
                    if escape {
                        format!("RT: {}", quoted.replace('&', "&amp;"))
                    } else {
                        format!("RT: {}", quoted)
                    }
                })
                .into_owned();
        }

        if !self.options.preserve_links {
            return Ok(vec![ProcessedSegment::Text(
                self.clean_text(patterns, &content),
            )]);
        }

        Ok(self.extract_links(patterns, &content))
    }

    fn extract_links(&self, patterns: &Patterns, content: &str) -> Vec<ProcessedSegment> {
        let mut segments = Vec::new();
        let mut last_end = 0;

        for caps in patterns.link.captures_iter(content) {
            let (Some(whole), Some(href), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            if whole.start() > last_end {
                let before = self.clean_text(patterns, &content[last_end..whole.start()]);
                if !before.is_empty() {
                    segments.push(ProcessedSegment::Text(before));
                }
            }

            let text = self.link_text(patterns, inner.as_str());
            segments.push(ProcessedSegment::link(text, self.decode(href.as_str())));
            last_end = whole.end();
        }

        if last_end < content.len() {
            let rest = self.clean_text(patterns, &content[last_end..]);
            if !rest.is_empty() {
                segments.push(ProcessedSegment::Text(rest));
            }
        }

        if segments.is_empty() {
            segments.push(ProcessedSegment::Text(self.clean_text(patterns, content)));
        }

        segments
    }

    fn link_text(&self, patterns: &Patterns, inner: &str) -> String {
        if self.options.process_ellipsis && inner.contains("ellipsis") {
            let spans: Vec<&str> = patterns
                .span
                .find_iter(inner)
                .map(|m| m.as_str())
                .take(3)
                .collect();

            if spans.len() == 3 {
                let joined: String = spans
                    .iter()
                    .map(|span| patterns.tag.replace_all(span, ""))
                    .collect();
                return self.decode(&joined);
            }
        }

        self.clean_text(patterns, inner)
    }

    fn clean_text(&self, patterns: &Patterns, text: &str) -> String {
        let stripped = patterns.tag.replace_all(text, "");
        self.decode(&stripped)
    }

    fn decode(&self, text: &str) -> String {
        if self.options.decode_entities {
            decode_html_entities(text).into_owned()
        } else {
            text.to_string()
        }
    }
}

/// Normalize one post body with the default options.
pub fn process_html_content(html: &str) -> Vec<ProcessedSegment> {
    ContentProcessor::new().process(html)
}

pub fn process_html_content_with(html: &str, options: ProcessOptions) -> Vec<ProcessedSegment> {
    ContentProcessor::with_options(options).process(html)
}

/// Normalize one post body straight to plain text, for collapsed previews.
pub fn process_to_text(html: &str) -> String {
    ContentProcessor::new().to_text(html)
}

pub fn processed_to_text(segments: &[ProcessedSegment]) -> String {
    segments.iter().map(ProcessedSegment::as_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ProcessedSegment {
        ProcessedSegment::text(s)
    }

    fn link(t: &str, href: &str) -> ProcessedSegment {
        ProcessedSegment::link(t, href)
    }

    #[test]
    fn test_plain_paragraph() {
        assert_eq!(
            process_html_content("<p>Hello world</p>"),
            vec![text("Hello world")]
        );
    }

    #[test]
    fn test_single_link() {
        assert_eq!(
            process_html_content(r#"<p>See <a href="http://x">here</a> now</p>"#),
            vec![text("See "), link("here", "http://x"), text(" now")]
        );
    }

    #[test]
    fn test_truncated_link_reconstructed() {
        let html = concat!(
            r#"<p><a href="https://example.com/a/long/path" rel="nofollow noopener" target="_blank">"#,
            r#"<span class="invisible">abc</span><span class="ellipsis">…</span>"#,
            r#"<span class="invisible">xyz</span></a></p>"#
        );
        assert_eq!(
            process_html_content(html),
            vec![link("abc…xyz", "https://example.com/a/long/path")]
        );
    }

    #[test]
    fn test_link_with_spans_but_no_ellipsis_is_stripped() {
        let html = r#"<a href="u"><span class="invisible">https://</span><span>site.com</span></a>"#;
        assert_eq!(
            process_html_content(html),
            vec![link("https://site.com", "u")]
        );
    }

    #[test]
    fn test_ellipsis_with_too_few_spans_falls_back_to_strip() {
        let html = r#"<a href="u"><span class="ellipsis">abc</span>def</a>"#;
        assert_eq!(process_html_content(html), vec![link("abcdef", "u")]);
    }

    #[test]
    fn test_quote_rewrite() {
        assert_eq!(
            process_html_content(r#"<span class="quote-inline"><br/>RT: hello</span>"#),
            vec![text("RT: hello")]
        );
    }

    #[test]
    fn test_quote_text_is_not_entity_decoded() {
        assert_eq!(
            process_html_content(
                r#"<p>a &amp; b<span class="quote-inline"><br/>RT: x &amp; y</span></p>"#
            ),
            vec![text("a & bRT: x &amp; y")]
        );
    }

    #[test]
    fn test_quote_rewrite_with_following_link() {
        let html = concat!(
            r#"<p>Look<span class="quote-inline"><br/>RT: https://t.co/1</span> "#,
            r#"<a href="https://t.co/2">more</a></p>"#
        );
        assert_eq!(
            process_html_content(html),
            vec![text("LookRT: https://t.co/1 "), link("more", "https://t.co/2")]
        );
    }

    #[test]
    fn test_multiple_links_and_inline_markup() {
        let html = r#"<p>A <b>bold</b> <a href="1">one</a><br/><a href="2"><em>two</em></a> end</p>"#;
        assert_eq!(
            process_html_content(html),
            vec![
                text("A bold "),
                link("one", "1"),
                link("two", "2"),
                text(" end"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(process_html_content(""), vec![text("")]);
    }

    #[test]
    fn test_null_body_renders_empty() {
        let post: crate::domain::Post =
            serde_json::from_str(r#"{"id": 1, "content": null}"#).unwrap();
        assert_eq!(process_html_content(&post.body), vec![text("")]);
    }

    #[test]
    fn test_markup_only_input_yields_one_empty_segment() {
        assert_eq!(process_html_content("<p></p><br/>"), vec![text("")]);
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            process_html_content(r#"<p>Tom &amp; Jerry&#39;s <a href="/q?a=1&amp;b=2">x</a></p>"#),
            vec![text("Tom & Jerry's "), link("x", "/q?a=1&b=2")]
        );
    }

    #[test]
    fn test_entities_kept_when_disabled() {
        let options = ProcessOptions {
            decode_entities: false,
            ..Default::default()
        };
        assert_eq!(
            process_html_content_with("<p>a &amp; b</p>", options),
            vec![text("a &amp; b")]
        );
    }

    #[test]
    fn test_without_link_preservation() {
        let options = ProcessOptions {
            preserve_links: false,
            ..Default::default()
        };
        assert_eq!(
            process_html_content_with(r#"<p>See <a href="http://x">here</a></p>"#, options),
            vec![text("See here")]
        );
    }

    #[test]
    fn test_plain_text_mode() {
        assert_eq!(
            process_to_text(r#"<p>See <a href="http://x">here</a> now</p>"#),
            "See here now"
        );
    }

    #[test]
    fn test_non_ascii_text_around_links() {
        assert_eq!(
            process_html_content(r#"<p>¡Hola — <a href="h">ñandú</a> 🎉</p>"#),
            vec![text("¡Hola — "), link("ñandú", "h"), text(" 🎉")]
        );
    }
}
