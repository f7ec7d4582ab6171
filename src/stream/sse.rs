//! Incremental Server-Sent Events decoder.

use crate::stream::Frame;

/// Event name used when a frame carries no `event:` field.
pub const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body; returns the frames it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(frame) = self.feed_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drop a frame left unterminated when the body ended.
    ///
    /// A frame only counts once its blank line arrives. Returns whether
    /// anything was buffered.
    pub fn discard_partial(&mut self) -> bool {
        let pending = !self.buf.is_empty() || self.event.is_some() || !self.data.is_empty();
        self.buf.clear();
        self.event = None;
        self.data.clear();
        pending
    }

    fn feed_line(&mut self, line: &str) -> Option<Frame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        // blank line ends the frame
        if line.is_empty() {
            return self.take_frame();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn take_frame(&mut self) -> Option<Frame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let event = event
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT.to_string());
        let data = std::mem::take(&mut self.data).join("\n");
        Some(Frame::new(event, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: heartbeat\ndata: ping\n\nevent: connected\ndata: {}\n\n");

        assert_eq!(
            frames,
            vec![Frame::new("heartbeat", "ping"), Frame::new("connected", "{}")]
        );
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: new_tr").is_empty());
        assert!(decoder.feed(b"uths\ndata: {\"data\"").is_empty());
        let frames = decoder.feed(b": []}\r\n\r\n");

        assert_eq!(frames, vec![Frame::new("new_truths", "{\"data\": []}")]);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\ndata: a\ndata: b\nid: 4\n\n");

        assert_eq!(frames, vec![Frame::new(DEFAULT_EVENT, "a\nb")]);
    }

    #[test]
    fn test_unterminated_frame_is_discarded() {
        let mut decoder = SseDecoder::new();
        assert!(decoder
            .feed(b"event: new_truths\ndata: {\"data\":[{\"id\":\"9\"}]}\n")
            .is_empty());

        assert!(decoder.discard_partial());
        assert!(!decoder.discard_partial());
        // the dropped fields do not leak into the next frame
        assert_eq!(decoder.feed(b"data: x\n\n"), vec![Frame::new(DEFAULT_EVENT, "x")]);
    }

    #[test]
    fn test_event_without_data_is_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: heartbeat\n\n").is_empty());
        assert_eq!(
            decoder.feed(b"data: {}\n\n"),
            vec![Frame::new(DEFAULT_EVENT, "{}")]
        );
    }

    #[test]
    fn test_empty_data_line_still_dispatches() {
        let mut decoder = SseDecoder::new();
        assert_eq!(
            decoder.feed(b"event: connected\ndata:\n\n"),
            vec![Frame::new("connected", "")]
        );
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: é\n\n".as_bytes();
        assert!(decoder.feed(&bytes[..7]).is_empty());
        assert_eq!(decoder.feed(&bytes[7..]), vec![Frame::new(DEFAULT_EVENT, "é")]);
    }
}
