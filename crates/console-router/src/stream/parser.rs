//! SSE wire-format parser
//!
//! Incremental: bytes may arrive split at any point, events are emitted
//! once their terminating blank line has been seen.

use bytes::Bytes;
use tracing::trace;

use super::types::{ServerEvent, StreamError, StreamResult};

#[derive(Debug, Default)]
pub(crate) struct SseParser {
    /// Bytes of the current incomplete line
    buffer: Vec<u8>,
    /// `data:` lines of the event being accumulated
    data_lines: Vec<String>,
    event_type: Option<String>,
    /// Persists across events
    last_id: Option<String>,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every event completed by them
    pub(crate) fn feed(&mut self, bytes: Bytes) -> Vec<StreamResult<ServerEvent>> {
        let mut events = Vec::new();
        self.buffer.extend_from_slice(&bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &[u8]) -> Option<StreamResult<ServerEvent>> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment, used as keepalive
        if line.starts_with(b":") {
            trace!("SSE keepalive/comment");
            return None;
        }

        let line = match std::str::from_utf8(line) {
            Ok(s) => s,
            Err(_) => return Some(Err(StreamError::Parse("Invalid UTF-8 in SSE line".into()))),
        };

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };

        match field {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event_type = Some(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            "retry" => trace!("SSE retry ignored: {}", value),
            _ => trace!("SSE unknown field: {}", field),
        }

        None
    }

    fn dispatch(&mut self) -> Option<StreamResult<ServerEvent>> {
        let event_type = self.event_type.take();
        if self.data_lines.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data_lines).join("\n");

        Some(Ok(ServerEvent {
            event: event_type,
            id: self.last_id.clone(),
            data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut SseParser, input: &'static [u8]) -> Vec<ServerEvent> {
        parser
            .feed(Bytes::from_static(input))
            .into_iter()
            .map(|e| e.unwrap())
            .collect()
    }

    #[test]
    fn test_parse_simple_event() {
        let mut parser = SseParser::new();
        let events = feed_all(&mut parser, b"data: {\"chats\":2}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"chats\":2}");
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn test_parse_multiple_events() {
        let mut parser = SseParser::new();
        let events = feed_all(&mut parser, b"data: a\n\ndata: b\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].data, "b");
    }

    #[test]
    fn test_parse_chunked_data() {
        let mut parser = SseParser::new();

        assert!(parser.feed(Bytes::from_static(b"data: {\"id\":")).is_empty());
        let events = feed_all(&mut parser, b"\"c1\"}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"id\":\"c1\"}");
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let mut parser = SseParser::new();
        let events = feed_all(&mut parser, b"data: first\ndata:\ndata: third\n\n");

        assert_eq!(events[0].data, "first\n\nthird");
    }

    #[test]
    fn test_event_type_resets_and_id_persists() {
        let mut parser = SseParser::new();
        let events = feed_all(
            &mut parser,
            b"event: chat-opened\nid: 7\ndata: x\n\ndata: y\n\n",
        );

        assert_eq!(events[0].event.as_deref(), Some("chat-opened"));
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[1].event, None);
        assert_eq!(events[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_ignore_comments_and_retry() {
        let mut parser = SseParser::new();
        let events = feed_all(&mut parser, b": keepalive\nretry: 3000\n\ndata: z\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "z");
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let mut parser = SseParser::new();
        let events = parser.feed(Bytes::from_static(b"data: \xff\xfe\n"));

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(StreamError::Parse(_))));
    }
}
