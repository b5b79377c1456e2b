//! Event stream handle returned for streaming routes

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};

use super::parser::SseParser;
use super::types::{ServerEvent, StreamError, StreamResult};

/// An open server-sent event connection
///
/// Implements `Stream<Item = Result<ServerEvent, StreamError>>`. Dropping
/// it closes the connection; there is no server-side subscription to clean
/// up.
pub struct EventStream {
    byte_stream: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    parser: SseParser,
    pending: VecDeque<StreamResult<ServerEvent>>,
    finished: bool,
}

impl EventStream {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self::from_byte_stream(response.bytes_stream())
    }

    pub(crate) fn from_byte_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            byte_stream: stream.boxed(),
            parser: SseParser::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next event, or `None` once the server closes the stream
    pub async fn next(&mut self) -> Option<StreamResult<ServerEvent>> {
        <Self as StreamExt>::next(self).await
    }
}

impl Stream for EventStream {
    type Item = StreamResult<ServerEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match this.byte_stream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.parser.feed(bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(StreamError::Connection(e))));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> EventStream {
        let items: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .copied()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        EventStream::from_byte_stream(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn test_events_across_chunks() {
        let mut stream = chunks(&["data: one\n", "\ndata: t", "wo\n\n"]);

        assert_eq!(stream.next().await.unwrap().unwrap().data, "one");
        assert_eq!(stream.next().await.unwrap().unwrap().data, "two");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_trailing_event_is_dropped() {
        let mut stream = chunks(&["data: done\n\n", "data: partial\n"]);

        assert_eq!(stream.next().await.unwrap().unwrap().data, "done");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_collects_as_stream() {
        let stream = chunks(&["data: a\n\ndata: b\n\n"]);
        let events: Vec<_> = stream.map(|e| e.unwrap().data).collect().await;
        assert_eq!(events, vec!["a", "b"]);
    }
}
