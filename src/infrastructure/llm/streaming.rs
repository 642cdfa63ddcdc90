//! Server-Sent Events parsing for streamed chat completions.
//!
//! The upstream sends `data: {chunk json}\n\n` frames and finishes with
//! `data: [DONE]`. Each chunk carries an incremental `choices[0].delta.content`.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

use super::types::ChatCompletionChunk;
use crate::domain::errors::UpstreamError;

/// What one SSE frame contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A non-empty text fragment
    Fragment(String),
    /// The `[DONE]` sentinel
    Done,
    /// Comments, keep-alives, role-only or empty deltas
    Skip,
}

/// Parse one SSE frame (the text between blank lines).
pub fn parse_sse_frame(frame: &str) -> Result<SseFrame, UpstreamError> {
    let data: String = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n");

    if data.trim().is_empty() {
        return Ok(SseFrame::Skip);
    }
    if data.trim() == "[DONE]" {
        return Ok(SseFrame::Done);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(&data).map_err(|err| {
        warn!("Failed to parse SSE chunk: {} - Data: {}", err, data);
        UpstreamError::Decode(err.to_string())
    })?;

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect();

    if text.is_empty() {
        Ok(SseFrame::Skip)
    } else {
        Ok(SseFrame::Fragment(text))
    }
}

/// Turns an upstream byte stream into text fragments
pub struct SseFragmentStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    finished: bool,
}

impl SseFragmentStream {
    /// Create a new parser from a byte stream
    pub fn new(stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
            buffer: String::new(),
            finished: false,
        }
    }

    fn next_buffered_frame(&mut self) -> Option<String> {
        let end = self.buffer.find("\n\n")?;
        let frame = self.buffer[..end].to_string();
        self.buffer.drain(..end + 2);
        Some(frame)
    }
}

impl Stream for SseFragmentStream {
    type Item = Result<String, UpstreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            if let Some(frame) = self.next_buffered_frame() {
                match parse_sse_frame(&frame) {
                    Ok(SseFrame::Fragment(text)) => return Poll::Ready(Some(Ok(text))),
                    Ok(SseFrame::Done) => {
                        debug!("Upstream stream finished");
                        self.finished = true;
                        return Poll::Ready(None);
                    }
                    Ok(SseFrame::Skip) => continue,
                    Err(err) => {
                        self.finished = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                }
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let chunk = String::from_utf8_lossy(&bytes).replace("\r\n", "\n");
                    self.buffer.push_str(&chunk);
                }
                Poll::Ready(Some(Err(err))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(UpstreamError::from(err))));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    // flush a final frame that was not followed by a blank line
                    let rest = std::mem::take(&mut self.buffer);
                    return match parse_sse_frame(&rest) {
                        Ok(SseFrame::Fragment(text)) => Poll::Ready(Some(Ok(text))),
                        Ok(_) => Poll::Ready(None),
                        Err(err) => Poll::Ready(Some(Err(err))),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn chunk(text: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n", serde_json::json!(text))
    }

    #[test]
    fn test_parse_fragment_frame() {
        let frame = chunk("Hello");
        assert_eq!(
            parse_sse_frame(frame.trim_end()).unwrap(),
            SseFrame::Fragment("Hello".to_string())
        );
    }

    #[test]
    fn test_parse_done_and_skips() {
        assert_eq!(parse_sse_frame("data: [DONE]").unwrap(), SseFrame::Done);
        assert_eq!(parse_sse_frame(": keep-alive").unwrap(), SseFrame::Skip);
        assert_eq!(
            parse_sse_frame(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            SseFrame::Skip
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_sse_frame("data: {not json"),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_reassembles_split_frames() {
        let body = format!("{}{}data: [DONE]\n\n", chunk("Hel"), chunk("lo"));
        let (first, second) = body.split_at(17);
        let parts: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from(first.to_string())),
            Ok(Bytes::from(second.to_string())),
        ];

        let fragments: Vec<String> = SseFragmentStream::new(futures::stream::iter(parts))
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_stops_at_done() {
        let body = format!("{}data: [DONE]\n\n{}", chunk("a"), chunk("ignored"));
        let parts: Vec<Result<Bytes, reqwest::Error>> = vec![Ok(Bytes::from(body))];

        let fragments: Vec<String> = SseFragmentStream::new(futures::stream::iter(parts))
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["a".to_string()]);
    }
}
