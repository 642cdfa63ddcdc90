//! Event channel between the streaming producer and its consumer.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::domain::errors::PipelineError;
use crate::domain::models::StreamEvent;

/// Events buffered ahead of a slow consumer before the producer waits.
pub const EVENT_BUFFER: usize = 32;

/// Why a streaming run stopped before finishing.
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// The consumer went away; nothing more can be delivered.
    Cancelled,
    /// A fatal pipeline error to report as `error` then `end`.
    Failed(PipelineError),
}

impl From<PipelineError> for Interrupt {
    fn from(err: PipelineError) -> Self {
        Self::Failed(err)
    }
}

/// Producer side of the event channel.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    /// Deliver one event, waiting for buffer space.
    pub async fn emit(&self, event: StreamEvent) -> Result<(), Interrupt> {
        self.tx.send(event).await.map_err(|_| Interrupt::Cancelled)
    }

    /// Resolves once the consumer has dropped the stream.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// Lazy, single-pass sequence of [`StreamEvent`]s from one pipeline run.
///
/// Always finishes with [`StreamEvent::End`] unless dropped early; dropping
/// it cancels the run, including any upstream call in flight.
#[derive(Debug)]
pub struct PipelineEventStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl PipelineEventStream {
    pub(crate) fn channel() -> (EventSink, Self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (EventSink { tx }, Self { rx })
    }
}

impl Stream for PipelineEventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (sink, mut stream) = PipelineEventStream::channel();
        tokio::spawn(async move {
            sink.emit(StreamEvent::Content("a".to_string())).await.unwrap();
            sink.emit(StreamEvent::Content("b".to_string())).await.unwrap();
            sink.emit(StreamEvent::End).await.unwrap();
        });

        let events: Vec<_> = (&mut stream).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Content("a".to_string()),
                StreamEvent::Content("b".to_string()),
                StreamEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_emit_after_drop_is_cancelled() {
        let (sink, stream) = PipelineEventStream::channel();
        drop(stream);
        assert!(matches!(sink.emit(StreamEvent::End).await, Err(Interrupt::Cancelled)));
    }
}
