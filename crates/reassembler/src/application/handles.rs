//! # Conduit Handles
//!
//! Producer and consumer ends that can leave the reassembler and live in
//! other tasks.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::domain::ReassemblerError;

/// Cloneable submitting end of a running reassembler.
pub struct Submitter<T> {
    name: Arc<str>,
    intake: mpsc::Sender<T>,
    shutdown: CancellationToken,
}

impl<T> Submitter<T> {
    pub(crate) fn new(name: Arc<str>, intake: mpsc::Sender<T>, shutdown: CancellationToken) -> Self {
        Self {
            name,
            intake,
            shutdown,
        }
    }

    /// Hand `item` to the worker, waiting until it is accepted.
    ///
    /// A caller suspended here is released with `Closed` when the
    /// reassembler stops.
    ///
    /// # Errors
    ///
    /// `Closed` once the reassembler has stopped.
    pub async fn submit(&self, item: T) -> Result<(), ReassemblerError> {
        if self.shutdown.is_cancelled() {
            return Err(self.closed());
        }

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(self.closed()),
            sent = self.intake.send(item) => sent.map_err(|_| self.closed()),
        }
    }

    /// Whether the reassembler has stopped accepting items.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.intake.is_closed()
    }

    fn closed(&self) -> ReassemblerError {
        ReassemblerError::Closed {
            name: Arc::clone(&self.name),
        }
    }
}

impl<T> Clone for Submitter<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            intake: self.intake.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T> fmt::Debug for Submitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// In-order items as a `tokio_stream::Stream`.
///
/// Ends once the reassembler stops and the buffered deliveries are drained.
#[derive(Debug)]
pub struct ReassembledStream<T> {
    delivery: mpsc::Receiver<T>,
}

impl<T> ReassembledStream<T> {
    pub(crate) fn new(delivery: mpsc::Receiver<T>) -> Self {
        Self { delivery }
    }
}

impl<T> Stream for ReassembledStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.delivery.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_submit_after_cancel_is_closed() {
        let (tx, _rx) = mpsc::channel::<u8>(1);
        let shutdown = CancellationToken::new();
        let submitter = Submitter::new(Arc::from("order"), tx, shutdown.clone());

        shutdown.cancel();
        assert!(submitter.is_closed());
        assert!(matches!(
            submitter.submit(1).await,
            Err(ReassemblerError::Closed { .. })
        ));
    }

    #[tokio::test]
    async fn test_blocked_submit_released_by_cancel() {
        let (tx, _rx) = mpsc::channel::<u8>(1);
        let shutdown = CancellationToken::new();
        let submitter = Submitter::new(Arc::from("order"), tx, shutdown.clone());

        // Fill the only slot so the next submit has to wait.
        submitter.submit(1).await.unwrap();

        let blocked = tokio::spawn({
            let submitter = submitter.clone();
            async move { submitter.submit(2).await }
        });
        tokio::task::yield_now().await;
        shutdown.cancel();

        let result = timeout(Duration::from_millis(500), blocked)
            .await
            .expect("timeout")
            .expect("join");
        assert!(matches!(result, Err(ReassemblerError::Closed { .. })));
    }

    #[tokio::test]
    async fn test_submit_to_dropped_receiver_is_closed() {
        let (tx, rx) = mpsc::channel::<u8>(1);
        let submitter = Submitter::new(Arc::from("order"), tx, CancellationToken::new());
        drop(rx);

        assert!(submitter.is_closed());
        assert!(submitter.submit(1).await.is_err());
    }

    #[tokio::test]
    async fn test_stream_ends_when_sender_dropped() {
        let (tx, rx) = mpsc::channel::<u8>(4);
        let mut stream = ReassembledStream::new(rx);

        tx.send(7).await.unwrap();
        drop(tx);

        assert_eq!(stream.next().await, Some(7));
        assert_eq!(stream.next().await, None);
    }
}
