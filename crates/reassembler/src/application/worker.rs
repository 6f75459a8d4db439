//! # Reorder Worker
//!
//! The single task that owns the cursor and the pending set. Everything that
//! reads or mutates them runs here, one item at a time.

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::service::{DropObserver, SequenceFn};
use super::stats::Counters;
use crate::domain::{Issue, Placement, ReorderBuffer, SequenceValue};

pub(crate) struct Worker<T, S: SequenceValue> {
    pub(crate) name: Arc<str>,
    pub(crate) sequence_fn: SequenceFn<T, S>,
    pub(crate) observer: Arc<RwLock<DropObserver<T, S>>>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) report_collisions: bool,
    pub(crate) buffer: ReorderBuffer<T, S>,
    pub(crate) intake: mpsc::Receiver<T>,
    pub(crate) delivery: mpsc::Sender<T>,
    pub(crate) shutdown: CancellationToken,
}

impl<T: Send + 'static, S: SequenceValue> Worker<T, S> {
    pub(crate) async fn run(mut self) {
        info!(
            name = %self.name,
            next_seq = %self.buffer.next_seq(),
            "Reassembler started"
        );

        loop {
            // Cancellation is only observed between items.
            let item = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                item = self.intake.recv() => match item {
                    Some(item) => item,
                    None => {
                        debug!(name = %self.name, "All submitters gone");
                        break;
                    }
                },
            };

            if self.handle(item).await.is_break() {
                break;
            }
        }

        self.close();
    }

    async fn handle(&mut self, item: T) -> ControlFlow<()> {
        let next_seq = self.buffer.next_seq();

        let seq = match panic::catch_unwind(AssertUnwindSafe(|| (self.sequence_fn)(&item))) {
            Ok(seq) => seq,
            Err(payload) => {
                self.counters.record_fault();
                let issue = Issue::fault(&self.name, next_seq, panic_message(payload.as_ref()));
                self.notify_drop(item, issue);
                return ControlFlow::Continue(());
            }
        };

        match self.buffer.place(seq, item) {
            Placement::Stale { item, next_seq } => {
                self.counters.record_stale();
                debug!(name = %self.name, seq = %seq, next_seq = %next_seq, "Stale item");
                let issue = if self.buffer.is_exhausted() {
                    Issue::exhausted(&self.name, seq, next_seq)
                } else {
                    Issue::stale(&self.name, seq, next_seq)
                };
                self.notify_drop(item, issue);
                ControlFlow::Continue(())
            }
            Placement::Buffered { displaced } => {
                self.counters.set_buffered(self.buffer.pending_len());
                debug!(
                    name = %self.name,
                    seq = %seq,
                    next_seq = %next_seq,
                    pending = self.buffer.pending_len(),
                    "Buffered early item"
                );
                if let Some(old) = displaced {
                    if self.report_collisions {
                        self.counters.record_collision();
                        self.notify_drop(old, Issue::collision(&self.name, seq, next_seq));
                    }
                }
                ControlFlow::Continue(())
            }
            Placement::Ready(items) => {
                self.counters.set_buffered(self.buffer.pending_len());
                self.deliver(items).await
            }
        }
    }

    /// Hand a contiguous run to the receiver. The cursor already moved past it.
    async fn deliver(&mut self, items: Vec<T>) -> ControlFlow<()> {
        for item in items {
            let sent = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return ControlFlow::Break(()),
                sent = self.delivery.send(item) => sent,
            };

            if sent.is_err() {
                debug!(name = %self.name, "Receiver gone");
                return ControlFlow::Break(());
            }
            self.counters.record_delivered();
        }
        ControlFlow::Continue(())
    }

    fn notify_drop(&self, item: T, issue: Issue<S>) {
        let observer = Arc::clone(
            &*self
                .observer
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );

        if panic::catch_unwind(AssertUnwindSafe(|| observer(item, issue))).is_err() {
            error!(name = %self.name, "Drop observer panicked");
        }
    }

    /// Close delivery, then intake. Whatever is still pending is lost.
    fn close(self) {
        let Self {
            name,
            counters,
            mut buffer,
            mut intake,
            delivery,
            ..
        } = self;

        drop(delivery);
        intake.close();

        let discarded = buffer.clear();
        counters.set_buffered(0);
        info!(name = %name, discarded, "Reassembler stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_str() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn test_panic_message_from_string() {
        let payload: Box<dyn Any + Send> = Box::new(format!("bad {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "bad 7");
    }

    #[test]
    fn test_panic_message_unknown() {
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
