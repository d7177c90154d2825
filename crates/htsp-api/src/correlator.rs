// ── Response correlation ──
//
// Maps each in-flight request's `seq` to the one-shot handler waiting
// for its reply, and hands everything else to the push-event listener.
// Only the receive loop calls `dispatch`, so inbound messages are
// delivered in wire order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::Error;
use crate::message::HtspMessage;

/// Handler that receives the reply to exactly one request.
pub type ResponseHandler = oneshot::Sender<HtspMessage>;

/// Receiver of push events and receive-loop failures.
///
/// Called from the receive loop. Implementations must not block; every
/// call delays the next inbound frame.
pub trait EventListener: Send + Sync + 'static {
    /// An unsolicited message of kind `method`.
    fn on_event(&self, method: &str, message: &HtspMessage);

    /// The receive loop hit an error and is about to stop.
    fn on_error(&self, error: &Error);
}

/// Where [`Correlator::dispatch`] routed a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to the handler registered under this `seq`.
    Response(u32),
    /// Handed to the listener as a push event.
    Push,
    /// Carried a `seq` nobody is waiting for any more.
    Unclaimed(u32),
    /// Neither a reply nor a push event.
    Discarded,
}

/// Registry of pending requests plus the dispatch point for inbound traffic.
pub struct Correlator {
    pending: DashMap<u32, ResponseHandler>,
    next_seq: AtomicU32,
    unclaimed: AtomicU64,
    listener: Arc<dyn EventListener>,
}

impl Correlator {
    pub fn new(listener: Arc<dyn EventListener>) -> Self {
        Self {
            pending: DashMap::new(),
            next_seq: AtomicU32::new(1),
            unclaimed: AtomicU64::new(0),
            listener,
        }
    }

    /// Allocate a fresh correlation key.
    pub fn next_seq(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Register `handler` to receive the reply carrying `seq`.
    ///
    /// Fails if a live handler is already registered under `seq`. An
    /// entry whose waiter has gone away is replaced.
    pub fn register(&self, seq: u32, handler: ResponseHandler) -> Result<(), Error> {
        match self.pending.entry(seq) {
            Entry::Occupied(mut slot) => {
                if !slot.get().is_closed() {
                    return Err(Error::DuplicateSequence { seq });
                }
                slot.insert(handler);
            }
            Entry::Vacant(slot) => {
                slot.insert(handler);
            }
        }
        Ok(())
    }

    /// Forget a pending request (its caller gave up).
    pub fn abandon(&self, seq: u32) {
        if self.pending.remove(&seq).is_some() {
            trace!(seq, "abandoned pending request");
        }
    }

    /// Drop every pending handler. Waiters observe a closed channel.
    pub fn clear(&self) {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!(dropped, "cleared pending requests");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Replies that arrived after their caller stopped waiting.
    pub fn unclaimed_count(&self) -> u64 {
        self.unclaimed.load(Ordering::Relaxed)
    }

    /// Route one inbound message.
    pub fn dispatch(&self, message: HtspMessage) -> Dispatch {
        if let Some(seq) = message.seq() {
            if let Some((_, handler)) = self.pending.remove(&seq) {
                // A dropped receiver just means the caller timed out.
                let _ = handler.send(message);
                return Dispatch::Response(seq);
            }
            if message.method_name().is_none() {
                self.unclaimed.fetch_add(1, Ordering::Relaxed);
                debug!(seq, "discarding reply with no pending request");
                return Dispatch::Unclaimed(seq);
            }
        }

        match message.method_name() {
            Some(method) => {
                trace!(method, "push event");
                self.listener.on_event(method, &message);
                Dispatch::Push
            }
            None => {
                debug!(fields = message.len(), "discarding message without seq or method");
                Dispatch::Discarded
            }
        }
    }

    /// Forward a receive-loop failure to the listener.
    pub(crate) fn report_error(&self, error: &Error) {
        self.listener.on_error(error);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl EventListener for Recorder {
        fn on_event(&self, method: &str, _message: &HtspMessage) {
            self.events.lock().unwrap().push(method.to_owned());
        }

        fn on_error(&self, error: &Error) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    fn setup() -> (Arc<Recorder>, Correlator) {
        let recorder = Arc::new(Recorder::default());
        let correlator = Correlator::new(recorder.clone());
        (recorder, correlator)
    }

    fn reply(seq: u32) -> HtspMessage {
        HtspMessage::new().with("seq", seq)
    }

    #[test]
    fn reply_goes_to_matching_handler_once() {
        let (_, corr) = setup();
        let (tx, mut rx) = oneshot::channel();
        corr.register(5, tx).unwrap();

        assert_eq!(corr.dispatch(reply(5)), Dispatch::Response(5));
        assert_eq!(rx.try_recv().unwrap().seq(), Some(5));
        assert_eq!(corr.pending_count(), 0);

        // second reply with the same seq is not delivered again
        assert_eq!(corr.dispatch(reply(5)), Dispatch::Unclaimed(5));
        assert_eq!(corr.unclaimed_count(), 1);
    }

    #[test]
    fn out_of_order_replies_match_by_key() {
        let (_, corr) = setup();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();
        corr.register(1, tx1).unwrap();
        corr.register(2, tx2).unwrap();

        corr.dispatch(reply(2).with("tag", "second"));
        corr.dispatch(reply(1).with("tag", "first"));

        assert_eq!(rx1.try_recv().unwrap().str("tag"), Some("first"));
        assert_eq!(rx2.try_recv().unwrap().str("tag"), Some("second"));
    }

    #[test]
    fn waiter_is_released_by_dispatch() {
        let (_, corr) = setup();
        let (tx, rx) = oneshot::channel();
        corr.register(4, tx).unwrap();
        corr.dispatch(reply(4).with("path", "/stream/1"));
        let message = tokio_test::block_on(rx).unwrap();
        assert_eq!(message.str("path"), Some("/stream/1"));
    }

    #[test]
    fn duplicate_live_seq_is_rejected() {
        let (_, corr) = setup();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        corr.register(9, tx1).unwrap();
        assert!(matches!(
            corr.register(9, tx2),
            Err(Error::DuplicateSequence { seq: 9 })
        ));
    }

    #[test]
    fn seq_of_abandoned_waiter_can_be_reused() {
        let (_, corr) = setup();
        let (tx1, rx1) = oneshot::channel();
        corr.register(9, tx1).unwrap();
        drop(rx1);
        let (tx2, _rx2) = oneshot::channel();
        corr.register(9, tx2).unwrap();
    }

    #[test]
    fn push_events_reach_listener() {
        let (rec, corr) = setup();
        let event = HtspMessage::method("channelAdd").with("channelId", 1_u32);
        assert_eq!(corr.dispatch(event), Dispatch::Push);
        assert_eq!(*rec.events.lock().unwrap(), vec!["channelAdd".to_owned()]);
    }

    #[test]
    fn messages_without_route_are_discarded() {
        let (rec, corr) = setup();
        assert_eq!(
            corr.dispatch(HtspMessage::new().with("x", 1_i64)),
            Dispatch::Discarded
        );
        assert!(rec.events.lock().unwrap().is_empty());
    }

    #[test]
    fn clear_closes_waiters() {
        let (_, corr) = setup();
        let (tx, mut rx) = oneshot::channel();
        corr.register(3, tx).unwrap();
        corr.clear();
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn errors_are_forwarded() {
        let (rec, corr) = setup();
        corr.report_error(&Error::Closed);
        assert_eq!(rec.errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn sequence_numbers_are_unique() {
        let (_, corr) = setup();
        let a = corr.next_seq();
        let b = corr.next_seq();
        assert_ne!(a, b);
    }
}
