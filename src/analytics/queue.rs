use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::analytics::transport::TrackingCall;

/// FIFO buffer for transport calls made while the session is offline.
///
/// Going back online replays a snapshot of the buffer. Calls made while that replay is running
/// are held in a separate tail and delivered after the snapshot, so they never overtake a call
/// that was buffered before them.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    offline: AtomicBool,
    draining: AtomicBool,
    buffer: Mutex<VecDeque<TrackingCall>>,
    tail: Mutex<VecDeque<TrackingCall>>,
}

impl OfflineQueue {
    pub fn new(offline: bool) -> Self {
        Self {
            offline: AtomicBool::new(offline),
            ..Default::default()
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Takes `call` and returns `true` when it has to wait: buffered while offline, or held in
    /// the drain tail while a replay is running. Otherwise leaves it to the caller.
    pub fn intercept(&self, call: &TrackingCall) -> bool {
        if self.is_offline() {
            self.buffer.lock().unwrap().push_back(call.clone());
            return true;
        }
        if self.is_draining() {
            self.tail.lock().unwrap().push_back(call.clone());
            return true;
        }
        false
    }

    /// Updates the offline flag. Going online replays the buffer through `replay` in the order
    /// the calls were queued, then the calls made during the replay, before returning.
    ///
    /// If the session goes offline again mid-replay, everything not yet replayed is put back in
    /// front of the buffer, in its original order.
    pub fn set_offline<F>(&self, offline: bool, mut replay: F)
    where
        F: FnMut(TrackingCall),
    {
        let was_offline = self.offline.swap(offline, Ordering::SeqCst);
        if offline || !was_offline {
            return;
        }
        // A replay further up the stack picks up whatever was buffered meanwhile.
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut snapshot = VecDeque::new();
        loop {
            if self.is_offline() {
                self.requeue(snapshot);
                break;
            }
            let next = match snapshot.pop_front() {
                Some(call) => Some(call),
                None => self.tail.lock().unwrap().pop_front(),
            };
            let next = match next {
                Some(call) => Some(call),
                None => {
                    snapshot = mem::take(&mut *self.buffer.lock().unwrap());
                    snapshot.pop_front()
                }
            };
            match next {
                Some(call) => replay(call),
                None => break,
            }
        }
        self.draining.store(false, Ordering::SeqCst);
    }

    fn requeue(&self, snapshot: VecDeque<TrackingCall>) {
        let mut buffer = self.buffer.lock().unwrap();
        let later = mem::take(&mut *buffer);
        buffer.extend(snapshot);
        buffer.extend(self.tail.lock().unwrap().drain(..));
        buffer.extend(later);
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(path: &str) -> TrackingCall {
        TrackingCall::new("send", vec![json!("pageview"), json!(path)])
    }

    #[test]
    fn online_calls_pass_through() {
        let queue = OfflineQueue::new(false);
        assert!(!queue.intercept(&page("/a")));
        assert!(queue.is_empty());
    }

    #[test]
    fn offline_calls_drain_in_fifo_order() {
        let queue = OfflineQueue::new(true);
        assert!(queue.intercept(&page("/a")));
        assert!(queue.intercept(&page("/b")));
        assert!(queue.intercept(&page("/c")));

        let mut replayed = Vec::new();
        queue.set_offline(false, |call| replayed.push(call));

        assert_eq!(replayed, vec![page("/a"), page("/b"), page("/c")]);
        assert!(queue.is_empty());
        assert!(!queue.is_offline());
        assert!(!queue.is_draining());
    }

    #[test]
    fn repeated_transitions_are_idempotent() {
        let queue = OfflineQueue::new(false);
        let mut replays = 0;

        queue.set_offline(true, |_| replays += 1);
        queue.set_offline(true, |_| replays += 1);
        queue.intercept(&page("/a"));
        assert_eq!(queue.len(), 1);

        queue.set_offline(false, |_| replays += 1);
        queue.set_offline(false, |_| replays += 1);
        assert_eq!(replays, 1);
    }

    #[test]
    fn going_online_while_online_does_not_drain() {
        let queue = OfflineQueue::new(false);
        let mut replays = 0;
        queue.set_offline(false, |_| replays += 1);
        assert_eq!(replays, 0);
    }

    #[test]
    fn going_offline_keeps_buffered_entries() {
        let queue = OfflineQueue::new(true);
        queue.intercept(&page("/a"));
        queue.set_offline(true, |_| panic!("must not replay"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn calls_made_during_replay_follow_the_buffer() {
        let queue = OfflineQueue::new(true);
        queue.intercept(&page("/a"));
        queue.intercept(&page("/b"));

        let mut replayed = Vec::new();
        queue.set_offline(false, |call| {
            if call == page("/a") {
                assert!(queue.intercept(&page("/mid")));
            }
            replayed.push(call);
        });

        assert_eq!(replayed, vec![page("/a"), page("/b"), page("/mid")]);
        assert!(queue.is_empty());
        assert!(!queue.intercept(&page("/after")));
    }

    #[test]
    fn replay_stops_when_offline_again() {
        let queue = OfflineQueue::new(true);
        queue.intercept(&page("/a"));
        queue.intercept(&page("/b"));

        let mut replayed = Vec::new();
        queue.set_offline(false, |call| {
            replayed.push(call);
            queue.set_offline(true, |_| {});
        });

        assert_eq!(replayed, vec![page("/a")]);
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_draining());
    }

    #[test]
    fn interrupted_replay_keeps_order() {
        let queue = OfflineQueue::new(true);
        queue.intercept(&page("/a"));
        queue.intercept(&page("/b"));

        let mut first = true;
        queue.set_offline(false, |_| {
            if first {
                first = false;
                queue.intercept(&page("/mid"));
                queue.set_offline(true, |_| {});
                queue.intercept(&page("/late"));
            }
        });

        let mut rest = Vec::new();
        queue.set_offline(false, |call| rest.push(call));
        assert_eq!(rest, vec![page("/b"), page("/mid"), page("/late")]);
    }
}
