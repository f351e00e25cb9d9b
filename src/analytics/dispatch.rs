use std::sync::Arc;

use crate::analytics::config::TrackerDescriptor;
use crate::analytics::namer::command_name;
use crate::analytics::transport::{TrackingCall, TransportAdapter};

/// Inclusion filter applied to the configured trackers before fan-out.
pub type IncludeFn<'a> = &'a dyn Fn(&TrackerDescriptor) -> bool;

/// Fans one logical call out to every matching tracker, in configured order.
#[derive(Clone)]
pub struct Dispatcher {
    adapter: Arc<dyn TransportAdapter>,
    unqualified_fallback: bool,
}

impl Dispatcher {
    pub fn new(adapter: Arc<dyn TransportAdapter>, unqualified_fallback: bool) -> Self {
        Self {
            adapter,
            unqualified_fallback,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn TransportAdapter> {
        &self.adapter
    }

    /// Sends `call` to the trackers selected by `include` (all trackers when `None`).
    ///
    /// When nothing matches, a single unqualified call is made instead, unless the fallback is
    /// switched off. Trackers whose `select` rejects the call are skipped silently.
    pub fn dispatch(
        &self,
        trackers: &[TrackerDescriptor],
        include: Option<IncludeFn<'_>>,
        call: TrackingCall,
    ) {
        let targets: Vec<&TrackerDescriptor> = match include {
            Some(include) => trackers.iter().filter(|tracker| include(tracker)).collect(),
            None => trackers.iter().collect(),
        };

        if targets.is_empty() {
            if self.unqualified_fallback {
                self.adapter.send(call);
            } else {
                log::debug!("no tracker matched `{}`; call dropped", call.command());
            }
            return;
        }

        for tracker in targets {
            if !tracker.selects(&call) {
                continue;
            }
            let command = command_name(call.command(), tracker);
            self.adapter.send(call.renamed(command));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::config::TransportMode;
    use crate::analytics::queue::OfflineQueue;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAdapter {
        queue: OfflineQueue,
        sent: Mutex<Vec<TrackingCall>>,
    }

    impl RecordingAdapter {
        fn commands(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|call| call.command().to_string())
                .collect()
        }
    }

    impl TransportAdapter for RecordingAdapter {
        fn mode(&self) -> TransportMode {
            TransportMode::Universal
        }

        fn queue(&self) -> &OfflineQueue {
            &self.queue
        }

        fn deliver(&self, call: TrackingCall) {
            self.sent.lock().unwrap().push(call);
        }
    }

    fn dispatcher() -> (Arc<RecordingAdapter>, Dispatcher) {
        let adapter = Arc::new(RecordingAdapter::default());
        let dispatcher = Dispatcher::new(adapter.clone(), true);
        (adapter, dispatcher)
    }

    fn event() -> TrackingCall {
        TrackingCall::new("send", vec![json!("event"), json!("Cat"), json!("Act")])
    }

    #[test]
    fn no_trackers_falls_back_to_unqualified_call() {
        let (adapter, dispatcher) = dispatcher();
        dispatcher.dispatch(&[], None, event());
        assert_eq!(adapter.sent.lock().unwrap().as_slice(), &[event()]);
    }

    #[test]
    fn unmatched_predicate_falls_back_to_unqualified_call() {
        let (adapter, dispatcher) = dispatcher();
        let trackers = vec![TrackerDescriptor::new("UA-1").with_name("t1")];
        dispatcher.dispatch(&trackers, Some(&|tracker: &TrackerDescriptor| tracker.track_event()), event());
        assert_eq!(adapter.commands(), ["send"]);
    }

    #[test]
    fn fallback_can_be_disabled() {
        let adapter = Arc::new(RecordingAdapter::default());
        let dispatcher = Dispatcher::new(adapter.clone(), false);
        dispatcher.dispatch(&[], None, event());
        assert!(adapter.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn predicate_limits_fan_out() {
        let (adapter, dispatcher) = dispatcher();
        let trackers = vec![
            TrackerDescriptor::new("UA-1").with_name("t1").with_track_event(true),
            TrackerDescriptor::new("UA-2"),
        ];

        dispatcher.dispatch(&trackers, Some(&|tracker: &TrackerDescriptor| tracker.track_event()), event());

        let sent = adapter.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command(), "t1.send");
        assert_eq!(sent[0].args(), event().args());
    }

    #[test]
    fn every_tracker_receives_the_call_in_order() {
        let (adapter, dispatcher) = dispatcher();
        let trackers = vec![
            TrackerDescriptor::new("UA-1").with_name("b"),
            TrackerDescriptor::new("UA-2"),
            TrackerDescriptor::new("UA-3").with_name("a"),
        ];
        dispatcher.dispatch(&trackers, None, event());
        assert_eq!(adapter.commands(), ["b.send", "send", "a.send"]);
    }

    #[test]
    fn select_veto_skips_only_that_tracker() {
        let (adapter, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observed = Arc::clone(&seen);
        let trackers = vec![
            TrackerDescriptor::new("UA-1")
                .with_name("t1")
                .with_select(move |call| {
                    observed.lock().unwrap().push(call.clone());
                    false
                }),
            TrackerDescriptor::new("UA-2").with_name("t2"),
        ];

        dispatcher.dispatch(&trackers, None, event());

        assert_eq!(adapter.commands(), ["t2.send"]);
        assert_eq!(seen.lock().unwrap().as_slice(), &[event()]);
    }

    #[test]
    fn all_vetoed_sends_nothing() {
        let (adapter, dispatcher) = dispatcher();
        let trackers = vec![TrackerDescriptor::new("UA-1").with_select(|_| false)];
        dispatcher.dispatch(&trackers, None, event());
        assert!(adapter.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn offline_fan_out_is_queued_per_tracker() {
        let adapter = Arc::new(RecordingAdapter {
            queue: OfflineQueue::new(true),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(adapter.clone(), true);
        let trackers = vec![
            TrackerDescriptor::new("UA-1").with_name("t1"),
            TrackerDescriptor::new("UA-2").with_name("t2"),
        ];

        dispatcher.dispatch(&trackers, None, event());
        assert!(adapter.sent.lock().unwrap().is_empty());
        assert_eq!(adapter.queue.len(), 2);

        adapter
            .queue
            .set_offline(false, |call| adapter.deliver(call));
        assert_eq!(adapter.commands(), ["t1.send", "t2.send"]);
    }
}
