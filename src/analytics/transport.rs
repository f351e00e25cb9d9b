use std::sync::Arc;

use serde_json::Value;

use crate::analytics::config::TransportMode;
use crate::analytics::constants::{WARN_COMMAND_QUEUE_MISSING, WARN_TRACKING_FUNCTION_MISSING};
use crate::analytics::host::TrackingHost;
use crate::analytics::queue::OfflineQueue;
use crate::logger::CallLog;

/// A single wire-level command: the command name followed by its arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingCall {
    command: String,
    args: Vec<Value>,
}

impl TrackingCall {
    pub fn new(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Same arguments addressed to a different command name.
    pub fn renamed(&self, command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: self.args.clone(),
        }
    }

    /// `[command, ...args]`, the shape both transports expect.
    pub fn to_values(&self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.args.len() + 1);
        values.push(Value::String(self.command.clone()));
        values.extend(self.args.iter().cloned());
        values
    }
}

/// Shared contract of the classic and universal transports.
pub trait TransportAdapter: Send + Sync {
    fn mode(&self) -> TransportMode;

    fn queue(&self) -> &OfflineQueue;

    /// Hands `call` to the underlying target, bypassing the offline queue.
    fn deliver(&self, call: TrackingCall);

    /// Sends `call`, deferring it while the session is offline or a replay is running.
    fn send(&self, call: TrackingCall) {
        if self.queue().intercept(&call) {
            return;
        }
        self.deliver(call);
    }
}

/// Pushes commands onto the `_gaq` queue.
pub struct ClassicAdapter {
    host: Arc<dyn TrackingHost>,
    queue: Arc<OfflineQueue>,
    log: CallLog,
    log_all_calls: bool,
}

impl ClassicAdapter {
    pub fn new(
        host: Arc<dyn TrackingHost>,
        queue: Arc<OfflineQueue>,
        log: CallLog,
        log_all_calls: bool,
    ) -> Self {
        Self {
            host,
            queue,
            log,
            log_all_calls,
        }
    }
}

impl TransportAdapter for ClassicAdapter {
    fn mode(&self) -> TransportMode {
        TransportMode::Classic
    }

    fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    fn deliver(&self, call: TrackingCall) {
        let Some(target) = self.host.command_queue() else {
            self.log.warn(WARN_COMMAND_QUEUE_MISSING);
            return;
        };
        if self.log_all_calls {
            self.log.record(call.command(), call.args().to_vec());
        }
        target.push(call.to_values());
    }
}

/// Invokes the `ga` function directly.
pub struct UniversalAdapter {
    host: Arc<dyn TrackingHost>,
    queue: Arc<OfflineQueue>,
    log: CallLog,
    log_all_calls: bool,
}

impl UniversalAdapter {
    pub fn new(
        host: Arc<dyn TrackingHost>,
        queue: Arc<OfflineQueue>,
        log: CallLog,
        log_all_calls: bool,
    ) -> Self {
        Self {
            host,
            queue,
            log,
            log_all_calls,
        }
    }
}

impl TransportAdapter for UniversalAdapter {
    fn mode(&self) -> TransportMode {
        TransportMode::Universal
    }

    fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    fn deliver(&self, call: TrackingCall) {
        let Some(target) = self.host.tracking_function() else {
            self.log.warn(WARN_TRACKING_FUNCTION_MISSING);
            return;
        };
        if self.log_all_calls {
            self.log.record(call.command(), call.args().to_vec());
        }
        target.call(&call.to_values());
    }
}

/// Builds the adapter for `mode`.
pub fn adapter_for(
    mode: TransportMode,
    host: Arc<dyn TrackingHost>,
    queue: Arc<OfflineQueue>,
    log: CallLog,
    log_all_calls: bool,
) -> Arc<dyn TransportAdapter> {
    match mode {
        TransportMode::Classic => Arc::new(ClassicAdapter::new(host, queue, log, log_all_calls)),
        TransportMode::Universal => {
            Arc::new(UniversalAdapter::new(host, queue, log, log_all_calls))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::host::MemoryHost;
    use serde_json::json;

    fn setup(mode: TransportMode, offline: bool) -> (Arc<MemoryHost>, CallLog, Arc<dyn TransportAdapter>) {
        let host = Arc::new(MemoryHost::new());
        let log = CallLog::new("transport-test");
        let queue = Arc::new(OfflineQueue::new(offline));
        let adapter = adapter_for(mode, host.clone(), queue, log.clone(), true);
        (host, log, adapter)
    }

    #[test]
    fn call_flattens_command_and_args() {
        let call = TrackingCall::new("send", vec![json!("event"), json!("Cat")]);
        assert_eq!(call.to_values(), vec![json!("send"), json!("event"), json!("Cat")]);
        assert_eq!(call.renamed("t1.send").command(), "t1.send");
        assert_eq!(call.renamed("t1.send").args(), call.args());
    }

    #[test]
    fn classic_pushes_onto_queue_and_logs() {
        let (host, log, adapter) = setup(TransportMode::Classic, false);
        host.install_command_queue();

        adapter.send(TrackingCall::new("_setAccount", vec![json!("UA-1")]));

        assert_eq!(host.queued(), vec![vec![json!("_setAccount"), json!("UA-1")]]);
        assert_eq!(log.entries()[0].to_values(), vec![json!("_setAccount"), json!("UA-1")]);
    }

    #[test]
    fn universal_calls_function_and_logs() {
        let (host, log, adapter) = setup(TransportMode::Universal, false);
        host.install_tracking_function();

        adapter.send(TrackingCall::new("send", vec![json!("pageview")]));

        assert_eq!(host.calls(), vec![vec![json!("send"), json!("pageview")]]);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn missing_function_warns_and_drops() {
        let (host, log, adapter) = setup(TransportMode::Universal, false);

        adapter.send(TrackingCall::new("send", vec![json!("pageview")]));

        assert!(host.calls().is_empty());
        assert_eq!(
            log.entries()[0].to_values(),
            vec![json!("warn"), json!("ga function not set on window")]
        );

        host.install_tracking_function();
        assert!(host.calls().is_empty(), "dropped calls are not retried");
    }

    #[test]
    fn missing_queue_warns_and_drops() {
        let (host, log, adapter) = setup(TransportMode::Classic, false);
        adapter.send(TrackingCall::new("_trackPageview", Vec::new()));
        assert!(host.queued().is_empty());
        assert_eq!(log.entries()[0].label(), "warn");
    }

    #[test]
    fn offline_calls_are_not_logged_or_sent() {
        let (host, log, adapter) = setup(TransportMode::Universal, true);
        host.install_tracking_function();

        adapter.send(TrackingCall::new("send", vec![json!("pageview")]));

        assert!(log.is_empty());
        assert!(host.calls().is_empty());
        assert_eq!(adapter.queue().len(), 1);
    }

    #[test]
    fn logging_can_be_turned_off() {
        let host = Arc::new(MemoryHost::loaded());
        let log = CallLog::new("quiet");
        let adapter = UniversalAdapter::new(host.clone(), Arc::new(OfflineQueue::default()), log.clone(), false);

        adapter.send(TrackingCall::new("send", vec![json!("pageview")]));

        assert!(log.is_empty());
        assert_eq!(host.calls().len(), 1);
    }
}
